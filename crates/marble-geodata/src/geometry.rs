//! Geometry variants owned by placemarks

use crate::utils::haversine_distance;
use crate::{Coordinates, GeoNode, LatLonAltBox, NodeType};
use std::ops::{Deref, DerefMut};

/// How altitudes of a geometry are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltitudeMode {
    #[default]
    ClampToGround,
    RelativeToGround,
    Absolute,
}

impl AltitudeMode {
    pub fn as_kml(&self) -> &'static str {
        match self {
            AltitudeMode::ClampToGround => "clampToGround",
            AltitudeMode::RelativeToGround => "relativeToGround",
            AltitudeMode::Absolute => "absolute",
        }
    }

    pub fn from_kml(text: &str) -> Self {
        match text.trim() {
            "relativeToGround" | "relativeToSeaFloor" => AltitudeMode::RelativeToGround,
            "absolute" => AltitudeMode::Absolute,
            _ => AltitudeMode::ClampToGround,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            AltitudeMode::ClampToGround => 0,
            AltitudeMode::RelativeToGround => 1,
            AltitudeMode::Absolute => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AltitudeMode::ClampToGround),
            1 => Some(AltitudeMode::RelativeToGround),
            2 => Some(AltitudeMode::Absolute),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point {
    pub coordinates: Coordinates,
    pub extrude: bool,
    pub altitude_mode: AltitudeMode,
}

impl Point {
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            ..Default::default()
        }
    }
}

/// Open polyline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString {
    pub coordinates: Vec<Coordinates>,
    pub tessellate: bool,
    pub extrude: bool,
    pub altitude_mode: AltitudeMode,
}

impl LineString {
    pub fn from_coordinates(coordinates: Vec<Coordinates>) -> Self {
        Self {
            coordinates,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn push(&mut self, c: Coordinates) {
        self.coordinates.push(c);
    }

    /// Great-circle length along the vertices on a sphere of the given radius
    pub fn length(&self, radius: f64) -> f64 {
        self.coordinates
            .windows(2)
            .map(|pair| haversine_distance(&pair[0], &pair[1], radius))
            .sum()
    }

    pub fn lat_lon_alt_box(&self) -> LatLonAltBox {
        LatLonAltBox::from_coordinates(&self.coordinates)
    }
}

/// Closed polyline; the closing segment is implicit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearRing(pub LineString);

impl LinearRing {
    pub fn from_coordinates(coordinates: Vec<Coordinates>) -> Self {
        Self(LineString::from_coordinates(coordinates))
    }

    pub fn length(&self, radius: f64) -> f64 {
        let open = self.0.length(radius);
        match (self.0.coordinates.first(), self.0.coordinates.last()) {
            (Some(first), Some(last)) if self.0.len() > 2 => {
                open + haversine_distance(last, first, radius)
            }
            _ => open,
        }
    }
}

impl Deref for LinearRing {
    type Target = LineString;

    fn deref(&self) -> &LineString {
        &self.0
    }
}

impl DerefMut for LinearRing {
    fn deref_mut(&mut self) -> &mut LineString {
        &mut self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub outer: LinearRing,
    pub inners: Vec<LinearRing>,
    pub tessellate: bool,
    pub extrude: bool,
    pub altitude_mode: AltitudeMode,
}

impl Polygon {
    pub fn new(outer: LinearRing) -> Self {
        Self {
            outer,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiGeometry {
    pub geometries: Vec<Geometry>,
}

impl MultiGeometry {
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn push(&mut self, geometry: Geometry) {
        self.geometries.push(geometry);
    }

    pub fn child(&self, row: usize) -> Option<&Geometry> {
        self.geometries.get(row)
    }
}

/// Time-stamped coordinate series (`gx:Track`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub when: Vec<String>,
    pub coordinates: Vec<Coordinates>,
    pub altitude_mode: AltitudeMode,
}

impl Track {
    pub fn add_point(&mut self, when: impl Into<String>, c: Coordinates) {
        self.when.push(when.into());
        self.coordinates.push(c);
    }

    pub fn size(&self) -> usize {
        self.coordinates.len()
    }

    pub fn line_string(&self) -> LineString {
        LineString::from_coordinates(self.coordinates.clone())
    }
}

/// Geometry owned by a placemark
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    LinearRing(LinearRing),
    Polygon(Polygon),
    MultiGeometry(MultiGeometry),
    Track(Track),
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::Point(Point::default())
    }
}

impl GeoNode for Geometry {
    fn node_type(&self) -> NodeType {
        match self {
            Geometry::Point(_) => NodeType::Point,
            Geometry::LineString(_) => NodeType::LineString,
            Geometry::LinearRing(_) => NodeType::LinearRing,
            Geometry::Polygon(_) => NodeType::Polygon,
            Geometry::MultiGeometry(_) => NodeType::MultiGeometry,
            Geometry::Track(_) => NodeType::Track,
        }
    }
}

impl Geometry {
    pub fn lat_lon_alt_box(&self) -> LatLonAltBox {
        match self {
            Geometry::Point(p) => LatLonAltBox::from_coordinates([&p.coordinates]),
            Geometry::LineString(l) => l.lat_lon_alt_box(),
            Geometry::LinearRing(r) => r.lat_lon_alt_box(),
            Geometry::Polygon(p) => p.outer.lat_lon_alt_box(),
            Geometry::MultiGeometry(m) => m
                .geometries
                .iter()
                .fold(LatLonAltBox::empty(), |acc, g| acc.united(&g.lat_lon_alt_box())),
            Geometry::Track(t) => LatLonAltBox::from_coordinates(&t.coordinates),
        }
    }

    /// Representative position: the point itself or the first vertex
    pub fn coordinate(&self) -> Option<Coordinates> {
        match self {
            Geometry::Point(p) => Some(p.coordinates),
            Geometry::LineString(l) => l.coordinates.first().copied(),
            Geometry::LinearRing(r) => r.coordinates.first().copied(),
            Geometry::Polygon(p) => p.outer.coordinates.first().copied(),
            Geometry::MultiGeometry(m) => m.geometries.iter().find_map(Geometry::coordinate),
            Geometry::Track(t) => t.coordinates.first().copied(),
        }
    }

    /// Number of rows the geometry exposes in a tree model
    pub fn child_count(&self) -> usize {
        match self {
            Geometry::MultiGeometry(m) => m.len(),
            _ => 0,
        }
    }
}
