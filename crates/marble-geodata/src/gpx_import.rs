//! GPX import: waypoints, routes and tracks become placemarks

use crate::utils::waypoint_to_coordinates;
use crate::{
    Document, GeoFeature, Geometry, LineString, MultiGeometry, Placemark, Point, Result,
};
use std::io::BufReader;
use std::path::Path;

/// Convert parsed GPX data into a document
///
/// - Waypoints become point placemarks
/// - Routes become line strings
/// - Tracks become a line string, or a multi-geometry when they have several segments
pub fn gpx_to_document(gpx: &gpx::Gpx) -> Document {
    #[cfg(feature = "profiling")]
    profiling::scope!("gpx_import::gpx_to_document");

    let mut document = Document::new();
    if let Some(name) = gpx.metadata.as_ref().and_then(|m| m.name.as_ref()) {
        document.set_name(name.as_str());
    }

    for waypoint in &gpx.waypoints {
        let mut placemark = Placemark::with_geometry(
            waypoint.name.clone().unwrap_or_default(),
            Geometry::Point(Point::new(waypoint_to_coordinates(waypoint))),
        );
        if let Some(description) = &waypoint.description {
            placemark.set_description(description.as_str());
        }
        document.append(placemark);
    }

    for route in &gpx.routes {
        let line = LineString::from_coordinates(
            route.points.iter().map(waypoint_to_coordinates).collect(),
        );
        let mut placemark =
            Placemark::with_geometry(route.name.clone().unwrap_or_default(), Geometry::LineString(line));
        if let Some(description) = &route.description {
            placemark.set_description(description.as_str());
        }
        document.append(placemark);
    }

    for track in &gpx.tracks {
        let mut lines: Vec<Geometry> = track
            .segments
            .iter()
            .filter(|s| !s.points.is_empty())
            .map(|s| {
                Geometry::LineString(LineString::from_coordinates(
                    s.points.iter().map(waypoint_to_coordinates).collect(),
                ))
            })
            .collect();
        let geometry = if lines.len() == 1 {
            lines.remove(0)
        } else {
            Geometry::MultiGeometry(MultiGeometry { geometries: lines })
        };
        let mut placemark =
            Placemark::with_geometry(track.name.clone().unwrap_or_default(), geometry);
        if let Some(description) = &track.description {
            placemark.set_description(description.as_str());
        }
        document.append(placemark);
    }

    document
}

pub fn parse_gpx(text: &str) -> Result<Document> {
    let gpx = gpx::read(text.as_bytes())?;
    Ok(gpx_to_document(&gpx))
}

/// Read and convert a GPX file; the document remembers its file name
pub fn parse_gpx_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let gpx = gpx::read(BufReader::new(file))?;
    let mut document = gpx_to_document(&gpx);
    document.set_file_name(path.to_string_lossy());
    Ok(document)
}
