//! Node identity, type tags and exact-type downcasting
//!
//! Every scene element reports a [`NodeType`] whose string form is a process-wide constant.
//! [`geodata_cast`] turns a type-erased [`NodeRef`] back into a concrete type, succeeding only
//! when the concrete type matches exactly.

use crate::{
    Document, Feature, Folder, Geometry, LineString, LinearRing, MultiGeometry, Placemark,
    Playlist, Point, Polygon, Tour, TourPrimitive, Track,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one object instance
///
/// Copies of a feature share their payload but never their uid, so observers can key caches
/// by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUid(u64);

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

impl ObjectUid {
    pub fn next() -> Self {
        Self(NEXT_UID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Concrete type of a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Folder,
    Placemark,
    Tour,
    Point,
    LineString,
    LinearRing,
    Polygon,
    MultiGeometry,
    Track,
    Playlist,
    Wait,
    FlyTo,
    SoundCue,
    TourControl,
}

impl NodeType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeType::Document => "GeoDataDocumentType",
            NodeType::Folder => "GeoDataFolderType",
            NodeType::Placemark => "GeoDataPlacemarkType",
            NodeType::Tour => "GeoDataTourType",
            NodeType::Point => "GeoDataPointType",
            NodeType::LineString => "GeoDataLineStringType",
            NodeType::LinearRing => "GeoDataLinearRingType",
            NodeType::Polygon => "GeoDataPolygonType",
            NodeType::MultiGeometry => "GeoDataMultiGeometryType",
            NodeType::Track => "GeoDataTrackType",
            NodeType::Playlist => "GeoDataPlaylistType",
            NodeType::Wait => "GeoDataWaitType",
            NodeType::FlyTo => "GeoDataFlyToType",
            NodeType::SoundCue => "GeoDataSoundCueType",
            NodeType::TourControl => "GeoDataTourControlType",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeType::Document | NodeType::Folder)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can report its concrete node type
pub trait GeoNode {
    fn node_type(&self) -> NodeType;
}

/// Borrowed, type-erased view of any node reachable in a document tree
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Feature(&'a Feature),
    Geometry(&'a Geometry),
    Playlist(&'a Playlist),
    Primitive(&'a TourPrimitive),
}

impl GeoNode for NodeRef<'_> {
    fn node_type(&self) -> NodeType {
        match self {
            NodeRef::Feature(f) => f.node_type(),
            NodeRef::Geometry(g) => g.node_type(),
            NodeRef::Playlist(_) => NodeType::Playlist,
            NodeRef::Primitive(p) => p.node_type(),
        }
    }
}

impl<'a> From<&'a Feature> for NodeRef<'a> {
    fn from(feature: &'a Feature) -> Self {
        NodeRef::Feature(feature)
    }
}

impl<'a> From<&'a Geometry> for NodeRef<'a> {
    fn from(geometry: &'a Geometry) -> Self {
        NodeRef::Geometry(geometry)
    }
}

impl<'a> From<&'a Playlist> for NodeRef<'a> {
    fn from(playlist: &'a Playlist) -> Self {
        NodeRef::Playlist(playlist)
    }
}

impl<'a> From<&'a TourPrimitive> for NodeRef<'a> {
    fn from(primitive: &'a TourPrimitive) -> Self {
        NodeRef::Primitive(primitive)
    }
}

/// Concrete node types reachable through [`geodata_cast`]
pub trait GeoCast: Sized {
    const NODE_TYPE: NodeType;

    fn cast<'a>(node: NodeRef<'a>) -> Option<&'a Self>;
}

/// Exact-type downcast
///
/// Returns `Some` iff the concrete type of `node` is exactly `T`.
pub fn geodata_cast<'a, T: GeoCast>(node: impl Into<NodeRef<'a>>) -> Option<&'a T> {
    let node = node.into();
    if node.node_type() != T::NODE_TYPE {
        return None;
    }
    T::cast(node)
}

macro_rules! feature_cast {
    ($ty:ident) => {
        impl GeoCast for $ty {
            const NODE_TYPE: NodeType = NodeType::$ty;

            fn cast<'a>(node: NodeRef<'a>) -> Option<&'a Self> {
                match node {
                    NodeRef::Feature(Feature::$ty(inner)) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! geometry_cast {
    ($ty:ident) => {
        impl GeoCast for $ty {
            const NODE_TYPE: NodeType = NodeType::$ty;

            fn cast<'a>(node: NodeRef<'a>) -> Option<&'a Self> {
                match node {
                    NodeRef::Geometry(Geometry::$ty(inner)) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

feature_cast!(Document);
feature_cast!(Folder);
feature_cast!(Placemark);
feature_cast!(Tour);
geometry_cast!(Point);
geometry_cast!(LineString);
geometry_cast!(LinearRing);
geometry_cast!(Polygon);
geometry_cast!(MultiGeometry);
geometry_cast!(Track);

impl GeoCast for Playlist {
    const NODE_TYPE: NodeType = NodeType::Playlist;

    fn cast<'a>(node: NodeRef<'a>) -> Option<&'a Self> {
        match node {
            NodeRef::Playlist(playlist) => Some(playlist),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinates, GeoFeature};

    fn line() -> Geometry {
        Geometry::LineString(LineString::from_coordinates(vec![
            Coordinates::new(0.0, 0.0, 0.0),
            Coordinates::new(1.0, 1.0, 0.0),
        ]))
    }

    #[test]
    fn test_uids_are_unique() {
        let a = ObjectUid::next();
        let b = ObjectUid::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_exact_type_cast_on_geometry() {
        let geometry = line();
        assert!(geodata_cast::<LineString>(&geometry).is_some());
        assert!(geodata_cast::<LinearRing>(&geometry).is_none());
        assert!(geodata_cast::<Point>(&geometry).is_none());
        assert!(geodata_cast::<MultiGeometry>(&geometry).is_none());

        let ring = Geometry::LinearRing(LinearRing::default());
        assert!(geodata_cast::<LinearRing>(&ring).is_some());
        assert!(geodata_cast::<LineString>(&ring).is_none());
    }

    #[test]
    fn test_exact_type_cast_on_feature() {
        let mut placemark = Placemark::new();
        placemark.set_name("A");
        let feature = Feature::Placemark(placemark);
        assert_eq!(geodata_cast::<Placemark>(&feature).unwrap().name(), "A");
        assert!(geodata_cast::<Folder>(&feature).is_none());
        assert!(geodata_cast::<Document>(&feature).is_none());

        let folder = Feature::Folder(Folder::new());
        assert!(geodata_cast::<Folder>(&folder).is_some());
        assert!(geodata_cast::<Document>(&folder).is_none());
    }

    #[test]
    fn test_node_type_strings() {
        assert_eq!(NodeType::Placemark.as_str(), "GeoDataPlacemarkType");
        assert_eq!(line().node_type().to_string(), "GeoDataLineStringType");
        assert!(NodeType::Folder.is_container());
        assert!(!NodeType::Placemark.is_container());
    }
}
