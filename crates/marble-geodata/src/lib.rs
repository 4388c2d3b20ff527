//! Marble GeoData - the data core of the Marble virtual globe
//!
//! This library holds the scene data shown on the globe and the pipeline feeding map tiles and
//! terrain heights to it. Documents are read from KML and GPX, kept in a tree model that views
//! observe, and can be stored in a compact binary pack format.
//!
//! # Architecture
//!
//! - **[`Feature`]** / **[`Geometry`]**: the object model; features share their payload
//!   copy-on-write and every node reports its exact [`NodeType`]
//! - **[`ParserRegistry`]** / **[`FileLoader`]**: KML and GPX parsing, in the background on rayon
//! - **[`GeoDataTreeModel`]**: the single tree of loaded documents, addressed by [`ModelIndex`],
//!   with change notifications through [`TreeModelObserver`]
//! - **[`BranchFilterProxyModel`]**: restricts a view to one branch of the tree
//! - **[`BookmarkManager`]**: the bookmarks document and its KML file
//! - **[`tiles`]**: tile datasets, the [`tiles::TileLoader`] cache and the
//!   [`tiles::HttpDownloadManager`]
//! - **[`ElevationModel`]**: terrain heights interpolated from elevation tiles
//!
//! # Threading
//!
//! The tree model and the tile caches belong to one thread. Parsing and downloads run on worker
//! threads and hand their results back through channels; nothing is shared mutably.

mod bookmarks;
mod branch_filter;
mod coordinates;
mod elevation;
mod extended_data;
mod feature;
mod geometry;
mod gpx_import;
pub mod kml;
mod object;
pub mod pack;
mod parser;
mod style;
mod time;
pub mod tiles;
mod tour;
mod tree_model;
pub mod utils;
mod visual_category;

// Public API exports
pub use bookmarks::{BOOKMARK_FILE, BookmarkManager, DEFAULT_FOLDER_NAME};
pub use branch_filter::BranchFilterProxyModel;
pub use coordinates::{Coordinates, LatLonAltBox};
pub use elevation::{ElevationModel, INVALID_ELEVATION_DATA};
pub use extended_data::{Data, ExtendedData, Variant};
pub use feature::{
    Container, Document, DocumentRole, Feature, FeatureCore, FeatureData, Folder, GeoFeature,
    Placemark,
};
pub use geometry::{
    AltitudeMode, Geometry, LineString, LinearRing, MultiGeometry, Point, Polygon, Track,
};
pub use gpx_import::{gpx_to_document, parse_gpx, parse_gpx_file};
pub use object::{GeoCast, GeoNode, NodeRef, NodeType, ObjectUid, geodata_cast};
pub use parser::{
    DocumentParser, DocumentWriter, FileLoadResult, FileLoader, GPX_MIME_TYPE, GpxFormat,
    KML_MIME_TYPE, KmlFormat, ParserRegistry,
};
pub use style::{
    BalloonStyle, Color, HotSpot, HotSpotUnits, IconStyle, LabelStyle, LineStyle, ListItemType,
    ListStyle, PolyStyle, Style, StyleMap, default_style,
};
pub use time::{TimeResolution, TimeSpan, TimeStamp};
pub use tour::{FlyToMode, LookAt, PlayMode, Playlist, Tour, TourPrimitive};
pub use tree_model::{
    CheckState, GeoDataTreeModel, ItemData, ItemFlags, ModelIndex, Role, TreeModelObserver,
};
pub use visual_category::VisualCategory;

/// Error types for the data module
#[derive(Debug, thiserror::Error)]
pub enum GeoDataError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("KML error: {0}")]
    Kml(String),

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("Pack format error: {0}")]
    Pack(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid url: {0}")]
    Url(String),

    #[error("Download error: {0}")]
    Download(#[from] tiles::DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeoDataError>;
