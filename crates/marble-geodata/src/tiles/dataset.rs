use super::{MAX_TILE_LEVEL, TileId};
use crate::utils::gd;
use crate::{GeoDataError, LatLonAltBox, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Zero padded width of the row and column numbers in Marble tile paths
const TILE_DIGITS: usize = 6;

/// Server used when a dataset names no download url
const DEFAULT_DOWNLOAD_HOST: &str = "https://maps.kde.org/";

/// How tiles are laid out in the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageLayout {
    /// `<dir>/<z>/<yyyyyy>/<yyyyyy>_<xxxxxx>.<ext>`
    #[default]
    Marble,
    /// `<dir>/<z>/<x>/<y>.<ext>`
    OpenStreetMap,
    /// `<dir>/<z>/<x>/<y from bottom>.<ext>`
    TileMapService,
}

/// How tile urls are built from a prototype url
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerLayout {
    #[default]
    Marble,
    OpenStreetMap,
    /// Placeholders `{zoomLevel} {x} {y} {west} {south} {east} {north}`
    Custom,
    /// Placeholder `{quadIndex}`
    QuadTree,
    TileMapService,
    WebMapService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileProjection {
    #[default]
    Equirectangular,
    Mercator,
}

fn default_expire() -> u64 {
    i32::MAX as u64
}

fn default_tile_size() -> (u32, u32) {
    (256, 256)
}

fn default_level_zero_columns() -> u32 {
    2
}

fn default_level_zero_rows() -> u32 {
    1
}

/// One tiled layer of a map theme, deserialized from the theme JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDataset {
    pub name: String,
    pub source_dir: String,
    #[serde(default = "default_file_format")]
    pub file_format: String,
    #[serde(default)]
    pub storage_layout: StorageLayout,
    #[serde(default)]
    pub server_layout: ServerLayout,
    #[serde(default)]
    pub download_urls: Vec<String>,
    /// Seconds after which a cached tile is refreshed
    #[serde(default = "default_expire")]
    pub expire: u64,
    #[serde(default = "default_tile_size")]
    pub tile_size: (u32, u32),
    #[serde(default = "default_level_zero_columns")]
    pub level_zero_columns: u32,
    #[serde(default = "default_level_zero_rows")]
    pub level_zero_rows: u32,
    #[serde(default)]
    pub maximum_tile_level: Option<u32>,
    #[serde(default)]
    pub projection: TileProjection,
    #[serde(skip)]
    next_url: AtomicUsize,
}

fn default_file_format() -> String {
    "png".into()
}

impl TileDataset {
    pub fn new(name: impl Into<String>, source_dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_dir: source_dir.into(),
            file_format: default_file_format(),
            storage_layout: StorageLayout::default(),
            server_layout: ServerLayout::default(),
            download_urls: Vec::new(),
            expire: default_expire(),
            tile_size: default_tile_size(),
            level_zero_columns: default_level_zero_columns(),
            level_zero_rows: default_level_zero_rows(),
            maximum_tile_level: None,
            projection: TileProjection::default(),
            next_url: AtomicUsize::new(0),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Directory of the dataset relative to the data directory
    pub fn theme_str(&self) -> PathBuf {
        Path::new("maps").join(&self.source_dir)
    }

    pub fn tile_id(&self, zoom_level: u32, x: u32, y: u32) -> TileId {
        TileId::new(self.source_dir.as_str(), zoom_level, x, y)
    }

    /// Columns at `level`; levels past [`MAX_TILE_LEVEL`] count as the maximum
    pub fn tile_column_count(&self, level: u32) -> u32 {
        self.level_zero_columns.saturating_mul(1 << level.min(MAX_TILE_LEVEL))
    }

    pub fn tile_row_count(&self, level: u32) -> u32 {
        self.level_zero_rows.saturating_mul(1 << level.min(MAX_TILE_LEVEL))
    }

    fn suffix(&self) -> String {
        self.file_format.to_ascii_lowercase()
    }

    /// Cache path of a tile, relative to the data directory
    pub fn relative_tile_file_name(&self, id: &TileId) -> PathBuf {
        let suffix = self.suffix();
        let level = self.theme_str().join(id.zoom_level().to_string());
        match self.storage_layout {
            StorageLayout::Marble => level
                .join(format!("{:0w$}", id.y(), w = TILE_DIGITS))
                .join(format!(
                    "{:0w$}_{:0w$}.{suffix}",
                    id.y(),
                    id.x(),
                    w = TILE_DIGITS
                )),
            StorageLayout::OpenStreetMap => level
                .join(id.x().to_string())
                .join(format!("{}.{suffix}", id.y())),
            StorageLayout::TileMapService => level
                .join(id.x().to_string())
                .join(format!("{}.{suffix}", self.y_from_bottom(id))),
        }
    }

    fn y_from_bottom(&self, id: &TileId) -> u32 {
        self.tile_row_count(id.zoom_level())
            .saturating_sub(id.y())
            .saturating_sub(1)
    }

    /// Geographic extent of a tile in degrees
    pub fn tile_bounds(&self, id: &TileId) -> LatLonAltBox {
        let columns = f64::from(self.tile_column_count(id.zoom_level()));
        let rows = f64::from(self.tile_row_count(id.zoom_level()));
        let west = -180.0 + f64::from(id.x()) * 360.0 / columns;
        let east = -180.0 + f64::from(id.x() + 1) * 360.0 / columns;
        let (north, south) = match self.projection {
            TileProjection::Equirectangular => (
                90.0 - f64::from(id.y()) * 180.0 / rows,
                90.0 - f64::from(id.y() + 1) * 180.0 / rows,
            ),
            TileProjection::Mercator => {
                let lat = |row: u32| gd(PI - 2.0 * PI * f64::from(row) / rows).to_degrees();
                (lat(id.y()), lat(id.y() + 1))
            }
        };
        LatLonAltBox::new(north, south, east, west)
    }

    /// Download url of a tile; prototype urls are used round-robin
    pub fn download_url(&self, id: &TileId) -> Result<Url> {
        let prototype = if self.download_urls.is_empty() {
            format!("{DEFAULT_DOWNLOAD_HOST}{}", self.theme_str().to_string_lossy())
        } else {
            let next = self.next_url.fetch_add(1, Ordering::Relaxed);
            self.download_urls[next % self.download_urls.len()].clone()
        };
        let mut url = Url::parse(&prototype).map_err(|e| GeoDataError::Url(e.to_string()))?;
        let suffix = self.suffix();

        match self.server_layout {
            ServerLayout::Marble => {
                let path = format!(
                    "{}/{}/{:0w$}/{:0w$}_{:0w$}.{suffix}",
                    url.path().trim_end_matches('/'),
                    id.zoom_level(),
                    id.y(),
                    id.y(),
                    id.x(),
                    w = TILE_DIGITS
                );
                url.set_path(&path);
            }
            ServerLayout::OpenStreetMap => {
                let path = format!("{}/{}/{}/{}.{suffix}", url.path().trim_end_matches('/'), id.zoom_level(), id.x(), id.y());
                url.set_path(&path);
            }
            ServerLayout::TileMapService => {
                let path = format!(
                    "{}/{}/{}/{}.{suffix}",
                    url.path().trim_end_matches('/'),
                    id.zoom_level(),
                    id.x(),
                    self.y_from_bottom(id)
                );
                url.set_path(&path);
            }
            ServerLayout::Custom => {
                let bounds = self.tile_bounds(id);
                let text = prototype
                    .replace("{zoomLevel}", &id.zoom_level().to_string())
                    .replace("{x}", &id.x().to_string())
                    .replace("{y}", &id.y().to_string())
                    .replace("{west}", &format!("{:.12}", bounds.west))
                    .replace("{south}", &format!("{:.12}", bounds.south))
                    .replace("{east}", &format!("{:.12}", bounds.east))
                    .replace("{north}", &format!("{:.12}", bounds.north));
                url = Url::parse(&text).map_err(|e| GeoDataError::Url(e.to_string()))?;
            }
            ServerLayout::QuadTree => {
                let text = prototype.replace("{quadIndex}", &id.quad_index());
                url = Url::parse(&text).map_err(|e| GeoDataError::Url(e.to_string()))?;
            }
            ServerLayout::WebMapService => {
                let bounds = self.tile_bounds(id);
                let existing: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
                let has = |key: &str| existing.iter().any(|k| k == key);
                let format = if suffix == "jpg" {
                    "image/jpeg".to_string()
                } else {
                    format!("image/{suffix}")
                };
                let srs = match self.projection {
                    TileProjection::Equirectangular => "EPSG:4326",
                    TileProjection::Mercator => "EPSG:3785",
                };
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("service", "WMS")
                    .append_pair("request", "GetMap")
                    .append_pair("version", "1.1.1");
                if !has("styles") {
                    query.append_pair("styles", "");
                }
                if !has("format") {
                    query.append_pair("format", &format);
                }
                if !has("srs") {
                    query.append_pair("srs", srs);
                }
                if !has("layers") {
                    query.append_pair("layers", &self.name);
                }
                query
                    .append_pair("width", &self.tile_size.0.to_string())
                    .append_pair("height", &self.tile_size.1.to_string())
                    .append_pair(
                        "bbox",
                        &format!(
                            "{:.12},{:.12},{:.12},{:.12}",
                            bounds.west, bounds.south, bounds.east, bounds.north
                        ),
                    );
                drop(query);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osm() -> TileDataset {
        let mut dataset = TileDataset::new("OpenStreetMap", "earth/openstreetmap");
        dataset.storage_layout = StorageLayout::OpenStreetMap;
        dataset.server_layout = ServerLayout::OpenStreetMap;
        dataset.level_zero_columns = 1;
        dataset.projection = TileProjection::Mercator;
        dataset.download_urls = vec![
            "https://a.tile.openstreetmap.org/".into(),
            "https://b.tile.openstreetmap.org/".into(),
        ];
        dataset
    }

    #[test]
    fn test_storage_layouts() {
        let mut dataset = TileDataset::new("srtm", "earth/srtm2");
        let id = dataset.tile_id(3, 12, 5);
        assert_eq!(
            dataset.relative_tile_file_name(&id),
            PathBuf::from("maps/earth/srtm2/3/000005/000005_000012.png")
        );

        dataset.storage_layout = StorageLayout::OpenStreetMap;
        dataset.file_format = "JPG".into();
        assert_eq!(
            dataset.relative_tile_file_name(&id),
            PathBuf::from("maps/earth/srtm2/3/12/5.jpg")
        );

        dataset.storage_layout = StorageLayout::TileMapService;
        assert_eq!(
            dataset.relative_tile_file_name(&id),
            PathBuf::from("maps/earth/srtm2/3/12/2.jpg")
        );
    }

    #[test]
    fn test_round_robin_urls() {
        let dataset = osm();
        let id = dataset.tile_id(2, 1, 3);
        assert_eq!(
            dataset.download_url(&id).unwrap().as_str(),
            "https://a.tile.openstreetmap.org/2/1/3.png"
        );
        assert_eq!(
            dataset.download_url(&id).unwrap().as_str(),
            "https://b.tile.openstreetmap.org/2/1/3.png"
        );
    }

    #[test]
    fn test_marble_and_default_url() {
        let dataset = TileDataset::new("srtm", "earth/srtm2");
        let url = dataset.download_url(&dataset.tile_id(1, 2, 1)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://maps.kde.org/maps/earth/srtm2/1/000001/000001_000002.png"
        );
        assert_eq!(url.host_str(), Some("maps.kde.org"));
    }

    #[test]
    fn test_placeholder_layouts() {
        let mut dataset = TileDataset::new("custom", "earth/custom");
        dataset.server_layout = ServerLayout::Custom;
        dataset.download_urls = vec!["http://example.com/tile?z={zoomLevel}&x={x}&y={y}&w={west}".into()];
        let url = dataset.download_url(&dataset.tile_id(0, 1, 0)).unwrap();
        assert_eq!(url.as_str(), "http://example.com/tile?z=0&x=1&y=0&w=0.000000000000");

        dataset.server_layout = ServerLayout::QuadTree;
        dataset.download_urls = vec!["http://example.com/q/{quadIndex}.png".into()];
        let url = dataset.download_url(&dataset.tile_id(1, 1, 1)).unwrap();
        assert_eq!(url.as_str(), "http://example.com/q/03.png");
    }

    #[test]
    fn test_wms_query() {
        let mut dataset = TileDataset::new("layer", "earth/wms");
        dataset.server_layout = ServerLayout::WebMapService;
        dataset.download_urls = vec!["http://example.com/wms?layers=mine".into()];
        let url = dataset.download_url(&dataset.tile_id(0, 0, 0)).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert!(pairs.contains(&("layers".into(), "mine".into())));
        assert!(pairs.contains(&("srs".into(), "EPSG:4326".into())));
        assert!(pairs.contains(&("format".into(), "image/png".into())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "layers").count(), 1);
    }

    #[test]
    fn test_tile_counts_saturate_past_the_deepest_level() {
        let dataset = TileDataset::new("bm", "earth/bluemarble");
        assert_eq!(dataset.tile_column_count(3), 16);
        assert_eq!(dataset.tile_row_count(3), 8);
        assert_eq!(dataset.tile_column_count(40), dataset.tile_column_count(MAX_TILE_LEVEL));
        assert_eq!(dataset.tile_row_count(40), 1 << MAX_TILE_LEVEL);
    }

    #[test]
    fn test_tile_bounds() {
        let dataset = TileDataset::new("srtm", "earth/srtm2");
        let bounds = dataset.tile_bounds(&dataset.tile_id(0, 1, 0));
        assert_eq!((bounds.west, bounds.east), (0.0, 180.0));
        assert_eq!((bounds.north, bounds.south), (90.0, -90.0));

        let merc = osm();
        let bounds = merc.tile_bounds(&merc.tile_id(0, 0, 0));
        assert!((bounds.north - 85.0511).abs() < 1e-3);
        assert!((bounds.south + 85.0511).abs() < 1e-3);
    }

    #[test]
    fn test_from_json_defaults() {
        let dataset = TileDataset::from_json(
            r#"{"name": "Satellite", "sourceDir": "earth/bluemarble", "fileFormat": "jpg", "maximumTileLevel": 4}"#,
        )
        .unwrap();
        assert_eq!(dataset.tile_size, (256, 256));
        assert_eq!(dataset.level_zero_columns, 2);
        assert_eq!(dataset.maximum_tile_level, Some(4));
        assert_eq!(dataset.storage_layout, StorageLayout::Marble);
        assert!(TileDataset::from_json("{").is_err());
    }
}
