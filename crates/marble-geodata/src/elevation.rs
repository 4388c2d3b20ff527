//! Terrain heights sampled from an elevation tile dataset
//!
//! Each pixel of an elevation tile stores a signed 16 bit height in meters in its green
//! (high byte) and blue (low byte) channels. [`INVALID_ELEVATION_DATA`] marks missing samples.

use crate::tiles::{DownloadUsage, TileCompleted, TileDataset, TileId, TileLoader};
use crate::Coordinates;
use image::RgbaImage;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Height returned where no elevation is known
pub const INVALID_ELEVATION_DATA: f64 = 32768.0;

const INVALID_SAMPLE: u16 = 32768;

/// Profile samples at or above this height are dropped
const PROFILE_HEIGHT_LIMIT: f64 = 32000.0;

const CACHED_TILES: NonZeroUsize = NonZeroUsize::MIN.saturating_add(9);

pub struct ElevationModel {
    dataset: Option<TileDataset>,
    loader: TileLoader,
    cache: LruCache<TileId, Arc<RgbaImage>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ElevationModel {
    /// Without a dataset every query answers [`INVALID_ELEVATION_DATA`]
    pub fn new(loader: TileLoader, dataset: Option<TileDataset>) -> Self {
        if dataset.is_none() {
            tracing::warn!("No elevation dataset configured, no elevation will be returned");
        }
        Self {
            dataset,
            loader,
            cache: LruCache::new(CACHED_TILES),
        }
    }

    pub fn dataset(&self) -> Option<&TileDataset> {
        self.dataset.as_ref()
    }

    pub fn set_dataset(&mut self, dataset: Option<TileDataset>) {
        self.dataset = dataset;
        self.cache.clear();
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut TileLoader {
        &mut self.loader
    }

    fn tile(&mut self, dataset: &TileDataset, id: TileId) -> Arc<RgbaImage> {
        if let Some(image) = self.cache.get(&id) {
            return Arc::clone(image);
        }
        let image = self.loader.load_tile_image(dataset, &id, DownloadUsage::Browse);
        self.cache.put(id, Arc::clone(&image));
        image
    }

    /// Height in meters at `lon`/`lat` (degrees), interpolated from the four nearest samples
    pub fn height(&mut self, lon: f64, lat: f64) -> f64 {
        let Some(dataset) = self.dataset.take() else {
            return INVALID_ELEVATION_DATA;
        };
        let height = self.sample(&dataset, lon, lat);
        self.dataset = Some(dataset);
        height
    }

    fn sample(&mut self, dataset: &TileDataset, lon: f64, lat: f64) -> f64 {
        let level = self.loader.maximum_tile_level(dataset);
        let (width, height) = (i64::from(dataset.tile_size.0), i64::from(dataset.tile_size.1));
        let total_x = i64::from(dataset.tile_column_count(level)) * width;
        let total_y = i64::from(dataset.tile_row_count(level)) * height;
        if total_x == 0 || total_y == 0 {
            return INVALID_ELEVATION_DATA;
        }

        let texture_x = (180.0 + lon) * total_x as f64 / 360.0;
        let texture_y = (90.0 - lat) * total_y as f64 / 180.0;

        let mut weighted = 0.0;
        let mut valid_weight = 0.0;
        let mut valid = Vec::with_capacity(4);
        for i in 0..4 {
            let x = (texture_x as i64 + i % 2).rem_euclid(total_x);
            let y = (texture_y as i64 + i / 2).rem_euclid(total_y);
            let id = dataset.tile_id(level, (x / width) as u32, (y / height) as u32);
            let image = self.tile(dataset, id);

            let Some(pixel) = image.get_pixel_checked((x % width) as u32, (y % height) as u32) else {
                continue;
            };
            let raw = (u16::from(pixel.0[1]) << 8) | u16::from(pixel.0[2]);
            if raw == INVALID_SAMPLE {
                continue;
            }
            let elevation = f64::from(raw as i16);

            let sample_x = (texture_x as i64 + i % 2) as f64;
            let sample_y = (texture_y as i64 + i / 2) as f64;
            let weight = (1.0 - (texture_x - sample_x).abs()) * (1.0 - (texture_y - sample_y).abs());
            weighted += elevation * weight;
            valid_weight += weight;
            valid.push(elevation);
        }

        if valid.is_empty() {
            INVALID_ELEVATION_DATA
        } else if valid_weight > f64::EPSILON {
            weighted / valid_weight
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        }
    }

    /// Heights along the line between two points, one texture pixel apart
    ///
    /// The coordinate with the larger change advances by one pixel per step, the other by the
    /// matching fraction. Points without elevation are left out.
    pub fn height_profile(&mut self, from_lon: f64, from_lat: f64, to_lon: f64, to_lat: f64) -> Vec<Coordinates> {
        let Some(dataset) = self.dataset.take() else {
            return Vec::new();
        };

        let level = self.loader.maximum_tile_level(&dataset);
        let pixels_x = f64::from(dataset.tile_size.0) * f64::from(dataset.tile_column_count(level));
        let dist_per_pixel = 360.0 / pixels_x;
        let dir_lat = if from_lat < to_lat { 1.0 } else { -1.0 };
        let dir_lon = if from_lon < to_lon { 1.0 } else { -1.0 };
        let k = ((from_lat - to_lat) / (from_lon - to_lon)).abs();

        let mut profile = Vec::new();
        let (mut lon, mut lat) = (from_lon, from_lat);
        while lat * dir_lat <= to_lat * dir_lat && lon * dir_lon <= to_lon * dir_lon && dist_per_pixel.is_finite() {
            let h = self.sample(&dataset, lon, lat);
            if h < PROFILE_HEIGHT_LIMIT {
                profile.push(Coordinates::new(lon, lat, h));
            }
            if k < 0.5 {
                lat += dist_per_pixel * k * dir_lat;
                lon += dist_per_pixel * dir_lon;
            } else {
                lat += dist_per_pixel * dir_lat;
                lon += dist_per_pixel / k * dir_lon;
            }
        }

        self.dataset = Some(dataset);
        profile
    }

    /// Forget a cached tile so the next query reads the fresh one
    pub fn tile_completed(&mut self, id: &TileId) {
        if self.cache.pop(id).is_some() {
            tracing::debug!(%id, "Elevation tile updated");
        }
    }

    fn apply(&mut self, completed: &[TileCompleted]) -> bool {
        for tile in completed {
            self.tile_completed(&tile.id);
        }
        !completed.is_empty()
    }

    /// Apply finished downloads; true when new elevation data became available
    pub fn process_downloads(&mut self) -> bool {
        let completed = self.loader.process_downloads();
        self.apply(&completed)
    }

    /// Wait for the next finished downloads; false when nothing is pending
    pub async fn wait_for_update(&mut self) -> bool {
        let completed = self.loader.wait_for_downloads().await;
        self.apply(&completed)
    }
}
