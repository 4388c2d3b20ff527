//! Tile ranges covering a region, and bulk downloads of them

use super::{DownloadUsage, MAX_TILE_LEVEL, TileDataset, TileLoader, TileProjection};
use crate::utils::gd_inv;
use crate::{LatLonAltBox, LineString};
use std::collections::HashSet;
use std::f64::consts::PI;

/// Latitude (radians) beyond which Mercator pixel rows are clamped
const MERCATOR_CLAMP_LAT: f64 = 1.4835;
/// Mercator ordinate used at the clamp latitude
const MERCATOR_CLAMP_Y: f64 = 3.130_958_7;

/// Inclusive rectangle of tile columns and rows at one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl TileRect {
    pub fn width(&self) -> u64 {
        u64::from(self.x2.saturating_sub(self.x1)) + 1
    }

    pub fn height(&self) -> u64 {
        u64::from(self.y2.saturating_sub(self.y1)) + 1
    }
}

/// Tile rectangles of every level between a top and a bottom level
///
/// Only the bottom (most detailed) rectangle is stored; coarser levels are derived by shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoordsPyramid {
    top_level: u32,
    bottom_level: u32,
    bottom_level_coords: TileRect,
}

impl TileCoordsPyramid {
    pub fn new(top_level: u32, bottom_level: u32, bottom_level_coords: TileRect) -> Self {
        debug_assert!(top_level <= bottom_level);
        Self {
            top_level,
            bottom_level,
            bottom_level_coords,
        }
    }

    pub fn top_level(&self) -> u32 {
        self.top_level
    }

    pub fn bottom_level(&self) -> u32 {
        self.bottom_level
    }

    pub fn bottom_level_coords(&self) -> TileRect {
        self.bottom_level_coords
    }

    pub fn coords(&self, level: u32) -> TileRect {
        debug_assert!(self.top_level <= level && level <= self.bottom_level);
        let delta = self.bottom_level.saturating_sub(level);
        let r = self.bottom_level_coords;
        let shift = |v: u32| v.checked_shr(delta).unwrap_or(0);
        TileRect {
            x1: shift(r.x1),
            y1: shift(r.y1),
            x2: shift(r.x2),
            y2: shift(r.y2),
        }
    }

    /// Number of tiles over all levels
    pub fn tiles_count(&self) -> u64 {
        (self.top_level..=self.bottom_level)
            .map(|level| {
                let r = self.coords(level);
                r.width() * r.height()
            })
            .sum()
    }
}

/// Which tiles to fetch for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadRegion {
    /// Top (coarse) and bottom (detailed) level to download
    pub tile_level_range: (u32, u32),
    /// Level the region's pixel coordinates are computed at
    pub visible_tile_level: u32,
}

impl DownloadRegion {
    /// Levels are capped at [`MAX_TILE_LEVEL`]
    pub fn new(minimum_level: u32, maximum_level: u32, visible_tile_level: u32) -> Self {
        debug_assert!(minimum_level <= maximum_level);
        Self {
            tile_level_range: (
                minimum_level.min(MAX_TILE_LEVEL),
                maximum_level.min(MAX_TILE_LEVEL),
            ),
            visible_tile_level: visible_tile_level.min(MAX_TILE_LEVEL),
        }
    }

    fn rad_to_pixel_x(&self, dataset: &TileDataset, lon: f64) -> i64 {
        let global_width = f64::from(dataset.tile_size.0)
            * f64::from(dataset.tile_column_count(self.visible_tile_level));
        (global_width * 0.5 + lon * (global_width / (2.0 * PI))) as i64
    }

    fn rad_to_pixel_y(&self, dataset: &TileDataset, lat: f64) -> i64 {
        let global_height = f64::from(dataset.tile_size.1)
            * f64::from(dataset.tile_row_count(self.visible_tile_level));
        let norm = global_height / PI;
        let y = match dataset.projection {
            TileProjection::Equirectangular => global_height * 0.5 - lat * norm,
            TileProjection::Mercator if lat.abs() < MERCATOR_CLAMP_LAT => {
                global_height * 0.5 - gd_inv(lat) * 0.5 * norm
            }
            TileProjection::Mercator => {
                global_height * 0.5 - lat.signum() * MERCATOR_CLAMP_Y * 0.5 * norm
            }
        };
        y as i64
    }

    /// Shift visible level pixels to the bottom level
    fn to_bottom_level(&self, pixel: i64) -> i64 {
        let bottom = self.tile_level_range.1.min(MAX_TILE_LEVEL);
        let visible = self.visible_tile_level.min(MAX_TILE_LEVEL);
        if visible > bottom {
            pixel >> (visible - bottom)
        } else {
            pixel << (bottom - visible)
        }
    }

    fn clamp_rect(dataset: &TileDataset, level: u32, x1: i64, y1: i64, x2: i64, y2: i64) -> TileRect {
        let max_x = i64::from(dataset.tile_column_count(level)) - 1;
        let max_y = i64::from(dataset.tile_row_count(level)) - 1;
        let clamp = |v: i64, max: i64| v.clamp(0, max.max(0)) as u32;
        TileRect {
            x1: clamp(x1, max_x),
            y1: clamp(y1, max_y),
            x2: clamp(x2, max_x),
            y2: clamp(y2, max_y),
        }
    }

    /// Pyramid covering a lat/lon box (degrees)
    pub fn region(&self, dataset: &TileDataset, region: &LatLonAltBox) -> Vec<TileCoordsPyramid> {
        let west_x = self.rad_to_pixel_x(dataset, region.west.to_radians());
        let north_y = self.rad_to_pixel_y(dataset, region.north.to_radians());
        let east_x = self.rad_to_pixel_x(dataset, region.east.to_radians());
        let south_y = self.rad_to_pixel_y(dataset, region.south.to_radians());

        let x1 = self.to_bottom_level(west_x.min(east_x));
        let y1 = self.to_bottom_level(north_y.min(south_y));
        let x2 = self.to_bottom_level(west_x.max(east_x));
        let y2 = self.to_bottom_level(north_y.max(south_y));

        let (w, h) = (i64::from(dataset.tile_size.0), i64::from(dataset.tile_size.1));
        let round_up = |v: i64, size: i64| v / size + i64::from(v % size > 0);
        let bottom = self.tile_level_range.1;
        let rect = Self::clamp_rect(dataset, bottom, x1 / w, y1 / h, round_up(x2, w), round_up(y2, h));

        let pyramid = TileCoordsPyramid::new(self.tile_level_range.0, bottom, rect);
        tracing::debug!(?rect, tiles = pyramid.tiles_count(), "Region pyramid");
        vec![pyramid]
    }

    /// One pyramid per waypoint (after the first) covering `offset` meters around it
    pub fn from_path(
        &self,
        dataset: &TileDataset,
        offset: f64,
        waypoints: &LineString,
        planet_radius: f64,
    ) -> Vec<TileCoordsPyramid> {
        let (top, bottom) = self.tile_level_range;
        let (w, h) = (i64::from(dataset.tile_size.0), i64::from(dataset.tile_size.1));
        let radian_offset = offset / planet_radius;

        waypoints
            .coordinates
            .iter()
            .skip(1)
            .map(|position| {
                let lon = position.lon_rad();
                let lat = position.lat_rad();
                let (north_east, south_west) = (7.0 * PI / 4.0, 3.0 * PI / 4.0);

                let lat_north = (lat.sin() * radian_offset.cos()
                    + lat.cos() * radian_offset.sin() * north_east.cos())
                .asin();
                let dlon_west = (north_east.sin() * radian_offset.sin() * lat.cos())
                    .atan2(radian_offset.cos() - lat.sin() * lat_north.sin());
                let lon_west = (lon - dlon_west + PI) % (2.0 * PI) - PI;
                let lat_south = (lat.sin() * radian_offset.cos()
                    + lat.cos() * radian_offset.sin() * south_west.cos())
                .asin();
                let dlon_east = (south_west.sin() * radian_offset.sin() * lat.cos())
                    .atan2(radian_offset.cos() - lat.sin() * lat_south.sin());
                let lon_east = (lon - dlon_east + PI) % (2.0 * PI) - PI;

                let north_y = self.rad_to_pixel_y(dataset, lat_north);
                let south_y = self.rad_to_pixel_y(dataset, lat_south);
                let east_x = self.rad_to_pixel_x(dataset, lon_east);
                let west_x = self.rad_to_pixel_x(dataset, lon_west);

                let x1 = self.to_bottom_level(west_x.min(east_x));
                let y1 = self.to_bottom_level(north_y.min(south_y));
                let x2 = self.to_bottom_level(west_x.max(east_x));
                let y2 = self.to_bottom_level(north_y.max(south_y));
                let rect = Self::clamp_rect(dataset, bottom, x1 / w, y1 / h, x2 / w, y2 / h);
                TileCoordsPyramid::new(top, bottom, rect)
            })
            .collect()
    }
}

/// Request every tile of `pyramids` with [`DownloadUsage::Bulk`]
///
/// Levels are queued from the most detailed to the coarsest, so the LIFO download stacks serve
/// coarse tiles first. Returns the number of distinct tiles requested.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn download_region(loader: &mut TileLoader, dataset: &TileDataset, pyramids: &[TileCoordsPyramid]) -> usize {
    let Some(first) = pyramids.first() else {
        return 0;
    };
    let mut total = 0;
    for level in (first.top_level()..=first.bottom_level()).rev() {
        let mut tiles = HashSet::new();
        for pyramid in pyramids {
            let r = pyramid.coords(level);
            for x in r.x1..=r.x2 {
                for y in r.y1..=r.y2 {
                    tiles.insert(dataset.tile_id(level, x, y));
                }
            }
        }
        tracing::debug!(level, count = tiles.len(), "Requesting region tiles");
        for id in &tiles {
            loader.download_tile(dataset, id, DownloadUsage::Bulk);
        }
        total += tiles.len();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinates;
    use crate::tiles::{FetchFuture, HttpDownloadManager, TileFetcher, DownloadError};
    use crate::utils::EARTH_RADIUS;
    use reqwest::Url;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    struct Offline;

    impl TileFetcher for Offline {
        fn fetch(&self, _url: Url) -> FetchFuture {
            Box::pin(async { Err(DownloadError::Other("offline".into())) })
        }
    }

    fn osm() -> TileDataset {
        let mut dataset = TileDataset::new("osm", "earth/openstreetmap");
        dataset.level_zero_columns = 1;
        dataset.level_zero_rows = 1;
        dataset.projection = TileProjection::Mercator;
        dataset
    }

    #[test]
    fn test_pyramid_coords_and_count() {
        let pyramid = TileCoordsPyramid::new(0, 2, TileRect { x1: 1, y1: 2, x2: 3, y2: 3 });
        assert_eq!(pyramid.coords(1), TileRect { x1: 0, y1: 1, x2: 1, y2: 1 });
        assert_eq!(pyramid.coords(0), TileRect { x1: 0, y1: 0, x2: 0, y2: 0 });
        assert_eq!(pyramid.tiles_count(), 6 + 2 + 1);
    }

    #[test]
    fn test_levels_beyond_the_deepest_are_capped() {
        let region = DownloadRegion::new(0, 40, 40);
        assert_eq!(region.tile_level_range, (0, MAX_TILE_LEVEL));
        let pyramids = region.region(&osm(), &LatLonAltBox::new(1.0, -1.0, 1.0, -1.0));
        assert_eq!(pyramids[0].bottom_level(), MAX_TILE_LEVEL);
        assert_eq!(pyramids[0].coords(0), TileRect { x1: 0, y1: 0, x2: 0, y2: 0 });

        let deep = TileCoordsPyramid::new(0, 40, TileRect { x1: 7, y1: 7, x2: 9, y2: 9 });
        assert_eq!(deep.coords(0), TileRect { x1: 0, y1: 0, x2: 0, y2: 0 });
    }

    #[test]
    fn test_whole_world_region() {
        let region = DownloadRegion::new(0, 2, 2);
        let pyramids = region.region(&osm(), &LatLonAltBox::new(85.0, -85.0, 179.9, -180.0));
        assert_eq!(pyramids.len(), 1);
        assert_eq!(pyramids[0].coords(2), TileRect { x1: 0, y1: 0, x2: 3, y2: 3 });
        assert_eq!(pyramids[0].tiles_count(), 16 + 4 + 1);
    }

    #[test]
    fn test_small_region_shifted_from_visible_level() {
        let region = DownloadRegion::new(1, 3, 1);
        // north east quadrant of the equirectangular world, away from tile borders
        let pyramids = region.region(
            &TileDataset::new("bm", "earth/bluemarble"),
            &LatLonAltBox::new(80.0, 10.0, 170.0, 10.0),
        );
        // clamped to the last column, rounded up to row 4
        assert_eq!(pyramids[0].coords(3), TileRect { x1: 8, y1: 0, x2: 15, y2: 4 });
    }

    #[test]
    fn test_from_path_yields_pyramid_per_segment() {
        let region = DownloadRegion::new(0, 4, 4);
        let path = LineString::from_coordinates(vec![
            Coordinates::new(13.0, 52.0, 0.0),
            Coordinates::new(13.5, 52.5, 0.0),
            Coordinates::new(14.0, 53.0, 0.0),
        ]);
        let pyramids = region.from_path(&osm(), 5_000.0, &path, EARTH_RADIUS);
        assert_eq!(pyramids.len(), 2);
        for pyramid in &pyramids {
            let r = pyramid.coords(4);
            assert!(r.x1 <= r.x2 && r.y1 <= r.y2);
            // both waypoints lie in column 8, row 5 at level 4
            assert_eq!((r.x1, r.y1), (8, 5));
        }
    }

    #[tokio::test]
    async fn test_download_region_dedups_per_level() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = HttpDownloadManager::new(None, Arc::new(Offline), Handle::current());
        let mut loader = TileLoader::new(dir.path(), downloads);
        let dataset = osm();
        let a = TileCoordsPyramid::new(0, 1, TileRect { x1: 0, y1: 0, x2: 1, y2: 0 });
        let b = TileCoordsPyramid::new(0, 1, TileRect { x1: 1, y1: 0, x2: 1, y2: 1 });

        assert_eq!(download_region(&mut loader, &dataset, &[a, b]), 3 + 1);
        assert_eq!(loader.download_manager().pending_jobs(), 4);
        assert_eq!(download_region(&mut loader, &dataset, &[]), 0);
    }
}
