//! Tile lookup: memory cache, then disk, then a scaled coarser tile while downloading
//!
//! # Architecture
//!
//! - **Status**: a tile is `Missing`, `Expired` or `Available`, decided from the cached file's
//!   presence and age each time it is asked for
//! - **Placeholders**: a missing tile is replaced by the matching part of the nearest cached
//!   ancestor, scaled up; without any ancestor the placeholder is transparent
//! - **Completion**: finished downloads are decoded on the owning thread and announced as
//!   [`TileCompleted`] to every subscriber

use super::{
    DownloadEvent, DownloadUsage, HttpDownloadManager, MAX_TILE_LEVEL, TileDataset, TileId,
    parse_download_key,
};
use crate::parser::ParserRegistry;
use crate::Document;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

const DEFAULT_MEMORY_TILES: NonZeroUsize = NonZeroUsize::MIN.saturating_add(127);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Missing,
    Expired,
    Available,
}

/// A downloaded tile, decoded
#[derive(Debug, Clone)]
pub struct TileCompleted {
    pub id: TileId,
    pub image: Arc<RgbaImage>,
}

pub struct TileLoader {
    cache_dir: PathBuf,
    downloads: HttpDownloadManager,
    memory: LruCache<TileId, Arc<RgbaImage>>,
    subscribers: Vec<UnboundedSender<TileCompleted>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TileLoader {
    /// Tiles are cached below `cache_dir`; `downloads` should store there as well
    pub fn new(cache_dir: impl Into<PathBuf>, downloads: HttpDownloadManager) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            downloads,
            memory: LruCache::new(DEFAULT_MEMORY_TILES),
            subscribers: Vec::new(),
        }
    }

    pub fn set_memory_capacity(&mut self, tiles: NonZeroUsize) {
        self.memory.resize(tiles);
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn download_manager(&self) -> &HttpDownloadManager {
        &self.downloads
    }

    pub fn download_manager_mut(&mut self) -> &mut HttpDownloadManager {
        &mut self.downloads
    }

    /// Receive every [`TileCompleted`] from now on
    pub fn subscribe(&mut self) -> UnboundedReceiver<TileCompleted> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Absolute cache path of a tile
    pub fn tile_file_name(&self, dataset: &TileDataset, id: &TileId) -> PathBuf {
        let relative = dataset.relative_tile_file_name(id);
        if relative.is_absolute() {
            relative
        } else {
            self.cache_dir.join(relative)
        }
    }

    pub fn tile_status(&self, dataset: &TileDataset, id: &TileId) -> TileStatus {
        let Ok(metadata) = std::fs::metadata(self.tile_file_name(dataset, id)) else {
            return TileStatus::Missing;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if age >= dataset.expire {
            TileStatus::Expired
        } else {
            TileStatus::Available
        }
    }

    /// Image of a tile; never fails, falling back to a scaled coarser tile
    ///
    /// Expired and missing tiles are queued for download.
    pub fn load_tile_image(&mut self, dataset: &TileDataset, id: &TileId, usage: DownloadUsage) -> Arc<RgbaImage> {
        if let Some(image) = self.memory.get(id) {
            return Arc::clone(image);
        }

        let status = self.tile_status(dataset, id);
        if status != TileStatus::Missing {
            if status == TileStatus::Expired {
                tracing::debug!(%id, "Tile expired");
                self.trigger_download(dataset, id, usage);
            }
            match image::open(self.tile_file_name(dataset, id)) {
                Ok(image) => {
                    let image = Arc::new(image.to_rgba8());
                    self.memory.put(id.clone(), Arc::clone(&image));
                    return image;
                }
                Err(e) => tracing::warn!(%id, "Unreadable tile: {e}"),
            }
        }

        let replacement = self.scaled_lower_level_tile(dataset, id);
        self.trigger_download(dataset, id, usage);
        Arc::new(replacement)
    }

    /// Parsed vector tile, or an empty document while it is missing
    pub fn load_tile_vector_data(
        &mut self,
        dataset: &TileDataset,
        id: &TileId,
        usage: DownloadUsage,
        registry: &ParserRegistry,
    ) -> Document {
        let status = self.tile_status(dataset, id);
        if status != TileStatus::Missing {
            if status == TileStatus::Expired {
                self.trigger_download(dataset, id, usage);
            }
            match registry.parse_file(&self.tile_file_name(dataset, id)) {
                Ok(document) => return document,
                Err(e) => tracing::warn!(%id, "Unreadable vector tile: {e}"),
            }
        }
        self.trigger_download(dataset, id, usage);
        Document::new()
    }

    pub fn download_tile(&mut self, dataset: &TileDataset, id: &TileId, usage: DownloadUsage) {
        self.trigger_download(dataset, id, usage);
    }

    fn trigger_download(&mut self, dataset: &TileDataset, id: &TileId, usage: DownloadUsage) {
        match dataset.download_url(id) {
            Ok(url) => {
                self.downloads
                    .add_job(url, dataset.relative_tile_file_name(id), id.download_key(), usage);
            }
            Err(e) => tracing::warn!(%id, "No download url: {e}"),
        }
    }

    /// Configured maximum level, else one past the deepest level directory in the cache
    ///
    /// Never above [`MAX_TILE_LEVEL`]; deeper directories are ignored.
    pub fn maximum_tile_level(&self, dataset: &TileDataset) -> u32 {
        if let Some(level) = dataset.maximum_tile_level {
            return level.min(MAX_TILE_LEVEL);
        }
        let Ok(entries) = std::fs::read_dir(self.cache_dir.join(dataset.theme_str())) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok())
            .filter(|level| *level < MAX_TILE_LEVEL)
            .max()
            .map(|level| level + 1)
            .unwrap_or(0)
    }

    /// Whether every level zero tile is cached
    pub fn base_tiles_available(&self, dataset: &TileDataset) -> bool {
        (0..dataset.level_zero_columns).all(|x| {
            (0..dataset.level_zero_rows).all(|y| {
                let id = dataset.tile_id(0, x, y);
                let exists = self.tile_file_name(dataset, &id).exists();
                if !exists {
                    tracing::debug!(%id, "Base tile missing for {}", dataset.source_dir);
                }
                exists
            })
        })
    }

    /// Decode a finished download and announce it
    pub fn update_tile(&mut self, data: &[u8], key: &str) -> Option<TileCompleted> {
        let Some(id) = parse_download_key(key) else {
            tracing::warn!("Malformed download key {key:?}");
            return None;
        };
        let image = match image::load_from_memory(data) {
            Ok(image) => Arc::new(image.to_rgba8()),
            Err(e) => {
                tracing::debug!(%id, "Downloaded data is no image: {e}");
                return None;
            }
        };
        self.memory.put(id.clone(), Arc::clone(&image));

        let completed = TileCompleted { id, image };
        self.subscribers
            .retain(|tx| tx.send(completed.clone()).is_ok());
        Some(completed)
    }

    fn handle_events(&mut self, events: Vec<DownloadEvent>) -> Vec<TileCompleted> {
        events
            .into_iter()
            .filter_map(|event| match event {
                DownloadEvent::Completed { id, data } => self.update_tile(&data, &id),
                _ => None,
            })
            .collect()
    }

    /// Apply every finished download without blocking
    pub fn process_downloads(&mut self) -> Vec<TileCompleted> {
        let events = self.downloads.process_results();
        self.handle_events(events)
    }

    /// Wait for the next batch of finished downloads; empty when nothing is pending
    pub async fn wait_for_downloads(&mut self) -> Vec<TileCompleted> {
        let events = self.downloads.wait_for_events().await;
        self.handle_events(events)
    }

    /// Part of the nearest cached ancestor covering `id`, scaled to full tile size
    pub fn scaled_lower_level_tile(&self, dataset: &TileDataset, id: &TileId) -> RgbaImage {
        if id.zoom_level() > MAX_TILE_LEVEL {
            tracing::warn!(%id, "Tile level out of range");
            return RgbaImage::new(dataset.tile_size.0, dataset.tile_size.1);
        }
        let start = id.zoom_level().saturating_sub(1);
        for level in (0..=start).rev() {
            let Some(ancestor) = id.ancestor(level) else {
                continue;
            };
            let path = self.tile_file_name(dataset, &ancestor);
            let source = path
                .exists()
                .then(|| image::open(&path).ok().map(|i| i.to_rgba8()))
                .flatten();

            let source = match source {
                Some(image) => image,
                None if level == 0 => {
                    tracing::debug!(%id, "No level zero tile installed, using a transparent tile");
                    RgbaImage::new(dataset.tile_size.0, dataset.tile_size.1)
                }
                None => continue,
            };

            let delta = id.zoom_level() - level;
            let rest_x = id.x() % (1 << delta);
            let rest_y = id.y() % (1 << delta);
            let part_width = (source.width() >> delta).max(1);
            let part_height = (source.height() >> delta).max(1);
            let part = imageops::crop_imm(
                &source,
                rest_x * part_width,
                rest_y * part_height,
                part_width,
                part_height,
            )
            .to_image();
            return imageops::resize(&part, source.width(), source.height(), FilterType::Triangle);
        }
        RgbaImage::new(dataset.tile_size.0, dataset.tile_size.1)
    }
}
