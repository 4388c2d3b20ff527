//! Map tiles: addressing, on-disk layout, downloading and caching
//!
//! # Architecture
//!
//! - **[`TileDataset`]**: describes one tiled map (tile size, levels, storage and server layout)
//! - **[`HttpDownloadManager`]**: queues downloads per [`DownloadPolicy`] and retries failures
//! - **[`TileLoader`]**: serves tiles from memory, disk or a placeholder while downloads run
//! - **[`DownloadRegion`]**: computes the tile pyramids covering a box or a path
//!
//! Tiles are looked up by [`TileId`]. Downloads report back through [`DownloadEvent`]s which
//! the loader turns into [`TileCompleted`] notifications.

mod dataset;
mod download;
mod loader;
mod region;
mod tile_id;

pub use dataset::{ServerLayout, StorageLayout, TileDataset, TileProjection};
pub use download::{
    DownloadError, DownloadEvent, DownloadPolicy, DownloadPolicyKey, DownloadQueueSet,
    DownloadUsage, FetchFuture, FileStoragePolicy, HttpDownloadManager, HttpFetcher,
    MAX_RETRIES, REQUEUE_INTERVAL, StoragePolicy, TileFetcher,
};
pub use loader::{TileCompleted, TileLoader, TileStatus};
pub use region::{DownloadRegion, TileCoordsPyramid, TileRect, download_region};
pub use tile_id::{MAX_TILE_LEVEL, TileId, parse_download_key};
