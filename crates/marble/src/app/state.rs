//! Application state
//!
//! Owns the tree model every command works on, the parser registry, the persisted preferences
//! and the directories data and tiles live in.

use crate::app::AppError;
use crate::app::settings::Settings;
use crate::app::storage::{
    StorageBackend, StorageError, default_storage_backend, load_json_backend, save_json_backend,
};
use marble_geodata::tiles::{
    FileStoragePolicy, HttpDownloadManager, HttpFetcher, TileDataset, TileLoader,
};
use marble_geodata::{
    BOOKMARK_FILE, BookmarkManager, FileLoader, GeoDataError, GeoDataTreeModel, ParserRegistry,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Number of files kept in the recent files list
pub const MAX_RECENT_FILES: usize = 10;

const PREFERENCES_KEY: &str = "preferences";

/// User agent sent with tile downloads
pub const USER_AGENT: &str = concat!("Marble/", env!("CARGO_PKG_VERSION"));

/// Preferences persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Most recently opened documents, newest first
    pub recent_files: Vec<PathBuf>,
    pub download_enabled: bool,
    pub last_dataset: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            recent_files: Vec::new(),
            download_enabled: true,
            last_dataset: None,
        }
    }
}

/// Per-user data directory: `$XDG_DATA_HOME/marble`, else `$HOME/.local/share/marble`
pub fn default_data_dir() -> PathBuf {
    if cfg!(windows)
        && let Ok(appdata) = std::env::var("APPDATA")
    {
        return Path::new(&appdata).join("Marble").join("data");
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME")
        && !xdg.is_empty()
    {
        return Path::new(&xdg).join("marble");
    }
    if let Ok(home) = std::env::var("HOME") {
        return Path::new(&home).join(".local").join("share").join("marble");
    }
    PathBuf::from("marble-data")
}

/// Main application state
pub struct AppState {
    pub preferences: Preferences,
    pub registry: Arc<ParserRegistry>,
    pub model: GeoDataTreeModel,
    bookmarks: Option<BookmarkManager>,
    storage: Box<dyn StorageBackend>,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    offline: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl AppState {
    /// Open storage and restore preferences unless `--ignore-persisted` was given
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        let storage = default_storage_backend(settings.storage_file.clone())?;
        let preferences = if settings.ignore_persisted {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            Preferences::default()
        } else {
            match load_json_backend::<Preferences>(storage.as_ref(), PREFERENCES_KEY) {
                Ok(Some(preferences)) => preferences,
                Ok(None) => {
                    tracing::debug!("No persisted preferences found, starting fresh");
                    Preferences::default()
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable preferences: {e}");
                    Preferences::default()
                }
            }
        };

        let data_dir = settings.data_dir.clone().unwrap_or_else(default_data_dir);
        let cache_dir = settings.cache_dir.clone().unwrap_or_else(|| data_dir.clone());
        tracing::debug!(
            data_dir = %data_dir.display(),
            cache_dir = %cache_dir.display(),
            "Directories"
        );

        Ok(Self {
            preferences,
            registry: Arc::new(ParserRegistry::default()),
            model: GeoDataTreeModel::new(),
            bookmarks: None,
            storage,
            data_dir,
            cache_dir,
            offline: settings.offline,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether tile downloads may run in this session
    pub fn downloads_enabled(&self) -> bool {
        self.preferences.download_enabled && !self.offline
    }

    /// Parse `paths` in parallel and add every document to the model, in input order
    ///
    /// Returns the model rows of the loaded documents; failures are reported per file.
    pub fn load_files(
        &mut self,
        paths: Vec<PathBuf>,
    ) -> (Vec<usize>, Vec<(PathBuf, GeoDataError)>) {
        let loader = FileLoader::new(Arc::clone(&self.registry));
        let mut rows = Vec::new();
        let mut errors = Vec::new();
        for loaded in loader.load_blocking(paths) {
            match loaded.result {
                Ok(mut document) => {
                    document.set_file_name(loaded.path.to_string_lossy());
                    if let Some(row) = self.model.add_document(document) {
                        rows.push(row);
                    }
                    self.remember_recent(&loaded.path);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", loaded.path.display(), e);
                    errors.push((loaded.path, e));
                }
            }
        }
        tracing::info!(loaded = rows.len(), failed = errors.len(), "Files loaded");
        (rows, errors)
    }

    /// Move `path` to the front of the recent files list
    pub fn remember_recent(&mut self, path: &Path) {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.preferences.recent_files.retain(|p| *p != path);
        self.preferences.recent_files.insert(0, path);
        self.preferences.recent_files.truncate(MAX_RECENT_FILES);
    }

    /// Read a tile dataset description and remember it as the last one used
    pub fn load_dataset(&mut self, path: &Path) -> Result<TileDataset, AppError> {
        let dataset = TileDataset::from_json_file(path)?;
        self.preferences.last_dataset = Some(path.to_path_buf());
        tracing::debug!(name = %dataset.name, "Dataset loaded");
        Ok(dataset)
    }

    /// Bookmark manager with the bookmark file mounted in the model, loaded on first use
    pub fn bookmarks(&mut self) -> Result<(&mut BookmarkManager, &mut GeoDataTreeModel), AppError> {
        let manager = match self.bookmarks.take() {
            Some(manager) => manager,
            None => {
                let mut manager = BookmarkManager::new(&self.data_dir);
                manager.load_file(&mut self.model, BOOKMARK_FILE)?;
                manager
            }
        };
        let manager = self.bookmarks.insert(manager);
        manager.ensure_default_folder(&mut self.model)?;
        Ok((manager, &mut self.model))
    }

    /// Tile loader caching below the cache directory, downloading on `runtime`
    pub fn tile_loader(&self, runtime: Handle) -> Result<TileLoader, AppError> {
        let fetcher = HttpFetcher::new(USER_AGENT).map_err(GeoDataError::from)?;
        let mut downloads = HttpDownloadManager::new(
            Some(Box::new(FileStoragePolicy::new(&self.cache_dir))),
            Arc::new(fetcher),
            runtime,
        );
        downloads.set_download_enabled(self.downloads_enabled());
        Ok(TileLoader::new(&self.cache_dir, downloads))
    }

    /// Persist the preferences
    pub fn save(&self) -> Result<(), StorageError> {
        save_json_backend(self.storage.as_ref(), PREFERENCES_KEY, &self.preferences)?;
        tracing::debug!("Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use clap::Parser;

    pub(crate) fn settings_in(dir: &Path, extra: &[&str]) -> Settings {
        let data = dir.join("data");
        let storage = dir.join("storage.json");
        let mut args = vec![
            "marble".to_string(),
            "--data-dir".to_string(),
            data.to_string_lossy().into_owned(),
            "--storage-file".to_string(),
            storage.to_string_lossy().into_owned(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args.push("recent".to_string());
        Settings::parse_from(args)
    }

    const GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>Ride</name><trkseg>
    <trkpt lat="52.0" lon="13.0"/>
    <trkpt lat="52.1" lon="13.1"/>
  </trkseg></trk>
</gpx>"#;

    #[test]
    fn test_load_files_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ride.gpx");
        std::fs::write(&good, GPX).unwrap();
        let missing = dir.path().join("missing.kml");

        let mut state = AppState::new(&settings_in(dir.path(), &[])).unwrap();
        let (rows, errors) = state.load_files(vec![good.clone(), missing.clone()]);
        assert_eq!(rows, vec![0]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, missing);
        assert_eq!(state.preferences.recent_files.len(), 1);
    }

    #[test]
    fn test_recent_files_are_unique_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(&settings_in(dir.path(), &[])).unwrap();
        for i in 0..(MAX_RECENT_FILES + 3) {
            state.remember_recent(Path::new(&format!("/nowhere/{i}.kml")));
        }
        state.remember_recent(Path::new("/nowhere/5.kml"));
        let recent = &state.preferences.recent_files;
        assert_eq!(recent.len(), MAX_RECENT_FILES);
        assert_eq!(recent[0], PathBuf::from("/nowhere/5.kml"));
        assert_eq!(recent.iter().filter(|p| p.ends_with("5.kml")).count(), 1);
    }

    #[test]
    fn test_preferences_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut state = AppState::new(&settings_in(dir.path(), &[])).unwrap();
            state.preferences.download_enabled = false;
            state.remember_recent(Path::new("/nowhere/a.kml"));
            state.save().unwrap();
        }
        let state = AppState::new(&settings_in(dir.path(), &[])).unwrap();
        assert!(!state.preferences.download_enabled);
        assert!(!state.downloads_enabled());
        assert_eq!(state.preferences.recent_files.len(), 1);

        let fresh = AppState::new(&settings_in(dir.path(), &["--ignore-persisted"])).unwrap();
        assert_eq!(fresh.preferences, Preferences::default());
    }

    #[test]
    fn test_offline_disables_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(&settings_in(dir.path(), &["--offline"])).unwrap();
        assert!(state.preferences.download_enabled);
        assert!(!state.downloads_enabled());
    }

    #[test]
    fn test_bookmarks_create_default_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(&settings_in(dir.path(), &[])).unwrap();
        let (manager, model) = state.bookmarks().unwrap();
        assert_eq!(manager.folders(model).len(), 1);
        let document = manager.document_uid();
        assert!(state.data_dir().join(BOOKMARK_FILE).exists());

        let (manager, model) = state.bookmarks().unwrap();
        assert_eq!(manager.document_uid(), document);
        assert_eq!(model.row_count(&marble_geodata::ModelIndex::root()), 1);
    }
}
