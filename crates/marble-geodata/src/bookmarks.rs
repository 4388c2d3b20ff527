//! Bookmark persistence on top of the tree model
//!
//! Bookmarks are placemarks inside the folders of a single [`DocumentRole::Bookmark`] document.
//! The document is owned by the [`GeoDataTreeModel`]; the manager only remembers its uid and
//! writes it back to KML after every change.

use crate::tree_model::{GeoDataTreeModel, ModelIndex};
use crate::{
    Document, DocumentRole, Feature, Folder, GeoFeature, ObjectUid, Placemark, Result,
    VisualCategory, kml,
};
use std::path::{Path, PathBuf};

/// Location of the bookmark file below the data directory
pub const BOOKMARK_FILE: &str = "bookmarks/bookmarks.kml";
pub const DEFAULT_FOLDER_NAME: &str = "Default";

pub struct BookmarkManager {
    data_dir: PathBuf,
    file_path: Option<PathBuf>,
    document: Option<ObjectUid>,
    show_bookmarks: bool,
}

fn new_bookmark_document() -> Document {
    let mut document = Document::new();
    document.set_role(DocumentRole::Bookmark);
    document.append(Folder::named(DEFAULT_FOLDER_NAME));
    document
}

impl BookmarkManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_path: None,
            document: None,
            show_bookmarks: true,
        }
    }

    /// Absolute path of the bookmark file, once loaded
    pub fn bookmark_file(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn show_bookmarks(&self) -> bool {
        self.show_bookmarks
    }

    pub fn document_uid(&self) -> Option<ObjectUid> {
        self.document
    }

    pub fn document<'m>(&self, model: &'m GeoDataTreeModel) -> Option<&'m Document> {
        let index = model.index_of(self.document?)?;
        model.feature(&index)?.as_document()
    }

    fn document_index(&self, model: &GeoDataTreeModel) -> Option<ModelIndex> {
        model.index_of(self.document?)
    }

    /// Load `relative_path` below the data directory and mount it in `model`
    ///
    /// A missing or unreadable file is replaced by a fresh document holding a single
    /// "Default" folder, which is written back immediately.
    pub fn load_file(&mut self, model: &mut GeoDataTreeModel, relative_path: &str) -> Result<()> {
        let path = self.data_dir.join(relative_path);
        if let Some(uid) = self.document.take() {
            model.remove_document(uid);
        }

        let (mut document, recovered) = match kml::parse_kml_file(&path) {
            Ok(document) => (document, false),
            Err(e) => {
                tracing::warn!("Could not load bookmarks from {}: {}", path.display(), e);
                (new_bookmark_document(), true)
            }
        };
        document.set_role(DocumentRole::Bookmark);
        document.set_file_name(path.to_string_lossy());
        document.set_visible(self.show_bookmarks);

        self.document = Some(document.uid());
        self.file_path = Some(path);
        model.add_document(document);

        if recovered {
            self.update_bookmark_file(model)?;
        }
        tracing::debug!(folders = self.folders(model).len(), "Bookmarks loaded");
        Ok(())
    }

    /// Make sure at least one folder exists to hold bookmarks
    pub fn ensure_default_folder(&mut self, model: &mut GeoDataTreeModel) -> Result<()> {
        let empty = self.folders(model).is_empty();
        if empty && let Some(document) = self.document {
            self.add_new_bookmark_folder(model, document, DEFAULT_FOLDER_NAME)?;
        }
        Ok(())
    }

    /// Top level bookmark folders
    pub fn folders<'m>(&self, model: &'m GeoDataTreeModel) -> Vec<&'m Folder> {
        self.document(model)
            .map(|d| d.folders().collect())
            .unwrap_or_default()
    }

    /// Add a copy of `placemark` to the container with uid `container`
    ///
    /// An unnamed placemark is named after its coordinate. Returns the bookmark's uid.
    pub fn add_bookmark(
        &mut self,
        model: &mut GeoDataTreeModel,
        container: ObjectUid,
        placemark: &Placemark,
    ) -> Result<Option<ObjectUid>> {
        let Some(parent) = self.container_index(model, container) else {
            return Ok(None);
        };
        let mut bookmark = placemark.clone();
        bookmark.set_visual_category(VisualCategory::Bookmark);
        bookmark.set_zoom_level(1);
        if bookmark.name().is_empty() {
            let name = placemark.coordinate().to_decimal_string().replace('°', "");
            bookmark.set_name(name.trim());
        }
        let uid = bookmark.uid();
        model.add_feature(&parent, bookmark, None);
        self.update_bookmark_file(model)?;
        Ok(Some(uid))
    }

    /// Re-announce a changed bookmark and persist it
    pub fn update_bookmark(
        &mut self,
        model: &mut GeoDataTreeModel,
        bookmark: ObjectUid,
        change: impl FnOnce(&mut Placemark),
    ) -> Result<bool> {
        let updated = model.update_feature_with(bookmark, |feature| {
            if let Some(placemark) = feature.as_placemark_mut() {
                change(placemark);
            }
        });
        if updated {
            self.update_bookmark_file(model)?;
        }
        Ok(updated)
    }

    pub fn remove_bookmark(&mut self, model: &mut GeoDataTreeModel, bookmark: ObjectUid) -> Result<bool> {
        let removed = model.remove_feature_by_uid(bookmark).is_some();
        if removed {
            self.update_bookmark_file(model)?;
        }
        Ok(removed)
    }

    /// Create folder `name` in `container`; empty or already used names are rejected
    pub fn add_new_bookmark_folder(
        &mut self,
        model: &mut GeoDataTreeModel,
        container: ObjectUid,
        name: &str,
    ) -> Result<Option<ObjectUid>> {
        if name.is_empty() {
            return Ok(None);
        }
        let Some(parent) = self.container_index(model, container) else {
            return Ok(None);
        };
        let duplicate = model
            .feature(&parent)
            .and_then(Feature::as_container)
            .is_some_and(|c| c.folders().any(|f| f.name() == name));
        if duplicate {
            tracing::debug!("Bookmark folder {name:?} already exists");
            return Ok(None);
        }

        let folder = Folder::named(name);
        let uid = folder.uid();
        model.add_feature(&parent, folder, None);
        self.update_bookmark_file(model)?;
        Ok(Some(uid))
    }

    pub fn rename_bookmark_folder(
        &mut self,
        model: &mut GeoDataTreeModel,
        folder: ObjectUid,
        name: &str,
    ) -> Result<bool> {
        let name = name.to_string();
        let renamed = model.update_feature_with(folder, move |f| f.set_name(name));
        if renamed {
            self.update_bookmark_file(model)?;
        }
        Ok(renamed)
    }

    pub fn remove_bookmark_folder(&mut self, model: &mut GeoDataTreeModel, folder: ObjectUid) -> Result<bool> {
        self.remove_bookmark(model, folder)
    }

    /// Drop every bookmark and folder, leaving an empty "Default" folder
    pub fn remove_all_bookmarks(&mut self, model: &mut GeoDataTreeModel) -> Result<()> {
        let Some(uid) = self.document else {
            return Ok(());
        };
        let Some(mut document) = model.remove_document(uid) else {
            return Ok(());
        };
        document.clear();
        document.append(Folder::named(DEFAULT_FOLDER_NAME));
        model.add_document(document);
        self.update_bookmark_file(model)
    }

    pub fn set_show_bookmarks(&mut self, model: &mut GeoDataTreeModel, visible: bool) {
        self.show_bookmarks = visible;
        if let Some(uid) = self.document {
            model.update_feature_with(uid, |f| f.set_visible(visible));
        }
    }

    /// Write the bookmark document back to its file
    pub fn update_bookmark_file(&self, model: &GeoDataTreeModel) -> Result<()> {
        let (Some(path), Some(document)) = (&self.file_path, self.document(model)) else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        kml::write_kml_file(document, path)?;
        tracing::debug!("Bookmarks written to {}", path.display());
        Ok(())
    }

    /// Index of a container inside the bookmark document, the document included
    fn container_index(&self, model: &GeoDataTreeModel, uid: ObjectUid) -> Option<ModelIndex> {
        let document = self.document_index(model)?;
        let index = model.index_of(uid)?;
        let inside = index.path().starts_with(document.path());
        let is_container = model.feature(&index).is_some_and(Feature::is_container);
        (inside && is_container).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinates, Geometry, Point};

    fn loaded() -> (tempfile::TempDir, BookmarkManager, GeoDataTreeModel) {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = BookmarkManager::new(dir.path());
        let mut model = GeoDataTreeModel::new();
        manager.load_file(&mut model, BOOKMARK_FILE).unwrap();
        (dir, manager, model)
    }

    fn default_folder(manager: &BookmarkManager, model: &GeoDataTreeModel) -> ObjectUid {
        manager.folders(model)[0].uid()
    }

    #[test]
    fn test_missing_file_recovers_default_folder() {
        let (dir, manager, model) = loaded();
        let folders = manager.folders(&model);
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name(), DEFAULT_FOLDER_NAME);
        assert!(dir.path().join(BOOKMARK_FILE).exists());
        assert_eq!(manager.document(&model).unwrap().role(), DocumentRole::Bookmark);
    }

    #[test]
    fn test_corrupt_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BOOKMARK_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<kml><Document><Folder>").unwrap();

        let mut manager = BookmarkManager::new(dir.path());
        let mut model = GeoDataTreeModel::new();
        manager.load_file(&mut model, BOOKMARK_FILE).unwrap();
        assert_eq!(manager.folders(&model).len(), 1);
        assert!(kml::parse_kml_file(&path).is_ok());
    }

    #[test]
    fn test_add_bookmark_names_by_coordinate() {
        let (_dir, mut manager, mut model) = loaded();
        let folder = default_folder(&manager, &model);
        let mut placemark = Placemark::new();
        placemark.set_geometry(Geometry::Point(Point::new(Coordinates::new(13.4, 52.52, 0.0))));
        placemark.set_zoom_level(12);

        let uid = manager.add_bookmark(&mut model, folder, &placemark).unwrap().unwrap();
        let bookmark = model.feature(&model.index_of(uid).unwrap()).unwrap();
        assert_eq!(bookmark.name(), "13.400E,  52.520N");
        assert_eq!(bookmark.zoom_level(), 1);
        assert_eq!(bookmark.visual_category(), VisualCategory::Bookmark);
    }

    #[test]
    fn test_folder_management() {
        let (_dir, mut manager, mut model) = loaded();
        let doc = manager.document_uid().unwrap();
        assert!(manager.add_new_bookmark_folder(&mut model, doc, "").unwrap().is_none());
        assert!(
            manager
                .add_new_bookmark_folder(&mut model, doc, DEFAULT_FOLDER_NAME)
                .unwrap()
                .is_none()
        );
        let trips = manager.add_new_bookmark_folder(&mut model, doc, "Trips").unwrap().unwrap();
        assert!(manager.rename_bookmark_folder(&mut model, trips, "Holidays").unwrap());
        let names: Vec<_> = manager.folders(&model).iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["Default", "Holidays"]);

        assert!(manager.remove_bookmark_folder(&mut model, trips).unwrap());
        assert_eq!(manager.folders(&model).len(), 1);
    }

    #[test]
    fn test_bookmarks_persist_across_loads() {
        let (dir, mut manager, mut model) = loaded();
        let folder = default_folder(&manager, &model);
        let mut placemark = Placemark::new();
        placemark.set_name("home");
        let uid = manager.add_bookmark(&mut model, folder, &placemark).unwrap().unwrap();
        assert!(
            manager
                .update_bookmark(&mut model, uid, |p| p.set_description("sweet"))
                .unwrap()
        );

        let mut reloaded = BookmarkManager::new(dir.path());
        let mut other = GeoDataTreeModel::new();
        reloaded.load_file(&mut other, BOOKMARK_FILE).unwrap();
        let folder = reloaded.folders(&other)[0];
        let bookmark = folder.placemarks().next().unwrap();
        assert_eq!(bookmark.name(), "home");
        assert_eq!(bookmark.description(), "sweet");

        assert!(manager.remove_bookmark(&mut model, uid).unwrap());
        assert_eq!(manager.folders(&model)[0].size(), 0);
    }

    #[test]
    fn test_remove_all_and_visibility() {
        let (_dir, mut manager, mut model) = loaded();
        let doc = manager.document_uid().unwrap();
        manager.add_new_bookmark_folder(&mut model, doc, "Extra").unwrap();
        manager.remove_all_bookmarks(&mut model).unwrap();
        assert_eq!(manager.folders(&model).len(), 1);

        manager.set_show_bookmarks(&mut model, false);
        assert!(!manager.document(&model).unwrap().is_visible());
        assert!(!manager.show_bookmarks());
    }

    #[test]
    fn test_ensure_default_folder() {
        let (_dir, mut manager, mut model) = loaded();
        let folder = default_folder(&manager, &model);
        manager.remove_bookmark_folder(&mut model, folder).unwrap();
        assert!(manager.folders(&model).is_empty());
        manager.ensure_default_folder(&mut model).unwrap();
        assert_eq!(manager.folders(&model)[0].name(), DEFAULT_FOLDER_NAME);
    }
}
