//! Hierarchical item model over a root document
//!
//! # Architecture
//!
//! - **[`ModelIndex`]**: a row path from the root document; the empty path is the root itself
//! - **Rows**: containers expose their children, a placemark exposes its multi-geometry, a
//!   multi-geometry its parts, a tour its playlist and a playlist its primitives
//! - **[`TreeModelObserver`]**: every structural change is bracketed by synchronous
//!   `about_to_*`/`*ed` notifications, and features entering or leaving the tree are reported
//!   through `added`/`removed`
//!
//! The model owns the tree and is meant to be used from a single thread.

use crate::{
    Color, Container, Coordinates, Document, DocumentRole, Feature, GeoFeature, GeoNode, Geometry,
    ListItemType, NodeRef, ObjectUid, Playlist, Style, TourPrimitive,
};
use bitflags::bitflags;
use smallvec::SmallVec;
use std::sync::Arc;

/// Address of a row: the row numbers from the root down to the item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    path: SmallVec<[usize; 8]>,
}

impl ModelIndex {
    /// The root document (Qt's invalid index)
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_path(path: &[usize]) -> Self {
        Self {
            path: SmallVec::from_slice(path),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Row within the parent; `None` for the root
    pub fn row(&self) -> Option<usize> {
        self.path.last().copied()
    }

    pub fn child(&self, row: usize) -> Self {
        let mut path = self.path.clone();
        path.push(row);
        Self { path }
    }

    /// Parent index; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut path = self.path.clone();
        path.pop();
        Self { path }
    }
}

/// Receives model change notifications
#[allow(unused_variables)]
pub trait TreeModelObserver {
    fn rows_about_to_be_inserted(&mut self, parent: &ModelIndex, first: usize, last: usize) {}
    fn rows_inserted(&mut self, parent: &ModelIndex, first: usize, last: usize) {}
    fn rows_about_to_be_removed(&mut self, parent: &ModelIndex, first: usize, last: usize) {}
    fn rows_removed(&mut self, parent: &ModelIndex, first: usize, last: usize) {}
    fn rows_moved(&mut self, parent: &ModelIndex, from: usize, to: usize) {}
    fn model_about_to_be_reset(&mut self) {}
    fn model_reset(&mut self) {}
    fn data_changed(&mut self, index: &ModelIndex) {}
    /// A feature (and its subtree) entered the tree
    fn added(&mut self, feature: &Feature) {}
    /// A feature (and its subtree) left the tree
    fn removed(&mut self, feature: &Feature) {}
}

/// Data roles served by [`GeoDataTreeModel::data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Display,
    NodeType,
    ToolTip,
    Popularity,
    PopularityIndex,
    Coordinate,
    IconPath,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    Text(String),
    Int(i64),
    Coordinates(Coordinates),
    Color(Color),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    PartiallyChecked,
    Checked,
}

bitflags! {
    /// What a view may do with an item
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u8 {
        const ENABLED    = 0b0001;
        const SELECTABLE = 0b0010;
        const CHECKABLE  = 0b0100;
        const EDITABLE   = 0b1000;
    }
}

/// Tree model over a root [`Document`]
pub struct GeoDataTreeModel {
    root: Document,
    observers: Vec<Box<dyn TreeModelObserver>>,
}

impl Default for GeoDataTreeModel {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(observers: &mut [Box<dyn TreeModelObserver>], mut f: impl FnMut(&mut dyn TreeModelObserver)) {
    for observer in observers.iter_mut() {
        f(observer.as_mut());
    }
}

fn feature_at<'a>(root: &'a Container, path: &[usize]) -> Option<&'a Feature> {
    let (&first, rest) = path.split_first()?;
    let mut feature = root.child(first)?;
    for &row in rest {
        feature = feature.as_container()?.child(row)?;
    }
    Some(feature)
}

fn feature_at_mut<'a>(root: &'a mut Container, path: &[usize]) -> Option<&'a mut Feature> {
    let (&first, rest) = path.split_first()?;
    let mut feature = root.child_mut(first)?;
    for &row in rest {
        feature = feature.as_container_mut()?.child_mut(row)?;
    }
    Some(feature)
}

fn container_at<'a>(root: &'a Container, path: &[usize]) -> Option<&'a Container> {
    if path.is_empty() {
        return Some(root);
    }
    feature_at(root, path)?.as_container()
}

fn container_at_mut<'a>(root: &'a mut Container, path: &[usize]) -> Option<&'a mut Container> {
    if path.is_empty() {
        return Some(root);
    }
    feature_at_mut(root, path)?.as_container_mut()
}

fn child_node(node: NodeRef<'_>, row: usize) -> Option<NodeRef<'_>> {
    match node {
        NodeRef::Feature(feature) => match feature {
            Feature::Document(_) | Feature::Folder(_) => {
                feature.as_container()?.child(row).map(NodeRef::Feature)
            }
            Feature::Placemark(placemark) => match placemark.geometry() {
                multi @ Geometry::MultiGeometry(_) if row == 0 => Some(NodeRef::Geometry(multi)),
                _ => None,
            },
            Feature::Tour(tour) if row == 0 => tour.playlist().map(NodeRef::Playlist),
            Feature::Tour(_) => None,
        },
        NodeRef::Geometry(Geometry::MultiGeometry(multi)) => multi.child(row).map(NodeRef::Geometry),
        NodeRef::Playlist(playlist) => playlist.primitive(row).map(NodeRef::Primitive),
        _ => None,
    }
}

fn node_row_count(node: NodeRef<'_>) -> usize {
    match node {
        NodeRef::Feature(Feature::Document(d)) => d.size(),
        NodeRef::Feature(Feature::Folder(f)) => f.size(),
        NodeRef::Feature(Feature::Placemark(p)) => {
            usize::from(matches!(p.geometry(), Geometry::MultiGeometry(_)))
        }
        NodeRef::Feature(Feature::Tour(t)) => usize::from(t.playlist().is_some()),
        NodeRef::Geometry(Geometry::MultiGeometry(m)) => m.len(),
        NodeRef::Playlist(p) => p.size(),
        _ => 0,
    }
}

fn find_path(container: &Container, uid: ObjectUid, path: &mut SmallVec<[usize; 8]>) -> bool {
    for (row, child) in container.iter().enumerate() {
        path.push(row);
        if child.uid() == uid {
            return true;
        }
        if let Some(inner) = child.as_container()
            && find_path(inner, uid, path)
        {
            return true;
        }
        path.pop();
    }
    false
}

fn list_item_type(feature: &Feature) -> ListItemType {
    feature.style().list_style.item_type
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GeoDataTreeModel {
    pub fn new() -> Self {
        Self {
            root: Document::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn TreeModelObserver>) {
        self.observers.push(observer);
    }

    pub fn root_document(&self) -> &Document {
        &self.root
    }

    /// Replace the root document; returns the previous one
    pub fn set_root_document(&mut self, document: Document) -> Document {
        emit(&mut self.observers, |o| o.model_about_to_be_reset());
        let previous = std::mem::replace(&mut self.root, document);
        emit(&mut self.observers, |o| o.model_reset());
        previous
    }

    /// Item at `index`; the root document itself has no node
    pub fn object(&self, index: &ModelIndex) -> Option<NodeRef<'_>> {
        let (&first, rest) = index.path().split_first()?;
        let mut node = NodeRef::Feature(self.root.child(first)?);
        for &row in rest {
            node = child_node(node, row)?;
        }
        Some(node)
    }

    pub fn feature(&self, index: &ModelIndex) -> Option<&Feature> {
        feature_at(&self.root, index.path())
    }

    pub fn row_count(&self, index: &ModelIndex) -> usize {
        if index.is_root() {
            return self.root.size();
        }
        self.object(index).map(node_row_count).unwrap_or(0)
    }

    pub fn has_children(&self, index: &ModelIndex) -> bool {
        self.row_count(index) > 0
    }

    /// Index of `row` below `parent`, if such a row exists
    pub fn index(&self, row: usize, parent: &ModelIndex) -> Option<ModelIndex> {
        (row < self.row_count(parent)).then(|| parent.child(row))
    }

    pub fn parent(&self, index: &ModelIndex) -> ModelIndex {
        index.parent()
    }

    /// Index of the feature with `uid`, searching containers depth-first
    pub fn index_of(&self, uid: ObjectUid) -> Option<ModelIndex> {
        let mut path = SmallVec::new();
        find_path(&self.root, uid, &mut path).then_some(ModelIndex { path })
    }

    /// Insert `feature` below the container at `parent`
    ///
    /// An absent or out-of-range `row` appends. Returns the row used, or `None` when `parent`
    /// is not a container in this model.
    pub fn add_feature(
        &mut self,
        parent: &ModelIndex,
        feature: impl Into<Feature>,
        row: Option<usize>,
    ) -> Option<usize> {
        let Some(size) = container_at(&self.root, parent.path()).map(Container::size) else {
            tracing::warn!(?parent, "add_feature: parent not found on the tree model");
            return None;
        };
        let row = row.filter(|&r| r <= size).unwrap_or(size);

        emit(&mut self.observers, |o| o.rows_about_to_be_inserted(parent, row, row));
        container_at_mut(&mut self.root, parent.path())?.insert(row, feature);
        emit(&mut self.observers, |o| o.rows_inserted(parent, row, row));
        if let Some(added) = container_at(&self.root, parent.path()).and_then(|c| c.child(row)) {
            emit(&mut self.observers, |o| o.added(added));
        }
        Some(row)
    }

    pub fn add_document(&mut self, document: Document) -> Option<usize> {
        self.add_feature(&ModelIndex::root(), document, None)
    }

    /// Remove the row below `parent`, handing the feature to the caller
    pub fn remove_feature(&mut self, parent: &ModelIndex, row: usize) -> Option<Feature> {
        let size = container_at(&self.root, parent.path())?.size();
        if row >= size {
            return None;
        }

        emit(&mut self.observers, |o| o.rows_about_to_be_removed(parent, row, row));
        let feature = container_at_mut(&mut self.root, parent.path())?.remove(row)?;
        emit(&mut self.observers, |o| o.removed(&feature));
        emit(&mut self.observers, |o| o.rows_removed(parent, row, row));
        Some(feature)
    }

    pub fn remove_feature_by_uid(&mut self, uid: ObjectUid) -> Option<Feature> {
        let index = self.index_of(uid)?;
        self.remove_feature(&index.parent(), index.row()?)
    }

    pub fn remove_document_at(&mut self, row: usize) -> Option<Document> {
        match self.remove_feature(&ModelIndex::root(), row)? {
            Feature::Document(document) => Some(document),
            other => {
                tracing::warn!("remove_document_at: row {row} is a {}", other.node_type());
                self.add_feature(&ModelIndex::root(), other, Some(row));
                None
            }
        }
    }

    pub fn remove_document(&mut self, uid: ObjectUid) -> Option<Document> {
        let row = self
            .root
            .iter()
            .position(|f| f.uid() == uid && matches!(f, Feature::Document(_)))?;
        self.remove_document_at(row)
    }

    /// Re-announce a feature after it changed: removed and re-added at the same row
    pub fn update_feature(&mut self, uid: ObjectUid) -> bool {
        self.update_feature_with(uid, |_| {})
    }

    /// Apply `change` to a feature between its removal and re-insertion
    pub fn update_feature_with(&mut self, uid: ObjectUid, change: impl FnOnce(&mut Feature)) -> bool {
        let Some(index) = self.index_of(uid) else {
            return false;
        };
        let (parent, Some(row)) = (index.parent(), index.row()) else {
            return false;
        };
        let Some(mut feature) = self.remove_feature(&parent, row) else {
            return false;
        };
        change(&mut feature);
        self.add_feature(&parent, feature, Some(row)).is_some()
    }

    fn playlist_mut(&mut self, index: &ModelIndex) -> Option<&mut Playlist> {
        if index.row()? != 0 {
            return None;
        }
        let parent = index.parent();
        let tour = feature_at_mut(&mut self.root, parent.path())?.as_tour_mut()?;
        tour.playlist.as_mut()
    }

    /// Insert a primitive into the playlist at `playlist`; an absent or out-of-range row appends
    pub fn add_tour_primitive(
        &mut self,
        playlist: &ModelIndex,
        primitive: TourPrimitive,
        row: Option<usize>,
    ) -> Option<usize> {
        let size = self.playlist_mut(playlist)?.size();
        let row = row.filter(|&r| r <= size).unwrap_or(size);
        emit(&mut self.observers, |o| o.rows_about_to_be_inserted(playlist, row, row));
        self.playlist_mut(playlist)?.insert_primitive(row, primitive);
        emit(&mut self.observers, |o| o.rows_inserted(playlist, row, row));
        Some(row)
    }

    pub fn remove_tour_primitive(&mut self, playlist: &ModelIndex, row: usize) -> Option<TourPrimitive> {
        if row >= self.playlist_mut(playlist)?.size() {
            return None;
        }
        emit(&mut self.observers, |o| o.rows_about_to_be_removed(playlist, row, row));
        let primitive = self.playlist_mut(playlist)?.remove_primitive_at(row);
        emit(&mut self.observers, |o| o.rows_removed(playlist, row, row));
        primitive
    }

    pub fn swap_tour_primitives(&mut self, playlist: &ModelIndex, a: usize, b: usize) -> bool {
        let (a, b) = if a > b { (b, a) } else { (a, b) };
        let Some(list) = self.playlist_mut(playlist) else {
            return false;
        };
        if !list.swap_primitives(a, b) {
            return false;
        }
        emit(&mut self.observers, |o| {
            o.rows_moved(playlist, a, b);
            if b - a > 1 {
                o.rows_moved(playlist, b, a);
            }
        });
        true
    }

    pub fn data(&self, index: &ModelIndex, role: Role) -> Option<ItemData> {
        let node = self.object(index)?;
        match (role, node) {
            (Role::Display, NodeRef::Feature(f)) => Some(ItemData::Text(f.name().to_string())),
            (Role::Display, NodeRef::Playlist(_)) => Some(ItemData::Text("Playlist".into())),
            (Role::NodeType, node) => Some(ItemData::Text(node.node_type().as_str().into())),
            (Role::ToolTip, NodeRef::Feature(f)) => Some(ItemData::Text(f.description().into())),
            (Role::Popularity, NodeRef::Feature(Feature::Placemark(p))) => {
                Some(ItemData::Int(p.popularity()))
            }
            (Role::PopularityIndex, NodeRef::Feature(Feature::Placemark(p))) => {
                Some(ItemData::Int(p.zoom_level().into()))
            }
            (Role::Coordinate, NodeRef::Feature(Feature::Placemark(p))) => {
                Some(ItemData::Coordinates(p.coordinate()))
            }
            (Role::Coordinate, NodeRef::Primitive(TourPrimitive::FlyTo { look_at, .. })) => {
                Some(ItemData::Coordinates(look_at.coordinates))
            }
            (Role::IconPath, NodeRef::Feature(Feature::Placemark(_))) => {
                let style = self.resolved_style(index)?;
                Some(ItemData::Text(style.icon_style.icon_path.clone()))
            }
            (Role::Background, NodeRef::Feature(Feature::Placemark(_))) => {
                let parent = index.parent();
                let style = if parent.is_root() {
                    self.root.own_style()
                } else {
                    self.feature(&parent)?.own_style()
                }?;
                Some(ItemData::Color(style.list_style.background_color))
            }
            _ => None,
        }
    }

    /// Rename a feature and re-announce it
    pub fn set_name(&mut self, index: &ModelIndex, name: &str) -> bool {
        let Some(uid) = self.feature(index).map(GeoFeature::uid) else {
            return false;
        };
        let name = name.to_string();
        self.update_feature_with(uid, move |f| f.set_name(name))
    }

    fn is_globally_visible(&self, path: &[usize]) -> bool {
        if !self.root.is_visible() {
            return false;
        }
        let mut container: &Container = &self.root;
        for (i, &row) in path.iter().enumerate() {
            let Some(feature) = container.child(row) else {
                return false;
            };
            if !feature.is_visible() {
                return false;
            }
            match feature.as_container() {
                Some(inner) => container = inner,
                None => return i + 1 == path.len(),
            }
        }
        true
    }

    fn visibility_state(&self, index: &ModelIndex, feature: &Feature) -> CheckState {
        if self.is_globally_visible(index.path()) {
            CheckState::Checked
        } else if feature.is_visible() {
            CheckState::PartiallyChecked
        } else {
            CheckState::Unchecked
        }
    }

    fn parent_folder(&self, index: &ModelIndex) -> Option<&Feature> {
        let parent = index.parent();
        self.feature(&parent)
            .filter(|f| matches!(f, Feature::Folder(_)))
    }

    /// Check state derived from visibility and the enclosing list styles
    pub fn check_state(&self, index: &ModelIndex) -> Option<CheckState> {
        let feature = self.feature(index)?;
        match feature {
            Feature::Placemark(placemark) => {
                if let Some(folder) = self.parent_folder(index)
                    && matches!(
                        list_item_type(folder),
                        ListItemType::RadioFolder | ListItemType::CheckOffOnly
                    )
                {
                    return Some(if placemark.is_visible() {
                        CheckState::Checked
                    } else {
                        CheckState::Unchecked
                    });
                }
                match placemark.geometry() {
                    Geometry::Point(_) => None,
                    _ => Some(self.visibility_state(index, feature)),
                }
            }
            Feature::Folder(folder) => match list_item_type(feature) {
                ListItemType::RadioFolder => {
                    if folder.iter().any(GeoFeature::is_visible) {
                        Some(CheckState::PartiallyChecked)
                    } else {
                        Some(CheckState::Unchecked)
                    }
                }
                ListItemType::CheckOffOnly => {
                    let visible = folder.iter().filter(|f| f.is_visible()).count();
                    Some(if visible == folder.size() {
                        CheckState::Checked
                    } else if visible > 0 {
                        CheckState::PartiallyChecked
                    } else {
                        CheckState::Unchecked
                    })
                }
                _ => Some(self.visibility_state(index, feature)),
            },
            Feature::Document(_) => Some(self.visibility_state(index, feature)),
            Feature::Tour(_) => None,
        }
    }

    /// Toggle visibility following the KML list style rules
    ///
    /// Checking a child of a radio folder hides its siblings; unchecking a radio or
    /// check-off-only folder hides all of its children.
    pub fn set_checked(&mut self, index: &ModelIndex, checked: bool) -> bool {
        let Some(feature) = self.feature(index) else {
            return false;
        };
        if matches!(feature, Feature::Tour(_)) {
            return false;
        }
        let uid = feature.uid();
        let own_list_type = list_item_type(feature);
        let parent = index.parent();
        let parent_is_radio = self
            .parent_folder(index)
            .is_some_and(|f| list_item_type(f) == ListItemType::RadioFolder);

        if checked && parent_is_radio {
            if let Some(siblings) = container_at_mut(&mut self.root, parent.path()) {
                for sibling in siblings.children_mut() {
                    sibling.set_visible(false);
                }
            }
            emit(&mut self.observers, |o| o.data_changed(&parent));
        }

        let Some(feature) = feature_at_mut(&mut self.root, index.path()) else {
            return false;
        };
        if !checked
            && matches!(
                own_list_type,
                ListItemType::RadioFolder | ListItemType::CheckOffOnly
            )
            && let Feature::Folder(folder) = feature
        {
            for child in folder.children_mut() {
                child.set_visible(false);
            }
        }
        feature.set_visible(checked);
        self.update_feature(uid)
    }

    /// Nearest document role at or above `index`, the root included
    fn document_role(&self, index: &ModelIndex) -> DocumentRole {
        let mut current = index.clone();
        while !current.is_root() {
            if let Some(Feature::Document(document)) = self.feature(&current) {
                return document.role();
            }
            current = current.parent();
        }
        self.root.role()
    }

    pub fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let base = ItemFlags::ENABLED | ItemFlags::SELECTABLE;
        let all = base | ItemFlags::CHECKABLE | ItemFlags::EDITABLE;
        let Some(node) = self.object(index) else {
            return ItemFlags::empty();
        };

        match node {
            NodeRef::Feature(Feature::Document(document)) => {
                if document.role() == DocumentRole::UserObject {
                    return all;
                }
                base | ItemFlags::CHECKABLE
            }
            NodeRef::Feature(feature @ (Feature::Placemark(_) | Feature::Folder(_))) => {
                if let Feature::Placemark(_) = feature
                    && let Some(folder) = self.parent_folder(index)
                {
                    match list_item_type(folder) {
                        ListItemType::RadioFolder => return all,
                        ListItemType::CheckHideChildren => return ItemFlags::empty(),
                        _ => {}
                    }
                }
                if let Feature::Folder(folder) = feature {
                    match list_item_type(feature) {
                        ListItemType::RadioFolder | ListItemType::CheckHideChildren => return all,
                        ListItemType::CheckOffOnly => {
                            return if folder.iter().all(GeoFeature::is_visible) {
                                all
                            } else {
                                base | ItemFlags::EDITABLE
                            };
                        }
                        ListItemType::Check => {}
                    }
                }
                if self.document_role(&index.parent()) == DocumentRole::UserObject {
                    return all;
                }
                base | ItemFlags::CHECKABLE
            }
            NodeRef::Feature(Feature::Tour(_)) => base | ItemFlags::EDITABLE,
            _ => base,
        }
    }

    /// Style of the feature at `index`, resolving its style url against the enclosing documents
    pub fn resolved_style(&self, index: &ModelIndex) -> Option<Arc<Style>> {
        let feature = self.feature(index)?;
        if let Some(style) = feature.own_style() {
            return Some(Arc::clone(style));
        }
        let url = feature.style_url();
        if !url.is_empty() {
            let mut current = index.parent();
            while !current.is_root() {
                if let Some(Feature::Document(document)) = self.feature(&current)
                    && let Some(style) = document.resolve_style_url(url)
                {
                    return Some(style);
                }
                current = current.parent();
            }
            if let Some(style) = self.root.resolve_style_url(url) {
                return Some(style);
            }
        }
        Some(feature.style())
    }
}
