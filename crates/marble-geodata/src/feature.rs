//! Features: documents, folders, placemarks and tours
//!
//! Feature metadata lives in a shared [`FeatureData`] payload. Cloning a feature is cheap: the
//! payload is shared until one of the copies is mutated, at which point that copy detaches
//! with a private clone (`Arc::make_mut`).

use crate::style::default_style;
use crate::{
    Coordinates, ExtendedData, GeoNode, Geometry, LatLonAltBox, NodeType, ObjectUid, Point,
    Style, StyleMap, TimeSpan, TimeStamp, Tour, VisualCategory,
};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Metadata shared by every feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureData {
    pub id: String,
    pub target_id: String,
    pub name: String,
    pub description: String,
    pub description_cdata: bool,
    pub address: String,
    pub phone_number: String,
    pub snippet: String,
    pub visible: bool,
    pub timestamp: Option<TimeStamp>,
    pub timespan: Option<TimeSpan>,
    pub style_url: String,
    pub style: Option<Arc<Style>>,
    pub extended_data: ExtendedData,
    pub zoom_level: i32,
    pub popularity: i64,
    pub visual_category: VisualCategory,
    pub role: String,
}

impl Default for FeatureData {
    fn default() -> Self {
        Self {
            id: String::new(),
            target_id: String::new(),
            name: String::new(),
            description: String::new(),
            description_cdata: false,
            address: String::new(),
            phone_number: String::new(),
            snippet: String::new(),
            visible: true,
            timestamp: None,
            timespan: None,
            style_url: String::new(),
            style: None,
            extended_data: ExtendedData::default(),
            zoom_level: 1,
            popularity: 0,
            visual_category: VisualCategory::None,
            role: String::new(),
        }
    }
}

/// Identity, parent link and shared payload of one feature instance
#[derive(Debug)]
pub struct FeatureCore {
    uid: ObjectUid,
    parent: Option<ObjectUid>,
    d: Arc<FeatureData>,
}

impl FeatureCore {
    pub fn new() -> Self {
        Self::with_data(FeatureData::default())
    }

    pub fn with_data(data: FeatureData) -> Self {
        Self {
            uid: ObjectUid::next(),
            parent: None,
            d: Arc::new(data),
        }
    }
}

impl Default for FeatureCore {
    fn default() -> Self {
        Self::new()
    }
}

/// A copy is a new, detached object sharing the payload
impl Clone for FeatureCore {
    fn clone(&self) -> Self {
        Self {
            uid: ObjectUid::next(),
            parent: None,
            d: Arc::clone(&self.d),
        }
    }
}

impl PartialEq for FeatureCore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.d, &other.d) || *self.d == *other.d
    }
}

/// Accessors and copy-on-write mutators common to every feature
pub trait GeoFeature {
    fn core(&self) -> &FeatureCore;
    fn core_mut(&mut self) -> &mut FeatureCore;

    fn uid(&self) -> ObjectUid {
        self.core().uid
    }

    /// Uid of the owning container while attached
    fn parent(&self) -> Option<ObjectUid> {
        self.core().parent
    }

    fn data(&self) -> &FeatureData {
        &self.core().d
    }

    /// Mutable payload; detaches from other copies first
    fn data_mut(&mut self) -> &mut FeatureData {
        Arc::make_mut(&mut self.core_mut().d)
    }

    fn shares_payload_with<F: GeoFeature>(&self, other: &F) -> bool
    where
        Self: Sized,
    {
        Arc::ptr_eq(&self.core().d, &other.core().d)
    }

    fn id(&self) -> &str {
        &self.data().id
    }

    fn set_id(&mut self, id: impl Into<String>)
    where
        Self: Sized,
    {
        self.data_mut().id = id.into();
    }

    fn target_id(&self) -> &str {
        &self.data().target_id
    }

    fn name(&self) -> &str {
        &self.data().name
    }

    fn set_name(&mut self, name: impl Into<String>)
    where
        Self: Sized,
    {
        self.data_mut().name = name.into();
    }

    fn description(&self) -> &str {
        &self.data().description
    }

    fn set_description(&mut self, description: impl Into<String>)
    where
        Self: Sized,
    {
        self.data_mut().description = description.into();
    }

    fn is_visible(&self) -> bool {
        self.data().visible
    }

    fn set_visible(&mut self, visible: bool) {
        if self.data().visible != visible {
            self.data_mut().visible = visible;
        }
    }

    fn style_url(&self) -> &str {
        &self.data().style_url
    }

    fn set_style_url(&mut self, url: impl Into<String>)
    where
        Self: Sized,
    {
        self.data_mut().style_url = url.into();
    }

    /// Own style if set, otherwise the default style of the visual category
    fn style(&self) -> Arc<Style> {
        match &self.data().style {
            Some(style) => Arc::clone(style),
            None => default_style(self.data().visual_category),
        }
    }

    fn own_style(&self) -> Option<&Arc<Style>> {
        self.data().style.as_ref()
    }

    fn set_style(&mut self, style: Option<Arc<Style>>) {
        self.data_mut().style = style;
    }

    fn extended_data(&self) -> &ExtendedData {
        &self.data().extended_data
    }

    fn extended_data_mut(&mut self) -> &mut ExtendedData {
        &mut self.data_mut().extended_data
    }

    fn zoom_level(&self) -> i32 {
        self.data().zoom_level
    }

    fn set_zoom_level(&mut self, level: i32) {
        self.data_mut().zoom_level = level;
    }

    fn popularity(&self) -> i64 {
        self.data().popularity
    }

    fn set_popularity(&mut self, popularity: i64) {
        self.data_mut().popularity = popularity;
    }

    fn visual_category(&self) -> VisualCategory {
        self.data().visual_category
    }

    fn set_visual_category(&mut self, category: VisualCategory) {
        self.data_mut().visual_category = category;
    }
}

/// Ordered, owning sequence of child features
#[derive(Debug, Default, PartialEq)]
pub struct Container {
    core: FeatureCore,
    children: Vec<Feature>,
}

/// Children of the copy are re-parented to the copy
impl Clone for Container {
    fn clone(&self) -> Self {
        let core = self.core.clone();
        let uid = core.uid;
        let children = self
            .children
            .iter()
            .map(|child| {
                let mut child = child.clone();
                child.set_parent(Some(uid));
                child
            })
            .collect();
        Self { core, children }
    }
}

impl GeoFeature for Container {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Feature] {
        &self.children
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.children.iter()
    }

    pub fn child(&self, row: usize) -> Option<&Feature> {
        self.children.get(row)
    }

    pub fn child_mut(&mut self, row: usize) -> Option<&mut Feature> {
        self.children.get_mut(row)
    }

    pub fn append(&mut self, feature: impl Into<Feature>) {
        let mut feature = feature.into();
        feature.set_parent(Some(self.core.uid));
        self.children.push(feature);
    }

    /// Insert at `row`, clamped to the end; returns the row actually used
    pub fn insert(&mut self, row: usize, feature: impl Into<Feature>) -> usize {
        let row = row.min(self.children.len());
        let mut feature = feature.into();
        feature.set_parent(Some(self.core.uid));
        self.children.insert(row, feature);
        row
    }

    /// Detach the child at `row`; dropping the result destroys its subtree
    pub fn remove(&mut self, row: usize) -> Option<Feature> {
        if row >= self.children.len() {
            return None;
        }
        let mut feature = self.children.remove(row);
        feature.set_parent(None);
        Some(feature)
    }

    /// Detach the child with `uid`, handing ownership to the caller
    pub fn take(&mut self, uid: ObjectUid) -> Option<Feature> {
        let row = self.child_position(uid)?;
        self.remove(row)
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn child_position(&self, uid: ObjectUid) -> Option<usize> {
        self.children.iter().position(|c| c.uid() == uid)
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.children.iter().filter_map(Feature::as_folder)
    }

    pub fn placemarks(&self) -> impl Iterator<Item = &Placemark> {
        self.children.iter().filter_map(Feature::as_placemark)
    }

    /// Union of the visible children's boxes, computed on every call
    pub fn lat_lon_alt_box(&self) -> LatLonAltBox {
        self.children
            .iter()
            .filter(|c| c.is_visible())
            .fold(LatLonAltBox::empty(), |acc, c| {
                acc.united(&c.lat_lon_alt_box())
            })
    }

    /// Depth-first search below this container
    pub fn find(&self, uid: ObjectUid) -> Option<&Feature> {
        for child in &self.children {
            if child.uid() == uid {
                return Some(child);
            }
            if let Some(found) = child.as_container().and_then(|c| c.find(uid)) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, uid: ObjectUid) -> Option<&mut Feature> {
        for child in &mut self.children {
            if child.uid() == uid {
                return Some(child);
            }
            if let Some(found) = child.as_container_mut().and_then(|c| c.find_mut(uid)) {
                return Some(found);
            }
        }
        None
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Feature] {
        &mut self.children
    }
}

/// What a document is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentRole {
    #[default]
    Unknown,
    MapTheme,
    UserObject,
    Tracking,
    Bookmark,
    Search,
}

impl DocumentRole {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            DocumentRole::Unknown => 0,
            DocumentRole::MapTheme => 1,
            DocumentRole::UserObject => 2,
            DocumentRole::Tracking => 3,
            DocumentRole::Bookmark => 4,
            DocumentRole::Search => 5,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => DocumentRole::Unknown,
            1 => DocumentRole::MapTheme,
            2 => DocumentRole::UserObject,
            3 => DocumentRole::Tracking,
            4 => DocumentRole::Bookmark,
            5 => DocumentRole::Search,
            _ => return None,
        })
    }
}

/// Top-level container owning the style and style-map tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    container: Container,
    styles: BTreeMap<String, Arc<Style>>,
    style_maps: BTreeMap<String, StyleMap>,
    role: DocumentRole,
    file_name: String,
}

impl Deref for Document {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

impl GeoFeature for Document {
    fn core(&self) -> &FeatureCore {
        &self.container.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.container.core
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self) -> DocumentRole {
        self.role
    }

    pub fn set_role(&mut self, role: DocumentRole) {
        self.role = role;
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    /// Add or replace a style, keyed by its id
    pub fn add_style(&mut self, style: Style) -> Arc<Style> {
        let style = Arc::new(style);
        self.styles.insert(style.id.clone(), Arc::clone(&style));
        style
    }

    pub fn remove_style(&mut self, id: &str) -> Option<Arc<Style>> {
        self.styles.remove(id)
    }

    pub fn style_by_id(&self, id: &str) -> Option<&Arc<Style>> {
        self.styles.get(id)
    }

    pub fn styles(&self) -> impl Iterator<Item = &Arc<Style>> {
        self.styles.values()
    }

    pub fn add_style_map(&mut self, map: StyleMap) {
        self.style_maps.insert(map.id.clone(), map);
    }

    pub fn style_map(&self, id: &str) -> Option<&StyleMap> {
        self.style_maps.get(id)
    }

    pub fn style_maps(&self) -> impl Iterator<Item = &StyleMap> {
        self.style_maps.values()
    }

    /// Look up a local `#id` style url in this document's tables
    pub fn resolve_style_url(&self, url: &str) -> Option<Arc<Style>> {
        lookup_style(url, &self.styles, &self.style_maps)
    }

    /// Bind the `style_url` of every descendant without an own style to the matching style
    pub fn resolve_style_urls(&mut self) {
        let Document {
            container,
            styles,
            style_maps,
            ..
        } = self;
        bind_styles(container, styles, style_maps);
    }

    pub fn into_container(self) -> Container {
        self.container
    }
}

fn lookup_style(
    url: &str,
    styles: &BTreeMap<String, Arc<Style>>,
    style_maps: &BTreeMap<String, StyleMap>,
) -> Option<Arc<Style>> {
    let id = url.strip_prefix('#')?;
    if let Some(style) = styles.get(id) {
        return Some(Arc::clone(style));
    }
    let normal = style_maps.get(id)?.normal()?;
    styles.get(normal.strip_prefix('#')?).cloned()
}

fn bind_styles(
    container: &mut Container,
    styles: &BTreeMap<String, Arc<Style>>,
    style_maps: &BTreeMap<String, StyleMap>,
) {
    for child in container.children_mut() {
        if let Feature::Document(inner) = child {
            inner.resolve_style_urls();
        }
        if child.own_style().is_none() && !child.style_url().is_empty() {
            if let Some(style) = lookup_style(child.style_url(), styles, style_maps) {
                child.set_style(Some(style));
            } else {
                tracing::debug!(url = child.style_url(), "Unresolved style url");
            }
        }
        if let Some(inner) = child.as_container_mut() {
            bind_styles(inner, styles, style_maps);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folder {
    container: Container,
}

impl Deref for Folder {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl DerefMut for Folder {
    fn deref_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

impl GeoFeature for Folder {
    fn core(&self) -> &FeatureCore {
        &self.container.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.container.core
    }
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut folder = Self::new();
        folder.set_name(name);
        folder
    }
}

/// Named geometry of interest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placemark {
    core: FeatureCore,
    geometry: Arc<Geometry>,
}

impl GeoFeature for Placemark {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }
}

impl Placemark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(name: impl Into<String>, geometry: Geometry) -> Self {
        let mut placemark = Self::new();
        placemark.set_name(name);
        placemark.geometry = Arc::new(geometry);
        placemark
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Mutable geometry; detaches from other copies first
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        Arc::make_mut(&mut self.geometry)
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = Arc::new(geometry);
    }

    pub fn coordinate(&self) -> Coordinates {
        self.geometry.coordinate().unwrap_or_default()
    }

    /// Replace the geometry by a point at `coordinates`
    pub fn set_coordinate(&mut self, coordinates: Coordinates) {
        self.geometry = Arc::new(Geometry::Point(Point::new(coordinates)));
    }

    pub fn lat_lon_alt_box(&self) -> LatLonAltBox {
        self.geometry.lat_lon_alt_box()
    }
}

/// Any feature that can live in a container
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Document(Document),
    Folder(Folder),
    Placemark(Placemark),
    Tour(Tour),
}

impl GeoFeature for Feature {
    fn core(&self) -> &FeatureCore {
        match self {
            Feature::Document(d) => d.core(),
            Feature::Folder(f) => f.core(),
            Feature::Placemark(p) => p.core(),
            Feature::Tour(t) => t.core(),
        }
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        match self {
            Feature::Document(d) => d.core_mut(),
            Feature::Folder(f) => f.core_mut(),
            Feature::Placemark(p) => p.core_mut(),
            Feature::Tour(t) => t.core_mut(),
        }
    }
}

impl GeoNode for Feature {
    fn node_type(&self) -> NodeType {
        match self {
            Feature::Document(_) => NodeType::Document,
            Feature::Folder(_) => NodeType::Folder,
            Feature::Placemark(_) => NodeType::Placemark,
            Feature::Tour(_) => NodeType::Tour,
        }
    }
}

impl Feature {
    pub(crate) fn set_parent(&mut self, parent: Option<ObjectUid>) {
        self.core_mut().parent = parent;
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Feature::Document(_) | Feature::Folder(_))
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Feature::Document(d) => Some(&d.container),
            Feature::Folder(f) => Some(&f.container),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Feature::Document(d) => Some(&mut d.container),
            Feature::Folder(f) => Some(&mut f.container),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Feature::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Feature::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Feature::Folder(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_placemark(&self) -> Option<&Placemark> {
        match self {
            Feature::Placemark(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_placemark_mut(&mut self) -> Option<&mut Placemark> {
        match self {
            Feature::Placemark(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_tour(&self) -> Option<&Tour> {
        match self {
            Feature::Tour(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tour_mut(&mut self) -> Option<&mut Tour> {
        match self {
            Feature::Tour(t) => Some(t),
            _ => None,
        }
    }

    pub fn lat_lon_alt_box(&self) -> LatLonAltBox {
        match self {
            Feature::Document(d) => d.lat_lon_alt_box(),
            Feature::Folder(f) => f.lat_lon_alt_box(),
            Feature::Placemark(p) => p.lat_lon_alt_box(),
            Feature::Tour(_) => LatLonAltBox::empty(),
        }
    }
}

impl From<Document> for Feature {
    fn from(document: Document) -> Self {
        Feature::Document(document)
    }
}

impl From<Folder> for Feature {
    fn from(folder: Folder) -> Self {
        Feature::Folder(folder)
    }
}

impl From<Placemark> for Feature {
    fn from(placemark: Placemark) -> Self {
        Feature::Placemark(placemark)
    }
}

impl From<Tour> for Feature {
    fn from(tour: Tour) -> Self {
        Feature::Tour(tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LineString, Style};

    fn placemark_at(name: &str, lon: f64, lat: f64) -> Placemark {
        let mut p = Placemark::new();
        p.set_name(name);
        p.set_coordinate(Coordinates::new(lon, lat, 0.0));
        p
    }

    #[test]
    fn test_copy_on_write_name() {
        let a = placemark_at("a", 0.0, 0.0);
        let mut b = a.clone();
        assert!(b.shares_payload_with(&a));

        b.set_name("x");
        assert_ne!(a.name(), "x");
        assert_eq!(b.name(), "x");
        assert!(!b.shares_payload_with(&a));
    }

    #[test]
    fn test_copy_on_write_geometry() {
        let a = placemark_at("a", 1.0, 2.0);
        let mut b = a.clone();
        b.set_coordinate(Coordinates::new(5.0, 6.0, 0.0));
        assert_eq!(a.coordinate(), Coordinates::new(1.0, 2.0, 0.0));
        assert_eq!(b.coordinate(), Coordinates::new(5.0, 6.0, 0.0));
    }

    #[test]
    fn test_copies_get_fresh_identity() {
        let a = placemark_at("a", 0.0, 0.0);
        let b = a.clone();
        assert_ne!(a.uid(), b.uid());
        assert_eq!(a, b);
    }

    #[test]
    fn test_append_sets_parent() {
        let mut folder = Folder::new();
        let placemark = placemark_at("p", 0.0, 0.0);
        let uid = placemark.uid();
        folder.append(placemark);

        let pos = folder.child_position(uid).unwrap();
        assert_eq!(folder.child(pos).unwrap().parent(), Some(folder.uid()));
    }

    #[test]
    fn test_remove_clears_parent_and_shrinks() {
        let mut folder = Folder::new();
        folder.append(placemark_at("a", 0.0, 0.0));
        folder.append(placemark_at("b", 0.0, 0.0));

        let removed = folder.remove(0).unwrap();
        assert_eq!(removed.parent(), None);
        assert_eq!(removed.name(), "a");
        assert_eq!(folder.size(), 1);
        assert!(folder.remove(5).is_none());
        assert_eq!(folder.size(), 1);

        let uid = folder.child(0).unwrap().uid();
        let taken = folder.take(uid).unwrap();
        assert_eq!(taken.name(), "b");
        assert!(folder.is_empty());
        assert!(folder.take(uid).is_none());
    }

    #[test]
    fn test_insert_clamps_row() {
        let mut folder = Folder::new();
        folder.append(placemark_at("a", 0.0, 0.0));
        assert_eq!(folder.insert(10, placemark_at("b", 0.0, 0.0)), 1);
        assert_eq!(folder.insert(0, placemark_at("c", 0.0, 0.0)), 0);
        let names: Vec<_> = folder.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cloned_container_reparents_children() {
        let mut folder = Folder::new();
        folder.append(placemark_at("a", 0.0, 0.0));
        let copy = folder.clone();
        assert_eq!(copy.child(0).unwrap().parent(), Some(copy.uid()));
        assert_eq!(folder.child(0).unwrap().parent(), Some(folder.uid()));
    }

    #[test]
    fn test_box_ignores_hidden_children() {
        let mut folder = Folder::new();
        folder.append(placemark_at("a", 1.0, 1.0));
        let mut hidden = placemark_at("b", 50.0, 50.0);
        hidden.set_visible(false);
        folder.append(hidden);

        let b = folder.lat_lon_alt_box();
        assert_eq!((b.north, b.east), (1.0, 1.0));

        folder.child_mut(1).unwrap().set_visible(true);
        assert_eq!(folder.lat_lon_alt_box().north, 50.0);
    }

    #[test]
    fn test_style_falls_back_to_category_default() {
        let mut p = placemark_at("p", 0.0, 0.0);
        p.set_visual_category(VisualCategory::Bookmark);
        assert_eq!(p.style().icon_style.icon_path, "bitmaps/bookmark.png");

        let mut own = Style::with_id("own");
        own.icon_style.icon_path = "own.png".into();
        p.set_style(Some(Arc::new(own)));
        assert_eq!(p.style().icon_style.icon_path, "own.png");
    }

    #[test]
    fn test_resolve_style_urls_via_style_and_map() {
        let mut doc = Document::new();
        let mut s1 = Style::with_id("s1");
        s1.icon_style.icon_path = "pin.png".into();
        doc.add_style(s1);
        let mut map = StyleMap::with_id("m1");
        map.insert("normal", "#s1");
        doc.add_style_map(map);

        let mut a = placemark_at("A", 0.0, 0.0);
        a.set_style_url("#s1");
        let mut b = placemark_at("B", 0.0, 0.0);
        b.set_style_url("#m1");
        let mut nested = Folder::new();
        let mut c = placemark_at("C", 0.0, 0.0);
        c.set_style_url("#missing");
        nested.append(c);
        doc.append(a);
        doc.append(b);
        doc.append(nested);

        doc.resolve_style_urls();
        assert_eq!(doc.child(0).unwrap().style().icon_style().icon_path, "pin.png");
        assert_eq!(doc.child(1).unwrap().style().icon_style().icon_path, "pin.png");
        let nested = doc.child(2).unwrap().as_container().unwrap();
        assert!(nested.child(0).unwrap().own_style().is_none());
    }

    #[test]
    fn test_find_nested() {
        let mut doc = Document::new();
        let mut folder = Folder::named("f");
        let p = Placemark::with_geometry(
            "line",
            Geometry::LineString(LineString::from_coordinates(vec![Coordinates::default()])),
        );
        let uid = p.uid();
        folder.append(p);
        doc.append(folder);
        assert_eq!(doc.find(uid).unwrap().name(), "line");
        doc.find_mut(uid).unwrap().set_name("renamed");
        assert_eq!(doc.find(uid).unwrap().name(), "renamed");
    }
}
