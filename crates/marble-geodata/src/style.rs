//! Shared rendering styles and normal/highlight style maps

use crate::VisualCategory;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, RwLock};

/// RGBA color, written in KML as `aabbggrr`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `aabbggrr` (an optional leading `#` is accepted)
    pub fn from_kml_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 8 {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        let [a, b, g, r] = value.to_be_bytes();
        Some(Self { r, g, b, a })
    }

    pub fn to_kml_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.a, self.b, self.g, self.r)
    }

    pub(crate) fn to_u32(self) -> u32 {
        u32::from_be_bytes([self.a, self.b, self.g, self.r])
    }

    pub(crate) fn from_u32(value: u32) -> Self {
        let [a, b, g, r] = value.to_be_bytes();
        Self { r, g, b, a }
    }
}

/// Unit of one hot spot ordinate, as KML `xunits`/`yunits`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HotSpotUnits {
    #[default]
    Fraction,
    Pixels,
    InsetPixels,
}

impl HotSpotUnits {
    pub fn as_kml(&self) -> &'static str {
        match self {
            HotSpotUnits::Fraction => "fraction",
            HotSpotUnits::Pixels => "pixels",
            HotSpotUnits::InsetPixels => "insetPixels",
        }
    }

    pub fn from_kml(text: &str) -> Option<Self> {
        match text.trim() {
            "fraction" => Some(HotSpotUnits::Fraction),
            "pixels" => Some(HotSpotUnits::Pixels),
            "insetPixels" => Some(HotSpotUnits::InsetPixels),
            _ => None,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        [
            HotSpotUnits::Fraction,
            HotSpotUnits::Pixels,
            HotSpotUnits::InsetPixels,
        ]
        .get(usize::from(value))
        .copied()
    }
}

/// Point of the icon anchored at the placemark position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotSpot {
    pub x: f32,
    pub y: f32,
    pub x_units: HotSpotUnits,
    pub y_units: HotSpotUnits,
}

impl Default for HotSpot {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            x_units: HotSpotUnits::Fraction,
            y_units: HotSpotUnits::Fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub icon_path: String,
    pub scale: f32,
    pub color: Color,
    pub hot_spot: HotSpot,
    pub heading: f32,
}

impl Default for IconStyle {
    fn default() -> Self {
        Self {
            icon_path: String::new(),
            scale: 1.0,
            color: Color::WHITE,
            hot_spot: HotSpot::default(),
            heading: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub color: Color,
    pub scale: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolyStyle {
    pub color: Color,
    pub fill: bool,
    pub outline: bool,
}

impl Default for PolyStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            fill: true,
            outline: true,
        }
    }
}

/// How a container's children are presented in a checkable list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListItemType {
    #[default]
    Check,
    RadioFolder,
    CheckOffOnly,
    CheckHideChildren,
}

impl ListItemType {
    pub fn as_kml(&self) -> &'static str {
        match self {
            ListItemType::Check => "check",
            ListItemType::RadioFolder => "radioFolder",
            ListItemType::CheckOffOnly => "checkOffOnly",
            ListItemType::CheckHideChildren => "checkHideChildren",
        }
    }

    pub fn from_kml(text: &str) -> Self {
        match text.trim() {
            "radioFolder" => ListItemType::RadioFolder,
            "checkOffOnly" => ListItemType::CheckOffOnly,
            "checkHideChildren" => ListItemType::CheckHideChildren,
            _ => ListItemType::Check,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            ListItemType::Check => 0,
            ListItemType::RadioFolder => 1,
            ListItemType::CheckOffOnly => 2,
            ListItemType::CheckHideChildren => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => ListItemType::Check,
            1 => ListItemType::RadioFolder,
            2 => ListItemType::CheckOffOnly,
            3 => ListItemType::CheckHideChildren,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListStyle {
    pub item_type: ListItemType,
    pub background_color: Color,
}

impl Default for ListStyle {
    fn default() -> Self {
        Self {
            item_type: ListItemType::Check,
            background_color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalloonStyle {
    pub text: String,
    pub background_color: Color,
    pub text_color: Color,
}

impl Default for BalloonStyle {
    fn default() -> Self {
        Self {
            text: String::new(),
            background_color: Color::WHITE,
            text_color: Color::BLACK,
        }
    }
}

/// Named bundle of rendering attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub id: String,
    pub icon_style: IconStyle,
    pub label_style: LabelStyle,
    pub line_style: LineStyle,
    pub poly_style: PolyStyle,
    pub list_style: ListStyle,
    pub balloon_style: BalloonStyle,
}

impl Style {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn icon_style(&self) -> &IconStyle {
        &self.icon_style
    }

    pub fn list_style(&self) -> &ListStyle {
        &self.list_style
    }
}

/// Maps a logical key (`normal`, `highlight`) to a style url
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleMap {
    pub id: String,
    pub pairs: BTreeMap<String, String>,
}

impl StyleMap {
    pub const NORMAL: &'static str = "normal";
    pub const HIGHLIGHT: &'static str = "highlight";

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pairs: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, style_url: impl Into<String>) {
        self.pairs.insert(key.into(), style_url.into());
    }

    pub fn normal(&self) -> Option<&str> {
        self.pairs.get(Self::NORMAL).map(String::as_str)
    }

    pub fn highlight(&self) -> Option<&str> {
        self.pairs.get(Self::HIGHLIGHT).map(String::as_str)
    }
}

static DEFAULT_STYLES: LazyLock<RwLock<HashMap<VisualCategory, Arc<Style>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Default style for a visual category, built once and shared
pub fn default_style(category: VisualCategory) -> Arc<Style> {
    if let Ok(cache) = DEFAULT_STYLES.read()
        && let Some(style) = cache.get(&category)
    {
        return style.clone();
    }

    let style = Arc::new(build_default_style(category));
    match DEFAULT_STYLES.write() {
        Ok(mut cache) => cache.entry(category).or_insert(style).clone(),
        Err(poisoned) => {
            tracing::warn!("Default style cache poisoned; recovering");
            poisoned.into_inner().entry(category).or_insert(style).clone()
        }
    }
}

fn build_default_style(category: VisualCategory) -> Style {
    let mut style = Style::default();
    style.icon_style.icon_path = category.default_icon_path().to_string();
    let (fill, outline, width) = category.default_colors();
    style.poly_style.color = fill;
    style.line_style.color = outline;
    style.line_style.width = width;
    style.label_style.color = category.default_label_color();
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kml_color_byte_order() {
        let c = Color::from_kml_hex("7f00ff00").unwrap();
        assert_eq!(c, Color::rgba(0, 255, 0, 0x7f));
        assert_eq!(c.to_kml_hex(), "7f00ff00");
        let blue = Color::from_kml_hex("#ffff0000").unwrap();
        assert_eq!(blue, Color::rgba(0, 0, 255, 255));
        assert_eq!(Color::from_u32(blue.to_u32()), blue);
    }

    #[test]
    fn test_invalid_colors() {
        assert!(Color::from_kml_hex("fff").is_none());
        assert!(Color::from_kml_hex("zzzzzzzz").is_none());
    }

    #[test]
    fn test_style_map_keys() {
        let mut map = StyleMap::with_id("m");
        map.insert("normal", "#n");
        map.insert("highlight", "#h");
        assert_eq!(map.normal(), Some("#n"));
        assert_eq!(map.highlight(), Some("#h"));
    }

    #[test]
    fn test_default_style_is_shared() {
        let a = default_style(VisualCategory::Bookmark);
        let b = default_style(VisualCategory::Bookmark);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.icon_style.icon_path, "bitmaps/bookmark.png");
    }

    #[test]
    fn test_list_item_type_names() {
        for t in [
            ListItemType::Check,
            ListItemType::RadioFolder,
            ListItemType::CheckOffOnly,
            ListItemType::CheckHideChildren,
        ] {
            assert_eq!(ListItemType::from_kml(t.as_kml()), t);
            assert_eq!(ListItemType::from_u8(t.to_u8()), Some(t));
        }
    }
}
