//! KML 2.2 reading and writing
//!
//! # Architecture
//!
//! - **Reading**: quick-xml events are folded into a small [`XmlNode`] tree, which is then
//!   converted into features. Unknown elements are skipped.
//! - **Writing**: the document tree is streamed back out through a quick-xml [`Writer`].
//!
//! Element names are matched on their local part, so `gx:Tour` and `Tour` are the same.

use crate::extended_data::{Data, Variant};
use crate::style::{HotSpot, HotSpotUnits};
use crate::tour::{FlyToMode, LookAt, PlayMode};
use crate::{
    AltitudeMode, Color, Coordinates, Document, Feature, FeatureData, Folder, GeoDataError,
    GeoFeature, Geometry, LineString, LinearRing, ListItemType, MultiGeometry, Placemark,
    Playlist, Point, Polygon, Result, Style, StyleMap, TimeSpan, TimeStamp, Tour, TourPrimitive,
    Track,
};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
pub const GX_NAMESPACE: &str = "http://www.google.com/kml/ext/2.2";

/// Deepest element nesting accepted when reading
pub const MAX_ELEMENT_DEPTH: usize = 256;

/// Parsed XML element
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    /// Local name, without namespace prefix
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    /// Set when any of the text came from a CDATA section
    pub cdata: bool,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Parse XML text into an element tree
pub fn parse_xml(text: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => return parse_node(&mut reader, start.into_owned(), false, 0),
            Event::Empty(start) => return parse_node(&mut reader, start.into_owned(), true, 0),
            Event::Eof => return Err(GeoDataError::Kml("XML document is empty".into())),
            _ => {}
        }
    }
}

fn parse_node<R: BufRead>(
    reader: &mut Reader<R>,
    start: BytesStart<'static>,
    self_closing: bool,
    depth: usize,
) -> Result<XmlNode> {
    if depth >= MAX_ELEMENT_DEPTH {
        return Err(GeoDataError::Kml(format!(
            "elements nested deeper than {MAX_ELEMENT_DEPTH} levels"
        )));
    }
    let mut node = XmlNode {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| GeoDataError::Kml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.insert(key, value);
    }
    if self_closing {
        return Ok(node);
    }

    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(child) => {
                let child = parse_node(reader, child.into_owned(), false, depth + 1)?;
                node.children.push(child);
            }
            Event::Empty(child) => {
                let child = parse_node(reader, child.into_owned(), true, depth + 1)?;
                node.children.push(child);
            }
            Event::Text(text) => node.text.push_str(&text.unescape()?),
            Event::CData(text) => {
                node.text.push_str(&String::from_utf8_lossy(text.as_ref()));
                node.cdata = true;
            }
            Event::End(end) => {
                if end.name().as_ref() != start.name().as_ref() {
                    return Err(GeoDataError::Kml(format!(
                        "unexpected closing tag '</{}>' while parsing '<{}>'",
                        String::from_utf8_lossy(end.name().as_ref()),
                        node.name
                    )));
                }
                return Ok(node);
            }
            Event::Eof => {
                return Err(GeoDataError::Kml(format!(
                    "unexpected end of file while parsing element '{}'",
                    node.name
                )));
            }
            _ => {}
        }
    }
}

/// Parse KML text into a document with style urls resolved
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_kml(text: &str) -> Result<Document> {
    let root = parse_xml(text)?;
    let feature_node = match root.name.as_str() {
        "kml" => root.children.iter().find(|c| is_feature_element(&c.name)),
        name if is_feature_element(name) => Some(&root),
        other => {
            return Err(GeoDataError::Kml(format!("'{other}' is not a KML root element")));
        }
    };

    let mut document = match feature_node.and_then(feature_from_node) {
        Some(Feature::Document(document)) => document,
        Some(other) => {
            let mut document = Document::new();
            document.append(other);
            document
        }
        None => Document::new(),
    };
    document.resolve_style_urls();
    Ok(document)
}

/// Read and parse a KML file; the document remembers its file name
pub fn parse_kml_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let mut document = parse_kml(&text)?;
    document.set_file_name(path.to_string_lossy());
    Ok(document)
}

fn is_feature_element(name: &str) -> bool {
    matches!(name, "Document" | "Folder" | "Placemark" | "Tour")
}

fn feature_from_node(node: &XmlNode) -> Option<Feature> {
    let feature = match node.name.as_str() {
        "Document" => {
            let mut document = Document::new();
            *document.data_mut() = feature_data(node, false);
            for child in &node.children {
                match child.name.as_str() {
                    "Style" => {
                        document.add_style(style_from_node(child));
                    }
                    "StyleMap" => {
                        document.add_style_map(style_map_from_node(child));
                    }
                    _ => {
                        if let Some(feature) = feature_from_node(child) {
                            document.append(feature);
                        }
                    }
                }
            }
            Feature::Document(document)
        }
        "Folder" => {
            let mut folder = Folder::new();
            *folder.data_mut() = feature_data(node, true);
            for feature in node.children.iter().filter_map(feature_from_node) {
                folder.append(feature);
            }
            Feature::Folder(folder)
        }
        "Placemark" => {
            let mut placemark = Placemark::new();
            *placemark.data_mut() = feature_data(node, true);
            if let Some(geometry) = node.children.iter().find_map(geometry_from_node) {
                placemark.set_geometry(geometry);
            }
            Feature::Placemark(placemark)
        }
        "Tour" => {
            let mut tour = Tour::new();
            *tour.data_mut() = feature_data(node, true);
            tour.playlist = node.child("Playlist").map(playlist_from_node);
            Feature::Tour(tour)
        }
        other => {
            tracing::debug!(element = other, "Skipping unsupported KML element");
            return None;
        }
    };
    Some(feature)
}

/// Shared feature metadata; inline `<Style>` is only an own style outside documents
fn feature_data(node: &XmlNode, inline_style: bool) -> FeatureData {
    let mut data = FeatureData {
        id: node.attribute("id").unwrap_or_default().to_string(),
        target_id: node.attribute("targetId").unwrap_or_default().to_string(),
        ..Default::default()
    };

    for child in &node.children {
        let text = child.text.trim();
        match child.name.as_str() {
            "name" => data.name = text.to_string(),
            "description" => {
                data.description = text.to_string();
                data.description_cdata = child.cdata;
            }
            "address" => data.address = text.to_string(),
            "phoneNumber" => data.phone_number = text.to_string(),
            "Snippet" | "snippet" => data.snippet = text.to_string(),
            "visibility" => data.visible = parse_bool(text, true),
            "styleUrl" => data.style_url = text.to_string(),
            "Style" if inline_style => data.style = Some(Arc::new(style_from_node(child))),
            "TimeStamp" => data.timestamp = child.child_text("when").map(TimeStamp::new),
            "TimeSpan" => {
                data.timespan = Some(TimeSpan {
                    begin: child.child_text("begin").map(TimeStamp::new),
                    end: child.child_text("end").map(TimeStamp::new),
                })
            }
            "ExtendedData" => read_extended_data(child, &mut data),
            _ => {}
        }
    }
    data
}

fn read_extended_data(node: &XmlNode, data: &mut FeatureData) {
    for child in &node.children {
        match child.name.as_str() {
            "Data" => {
                let name = child.attribute("name").unwrap_or_default();
                let mut entry = Data::new(
                    name,
                    Variant::from_text(child.child_text("value").unwrap_or_default()),
                );
                entry.display_name = child.child_text("displayName").unwrap_or_default().into();
                data.extended_data.add_value(entry);
            }
            "SchemaData" => {
                for simple in child.children_named("SimpleData") {
                    let name = simple.attribute("name").unwrap_or_default();
                    data.extended_data
                        .add_value(Data::new(name, Variant::from_text(&simple.text)));
                }
                for array in child.children_named("SimpleArrayData") {
                    let values = array
                        .children_named("value")
                        .map(|v| Variant::from_text(&v.text))
                        .collect();
                    data.extended_data.set_simple_array(
                        array.attribute("name").unwrap_or_default(),
                        values,
                    );
                }
            }
            _ => {}
        }
    }
}

fn style_from_node(node: &XmlNode) -> Style {
    let mut style = Style::with_id(node.attribute("id").unwrap_or_default());
    if let Some(icon) = node.child("IconStyle") {
        if let Some(href) = icon.child("Icon").and_then(|i| i.child_text("href")) {
            style.icon_style.icon_path = href.trim().to_string();
        }
        read_f32(icon, "scale", &mut style.icon_style.scale);
        read_f32(icon, "heading", &mut style.icon_style.heading);
        read_color(icon, "color", &mut style.icon_style.color);
        if let Some(hot_spot) = icon.child("hotSpot") {
            style.icon_style.hot_spot = hot_spot_from_node(hot_spot);
        }
    }
    if let Some(label) = node.child("LabelStyle") {
        read_color(label, "color", &mut style.label_style.color);
        read_f32(label, "scale", &mut style.label_style.scale);
    }
    if let Some(line) = node.child("LineStyle") {
        read_color(line, "color", &mut style.line_style.color);
        read_f32(line, "width", &mut style.line_style.width);
    }
    if let Some(poly) = node.child("PolyStyle") {
        read_color(poly, "color", &mut style.poly_style.color);
        if let Some(fill) = poly.child_text("fill") {
            style.poly_style.fill = parse_bool(fill, true);
        }
        if let Some(outline) = poly.child_text("outline") {
            style.poly_style.outline = parse_bool(outline, true);
        }
    }
    if let Some(list) = node.child("ListStyle") {
        if let Some(item_type) = list.child_text("listItemType") {
            style.list_style.item_type = ListItemType::from_kml(item_type);
        }
        read_color(list, "bgColor", &mut style.list_style.background_color);
    }
    if let Some(balloon) = node.child("BalloonStyle") {
        style.balloon_style.text = balloon.child_text("text").unwrap_or_default().trim().into();
        read_color(balloon, "bgColor", &mut style.balloon_style.background_color);
        read_color(balloon, "textColor", &mut style.balloon_style.text_color);
    }
    style
}

fn style_map_from_node(node: &XmlNode) -> StyleMap {
    let mut map = StyleMap::with_id(node.attribute("id").unwrap_or_default());
    for pair in node.children_named("Pair") {
        if let (Some(key), Some(url)) = (pair.child_text("key"), pair.child_text("styleUrl")) {
            map.insert(key.trim(), url.trim());
        }
    }
    map
}

fn geometry_from_node(node: &XmlNode) -> Option<Geometry> {
    let geometry = match node.name.as_str() {
        "Point" => {
            let mut point = Point::new(
                parse_coordinates(node.child_text("coordinates").unwrap_or_default())
                    .first()
                    .copied()
                    .unwrap_or_default(),
            );
            point.extrude = node.child_text("extrude").is_some_and(|t| parse_bool(t, false));
            point.altitude_mode = altitude_mode(node);
            Geometry::Point(point)
        }
        "LineString" => Geometry::LineString(line_string_from_node(node)),
        "LinearRing" => Geometry::LinearRing(LinearRing(line_string_from_node(node))),
        "Polygon" => {
            let ring = |boundary: &XmlNode| {
                boundary
                    .child("LinearRing")
                    .map(|r| LinearRing(line_string_from_node(r)))
                    .unwrap_or_default()
            };
            let mut polygon =
                Polygon::new(node.child("outerBoundaryIs").map(ring).unwrap_or_default());
            polygon.inners = node.children_named("innerBoundaryIs").map(ring).collect();
            polygon.tessellate = node.child_text("tessellate").is_some_and(|t| parse_bool(t, false));
            polygon.extrude = node.child_text("extrude").is_some_and(|t| parse_bool(t, false));
            polygon.altitude_mode = altitude_mode(node);
            Geometry::Polygon(polygon)
        }
        "MultiGeometry" | "MultiTrack" => Geometry::MultiGeometry(MultiGeometry {
            geometries: node.children.iter().filter_map(geometry_from_node).collect(),
        }),
        "Track" => {
            let mut track = Track {
                altitude_mode: altitude_mode(node),
                ..Default::default()
            };
            let whens = node.children_named("when").map(|w| w.text.trim());
            let coords = node.children_named("coord").filter_map(|c| parse_gx_coord(&c.text));
            for (when, coord) in whens.zip(coords) {
                track.add_point(when, coord);
            }
            Geometry::Track(track)
        }
        _ => return None,
    };
    Some(geometry)
}

fn line_string_from_node(node: &XmlNode) -> LineString {
    let mut line =
        LineString::from_coordinates(parse_coordinates(node.child_text("coordinates").unwrap_or_default()));
    line.tessellate = node.child_text("tessellate").is_some_and(|t| parse_bool(t, false));
    line.extrude = node.child_text("extrude").is_some_and(|t| parse_bool(t, false));
    line.altitude_mode = altitude_mode(node);
    line
}

fn altitude_mode(node: &XmlNode) -> AltitudeMode {
    node.child_text("altitudeMode")
        .map(AltitudeMode::from_kml)
        .unwrap_or_default()
}

fn playlist_from_node(node: &XmlNode) -> Playlist {
    let mut playlist = Playlist::new();
    playlist.id = node.attribute("id").unwrap_or_default().to_string();
    for child in &node.children {
        let duration = || parse_f64(child.child_text("duration")).unwrap_or(0.0);
        let primitive = match child.name.as_str() {
            "Wait" => TourPrimitive::Wait {
                duration: duration(),
            },
            "FlyTo" => {
                let look_at = child
                    .child("LookAt")
                    .map(|l| LookAt {
                        coordinates: Coordinates::new(
                            parse_f64(l.child_text("longitude")).unwrap_or(0.0),
                            parse_f64(l.child_text("latitude")).unwrap_or(0.0),
                            parse_f64(l.child_text("altitude")).unwrap_or(0.0),
                        ),
                        range: parse_f64(l.child_text("range")).unwrap_or(0.0),
                        heading: parse_f64(l.child_text("heading")).unwrap_or(0.0),
                        tilt: parse_f64(l.child_text("tilt")).unwrap_or(0.0),
                    })
                    .unwrap_or_default();
                TourPrimitive::FlyTo {
                    duration: duration(),
                    mode: child
                        .child_text("flyToMode")
                        .map(FlyToMode::from_kml)
                        .unwrap_or_default(),
                    look_at,
                }
            }
            "SoundCue" => TourPrimitive::SoundCue {
                href: child.child_text("href").unwrap_or_default().trim().to_string(),
                delay: parse_f64(child.child_text("delayedStart")).unwrap_or(0.0),
            },
            "TourControl" => TourPrimitive::TourControl {
                play_mode: child
                    .child_text("playMode")
                    .map(PlayMode::from_kml)
                    .unwrap_or_default(),
            },
            _ => continue,
        };
        playlist.add_primitive(primitive);
    }
    playlist
}

/// Parse `lon,lat[,alt]` tuples separated by whitespace
///
/// Whitespace around commas is tolerated; malformed tuples are skipped.
pub fn parse_coordinates(text: &str) -> Vec<Coordinates> {
    let mut normalized = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && ch != ',' && !normalized.ends_with(',') {
            normalized.push(' ');
        }
        pending_space = false;
        normalized.push(ch);
    }

    normalized
        .split(' ')
        .filter_map(|tuple| {
            let mut parts = tuple.split(',').map(str::parse::<f64>);
            let lon = parts.next()?.ok()?;
            let lat = parts.next()?.ok()?;
            let alt = match parts.next() {
                Some(alt) => alt.ok()?,
                None => 0.0,
            };
            Some(Coordinates::new(lon, lat, alt))
        })
        .collect()
}

fn parse_gx_coord(text: &str) -> Option<Coordinates> {
    let mut parts = text.split_whitespace().map(str::parse::<f64>);
    let lon = parts.next()?.ok()?;
    let lat = parts.next()?.ok()?;
    let alt = parts.next().and_then(|a| a.ok()).unwrap_or(0.0);
    Some(Coordinates::new(lon, lat, alt))
}

fn parse_bool(text: &str, default: bool) -> bool {
    match text.trim() {
        "1" | "true" => true,
        "0" | "false" => false,
        _ => default,
    }
}

fn parse_f64(text: Option<&str>) -> Option<f64> {
    text?.trim().parse().ok()
}

fn hot_spot_from_node(node: &XmlNode) -> HotSpot {
    let mut hot_spot = HotSpot::default();
    let ordinate = |name: &str| node.attribute(name).and_then(|v| v.trim().parse::<f32>().ok());
    let units = |name: &str| node.attribute(name).and_then(HotSpotUnits::from_kml);
    if let Some(x) = ordinate("x") {
        hot_spot.x = x;
    }
    if let Some(y) = ordinate("y") {
        hot_spot.y = y;
    }
    if let Some(x_units) = units("xunits") {
        hot_spot.x_units = x_units;
    }
    if let Some(y_units) = units("yunits") {
        hot_spot.y_units = y_units;
    }
    hot_spot
}

fn read_f32(node: &XmlNode, name: &str, target: &mut f32) {
    if let Some(value) = node.child_text(name).and_then(|t| t.trim().parse().ok()) {
        *target = value;
    }
}

fn read_color(node: &XmlNode, name: &str, target: &mut Color) {
    if let Some(color) = node.child_text(name).and_then(Color::from_kml_hex) {
        *target = color;
    }
}

type KmlWriter = Writer<Vec<u8>>;

/// Serialize a document as KML text
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn write_kml(document: &Document) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    kml.push_attribute(("xmlns:gx", GX_NAMESPACE));
    w.write_event(Event::Start(kml))?;
    write_document(&mut w, document)?;
    w.write_event(Event::End(BytesEnd::new("kml")))?;

    String::from_utf8(w.into_inner()).map_err(|e| GeoDataError::Kml(e.to_string()))
}

pub fn write_kml_file(document: &Document, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, write_kml(document)?)?;
    Ok(())
}

fn write_document(w: &mut KmlWriter, document: &Document) -> Result<()> {
    start_feature(w, "Document", document.data())?;
    write_feature_data(w, document.data(), false)?;
    for style in document.styles() {
        write_style(w, style)?;
    }
    for map in document.style_maps() {
        let mut start = BytesStart::new("StyleMap");
        start.push_attribute(("id", map.id.as_str()));
        w.write_event(Event::Start(start))?;
        for (key, url) in &map.pairs {
            w.write_event(Event::Start(BytesStart::new("Pair")))?;
            text_element(w, "key", key)?;
            text_element(w, "styleUrl", url)?;
            w.write_event(Event::End(BytesEnd::new("Pair")))?;
        }
        w.write_event(Event::End(BytesEnd::new("StyleMap")))?;
    }
    for child in document.children() {
        write_feature(w, child)?;
    }
    w.write_event(Event::End(BytesEnd::new("Document")))?;
    Ok(())
}

fn write_feature(w: &mut KmlWriter, feature: &Feature) -> Result<()> {
    match feature {
        Feature::Document(document) => write_document(w, document),
        Feature::Folder(folder) => {
            start_feature(w, "Folder", folder.data())?;
            write_feature_data(w, folder.data(), true)?;
            for child in folder.children() {
                write_feature(w, child)?;
            }
            w.write_event(Event::End(BytesEnd::new("Folder")))?;
            Ok(())
        }
        Feature::Placemark(placemark) => {
            start_feature(w, "Placemark", placemark.data())?;
            write_feature_data(w, placemark.data(), true)?;
            write_geometry(w, placemark.geometry())?;
            w.write_event(Event::End(BytesEnd::new("Placemark")))?;
            Ok(())
        }
        Feature::Tour(tour) => {
            start_feature(w, "gx:Tour", tour.data())?;
            write_feature_data(w, tour.data(), true)?;
            if let Some(playlist) = tour.playlist() {
                write_playlist(w, playlist)?;
            }
            w.write_event(Event::End(BytesEnd::new("gx:Tour")))?;
            Ok(())
        }
    }
}

fn start_feature(w: &mut KmlWriter, tag: &str, data: &FeatureData) -> Result<()> {
    let mut start = BytesStart::new(tag);
    if !data.id.is_empty() {
        start.push_attribute(("id", data.id.as_str()));
    }
    if !data.target_id.is_empty() {
        start.push_attribute(("targetId", data.target_id.as_str()));
    }
    w.write_event(Event::Start(start))?;
    Ok(())
}

fn write_feature_data(w: &mut KmlWriter, d: &FeatureData, inline_style: bool) -> Result<()> {
    if !d.name.is_empty() {
        text_element(w, "name", &d.name)?;
    }
    if !d.visible {
        text_element(w, "visibility", "0")?;
    }
    if !d.address.is_empty() {
        text_element(w, "address", &d.address)?;
    }
    if !d.phone_number.is_empty() {
        text_element(w, "phoneNumber", &d.phone_number)?;
    }
    if !d.snippet.is_empty() {
        text_element(w, "Snippet", &d.snippet)?;
    }
    if !d.description.is_empty() {
        if d.description_cdata {
            w.write_event(Event::Start(BytesStart::new("description")))?;
            w.write_event(Event::CData(BytesCData::new(d.description.as_str())))?;
            w.write_event(Event::End(BytesEnd::new("description")))?;
        } else {
            text_element(w, "description", &d.description)?;
        }
    }
    if let Some(timestamp) = &d.timestamp {
        w.write_event(Event::Start(BytesStart::new("TimeStamp")))?;
        text_element(w, "when", &timestamp.when)?;
        w.write_event(Event::End(BytesEnd::new("TimeStamp")))?;
    }
    if let Some(span) = &d.timespan {
        w.write_event(Event::Start(BytesStart::new("TimeSpan")))?;
        if let Some(begin) = &span.begin {
            text_element(w, "begin", &begin.when)?;
        }
        if let Some(end) = &span.end {
            text_element(w, "end", &end.when)?;
        }
        w.write_event(Event::End(BytesEnd::new("TimeSpan")))?;
    }
    if !d.style_url.is_empty() {
        text_element(w, "styleUrl", &d.style_url)?;
    } else if inline_style && let Some(style) = &d.style {
        write_style(w, style)?;
    }
    if !d.extended_data.is_empty() {
        w.write_event(Event::Start(BytesStart::new("ExtendedData")))?;
        for data in d.extended_data.entries() {
            let mut start = BytesStart::new("Data");
            start.push_attribute(("name", data.name.as_str()));
            w.write_event(Event::Start(start))?;
            if !data.display_name.is_empty() {
                text_element(w, "displayName", &data.display_name)?;
            }
            text_element(w, "value", &data.value.to_text())?;
            w.write_event(Event::End(BytesEnd::new("Data")))?;
        }
        let arrays = d.extended_data.simple_arrays();
        if !arrays.is_empty() {
            w.write_event(Event::Start(BytesStart::new("SchemaData")))?;
            for (name, values) in arrays {
                let mut start = BytesStart::new("gx:SimpleArrayData");
                start.push_attribute(("name", name));
                w.write_event(Event::Start(start))?;
                for value in values {
                    text_element(w, "gx:value", &value.to_text())?;
                }
                w.write_event(Event::End(BytesEnd::new("gx:SimpleArrayData")))?;
            }
            w.write_event(Event::End(BytesEnd::new("SchemaData")))?;
        }
        w.write_event(Event::End(BytesEnd::new("ExtendedData")))?;
    }
    Ok(())
}

fn write_style(w: &mut KmlWriter, s: &Style) -> Result<()> {
    let mut start = BytesStart::new("Style");
    if !s.id.is_empty() {
        start.push_attribute(("id", s.id.as_str()));
    }
    w.write_event(Event::Start(start))?;

    w.write_event(Event::Start(BytesStart::new("IconStyle")))?;
    text_element(w, "color", &s.icon_style.color.to_kml_hex())?;
    text_element(w, "scale", &s.icon_style.scale.to_string())?;
    text_element(w, "heading", &s.icon_style.heading.to_string())?;
    let hot_spot = &s.icon_style.hot_spot;
    let (x, y) = (hot_spot.x.to_string(), hot_spot.y.to_string());
    let mut start = BytesStart::new("hotSpot");
    start.push_attribute(("x", x.as_str()));
    start.push_attribute(("y", y.as_str()));
    start.push_attribute(("xunits", hot_spot.x_units.as_kml()));
    start.push_attribute(("yunits", hot_spot.y_units.as_kml()));
    w.write_event(Event::Empty(start))?;
    if !s.icon_style.icon_path.is_empty() {
        w.write_event(Event::Start(BytesStart::new("Icon")))?;
        text_element(w, "href", &s.icon_style.icon_path)?;
        w.write_event(Event::End(BytesEnd::new("Icon")))?;
    }
    w.write_event(Event::End(BytesEnd::new("IconStyle")))?;

    w.write_event(Event::Start(BytesStart::new("LabelStyle")))?;
    text_element(w, "color", &s.label_style.color.to_kml_hex())?;
    text_element(w, "scale", &s.label_style.scale.to_string())?;
    w.write_event(Event::End(BytesEnd::new("LabelStyle")))?;

    w.write_event(Event::Start(BytesStart::new("LineStyle")))?;
    text_element(w, "color", &s.line_style.color.to_kml_hex())?;
    text_element(w, "width", &s.line_style.width.to_string())?;
    w.write_event(Event::End(BytesEnd::new("LineStyle")))?;

    w.write_event(Event::Start(BytesStart::new("PolyStyle")))?;
    text_element(w, "color", &s.poly_style.color.to_kml_hex())?;
    text_element(w, "fill", if s.poly_style.fill { "1" } else { "0" })?;
    text_element(w, "outline", if s.poly_style.outline { "1" } else { "0" })?;
    w.write_event(Event::End(BytesEnd::new("PolyStyle")))?;

    w.write_event(Event::Start(BytesStart::new("ListStyle")))?;
    text_element(w, "listItemType", s.list_style.item_type.as_kml())?;
    text_element(w, "bgColor", &s.list_style.background_color.to_kml_hex())?;
    w.write_event(Event::End(BytesEnd::new("ListStyle")))?;

    w.write_event(Event::Start(BytesStart::new("BalloonStyle")))?;
    text_element(w, "bgColor", &s.balloon_style.background_color.to_kml_hex())?;
    text_element(w, "textColor", &s.balloon_style.text_color.to_kml_hex())?;
    if !s.balloon_style.text.is_empty() {
        text_element(w, "text", &s.balloon_style.text)?;
    }
    w.write_event(Event::End(BytesEnd::new("BalloonStyle")))?;

    w.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_geometry(w: &mut KmlWriter, geometry: &Geometry) -> Result<()> {
    match geometry {
        Geometry::Point(p) => {
            w.write_event(Event::Start(BytesStart::new("Point")))?;
            write_geometry_flags(w, false, p.extrude, p.altitude_mode)?;
            text_element(w, "coordinates", &format_coordinates([&p.coordinates]))?;
            w.write_event(Event::End(BytesEnd::new("Point")))?;
        }
        Geometry::LineString(l) => write_line_string(w, "LineString", l)?,
        Geometry::LinearRing(r) => write_line_string(w, "LinearRing", r)?,
        Geometry::Polygon(p) => {
            w.write_event(Event::Start(BytesStart::new("Polygon")))?;
            write_geometry_flags(w, p.tessellate, p.extrude, p.altitude_mode)?;
            w.write_event(Event::Start(BytesStart::new("outerBoundaryIs")))?;
            write_line_string(w, "LinearRing", &p.outer)?;
            w.write_event(Event::End(BytesEnd::new("outerBoundaryIs")))?;
            for inner in &p.inners {
                w.write_event(Event::Start(BytesStart::new("innerBoundaryIs")))?;
                write_line_string(w, "LinearRing", inner)?;
                w.write_event(Event::End(BytesEnd::new("innerBoundaryIs")))?;
            }
            w.write_event(Event::End(BytesEnd::new("Polygon")))?;
        }
        Geometry::MultiGeometry(m) => {
            w.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for g in &m.geometries {
                write_geometry(w, g)?;
            }
            w.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
        Geometry::Track(t) => {
            w.write_event(Event::Start(BytesStart::new("gx:Track")))?;
            write_geometry_flags(w, false, false, t.altitude_mode)?;
            for when in &t.when {
                text_element(w, "when", when)?;
            }
            for c in &t.coordinates {
                text_element(w, "gx:coord", &format!("{} {} {}", c.lon, c.lat, c.alt))?;
            }
            w.write_event(Event::End(BytesEnd::new("gx:Track")))?;
        }
    }
    Ok(())
}

fn write_line_string(w: &mut KmlWriter, tag: &str, l: &LineString) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    write_geometry_flags(w, l.tessellate, l.extrude, l.altitude_mode)?;
    text_element(w, "coordinates", &format_coordinates(&l.coordinates))?;
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_geometry_flags(
    w: &mut KmlWriter,
    tessellate: bool,
    extrude: bool,
    mode: AltitudeMode,
) -> Result<()> {
    if extrude {
        text_element(w, "extrude", "1")?;
    }
    if tessellate {
        text_element(w, "tessellate", "1")?;
    }
    if mode != AltitudeMode::default() {
        text_element(w, "altitudeMode", mode.as_kml())?;
    }
    Ok(())
}

fn format_coordinates<'a>(coords: impl IntoIterator<Item = &'a Coordinates>) -> String {
    coords
        .into_iter()
        .map(|c| format!("{},{},{}", c.lon, c.lat, c.alt))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_playlist(w: &mut KmlWriter, playlist: &Playlist) -> Result<()> {
    let mut start = BytesStart::new("gx:Playlist");
    if !playlist.id.is_empty() {
        start.push_attribute(("id", playlist.id.as_str()));
    }
    w.write_event(Event::Start(start))?;
    for primitive in playlist.primitives() {
        match primitive {
            TourPrimitive::Wait { duration } => {
                w.write_event(Event::Start(BytesStart::new("gx:Wait")))?;
                text_element(w, "gx:duration", &duration.to_string())?;
                w.write_event(Event::End(BytesEnd::new("gx:Wait")))?;
            }
            TourPrimitive::FlyTo {
                duration,
                mode,
                look_at,
            } => {
                w.write_event(Event::Start(BytesStart::new("gx:FlyTo")))?;
                text_element(w, "gx:duration", &duration.to_string())?;
                text_element(w, "gx:flyToMode", mode.as_kml())?;
                w.write_event(Event::Start(BytesStart::new("LookAt")))?;
                text_element(w, "longitude", &look_at.coordinates.lon.to_string())?;
                text_element(w, "latitude", &look_at.coordinates.lat.to_string())?;
                text_element(w, "altitude", &look_at.coordinates.alt.to_string())?;
                text_element(w, "heading", &look_at.heading.to_string())?;
                text_element(w, "tilt", &look_at.tilt.to_string())?;
                text_element(w, "range", &look_at.range.to_string())?;
                w.write_event(Event::End(BytesEnd::new("LookAt")))?;
                w.write_event(Event::End(BytesEnd::new("gx:FlyTo")))?;
            }
            TourPrimitive::SoundCue { href, delay } => {
                w.write_event(Event::Start(BytesStart::new("gx:SoundCue")))?;
                text_element(w, "href", href)?;
                text_element(w, "gx:delayedStart", &delay.to_string())?;
                w.write_event(Event::End(BytesEnd::new("gx:SoundCue")))?;
            }
            TourPrimitive::TourControl { play_mode } => {
                w.write_event(Event::Start(BytesStart::new("gx:TourControl")))?;
                text_element(w, "gx:playMode", play_mode.as_kml())?;
                w.write_event(Event::End(BytesEnd::new("gx:TourControl")))?;
            }
        }
    }
    w.write_event(Event::End(BytesEnd::new("gx:Playlist")))?;
    Ok(())
}

fn text_element(w: &mut KmlWriter, tag: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
