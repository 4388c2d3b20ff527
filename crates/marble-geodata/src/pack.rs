//! Compact binary cache format for document trees
//!
//! All integers and floats are big-endian. A stream starts with [`PACK_MAGIC`] and
//! [`PACK_VERSION`], followed by the packed root document. Every field that takes part in
//! feature equality is written, so `unpack(pack(doc)) == doc`.
//!
//! # Layout
//!
//! - **Strings**: `u32` byte length followed by UTF-8 bytes
//! - **Features**: `u8` type id, the shared metadata, then the type specific payload
//! - **Geometries**: `u8` type id followed by the type specific payload
//!
//! Nesting deeper than [`MAX_NESTING_DEPTH`] is rejected when reading.

use crate::extended_data::{Data, Variant};
use crate::style::{
    BalloonStyle, HotSpot, HotSpotUnits, IconStyle, LabelStyle, LineStyle, ListStyle, PolyStyle,
};
use crate::tour::{FlyToMode, LookAt, PlayMode};
use crate::{
    AltitudeMode, Color, Coordinates, Document, DocumentRole, ExtendedData, Feature, FeatureData,
    Folder, GeoDataError, GeoFeature, Geometry, LineString, LinearRing, ListItemType,
    MultiGeometry, Placemark, Playlist, Point, Polygon, Result, Style, StyleMap, TimeSpan,
    TimeStamp, Tour, TourPrimitive, Track, VisualCategory,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const PACK_MAGIC: &[u8; 4] = b"MBPK";
pub const PACK_VERSION: u16 = 2;

/// Deepest feature or geometry nesting accepted when reading
pub const MAX_NESTING_DEPTH: usize = 256;

const DOCUMENT_ID: u8 = 1;
const FOLDER_ID: u8 = 2;
const PLACEMARK_ID: u8 = 3;
const TOUR_ID: u8 = 7;

const POINT_ID: u8 = 0;
const LINE_STRING_ID: u8 = 1;
const LINEAR_RING_ID: u8 = 2;
const POLYGON_ID: u8 = 3;
const MULTI_GEOMETRY_ID: u8 = 4;
const TRACK_ID: u8 = 6;

/// Write a complete pack stream for `document`
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn pack_document<W: Write>(document: &Document, writer: &mut W) -> Result<()> {
    writer.write_all(PACK_MAGIC)?;
    writer.write_u16::<BigEndian>(PACK_VERSION)?;
    pack_document_body(document, writer)
}

/// Read a complete pack stream
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn unpack_document<R: Read>(reader: &mut R) -> Result<Document> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != PACK_MAGIC {
        return Err(GeoDataError::Pack("bad magic".into()));
    }
    let version = reader.read_u16::<BigEndian>()?;
    if version != PACK_VERSION {
        return Err(GeoDataError::Pack(format!("unsupported version {version}")));
    }
    match unpack_feature_at(reader, 0)? {
        Feature::Document(document) => Ok(document),
        other => Err(GeoDataError::Pack(format!(
            "root is a {}, expected a document",
            crate::GeoNode::node_type(&other)
        ))),
    }
}

pub fn pack_to_bytes(document: &Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    pack_document(document, &mut bytes)?;
    Ok(bytes)
}

pub fn unpack_from_bytes(mut bytes: &[u8]) -> Result<Document> {
    unpack_document(&mut bytes)
}

pub fn pack_feature<W: Write>(feature: &Feature, w: &mut W) -> Result<()> {
    match feature {
        Feature::Document(d) => pack_document_body(d, w),
        Feature::Folder(f) => {
            w.write_u8(FOLDER_ID)?;
            pack_feature_data(f.data(), w)?;
            pack_children(f.children(), w)
        }
        Feature::Placemark(p) => {
            w.write_u8(PLACEMARK_ID)?;
            pack_feature_data(p.data(), w)?;
            pack_geometry(p.geometry(), w)
        }
        Feature::Tour(t) => {
            w.write_u8(TOUR_ID)?;
            pack_feature_data(t.data(), w)?;
            match t.playlist() {
                Some(playlist) => {
                    w.write_u8(1)?;
                    pack_playlist(playlist, w)
                }
                None => Ok(w.write_u8(0)?),
            }
        }
    }
}

pub fn unpack_feature<R: Read>(r: &mut R) -> Result<Feature> {
    unpack_feature_at(r, 0)
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(GeoDataError::Pack(format!(
            "nested deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }
    Ok(())
}

fn unpack_feature_at<R: Read>(r: &mut R, depth: usize) -> Result<Feature> {
    check_depth(depth)?;
    let type_id = r.read_u8()?;
    let data = unpack_feature_data(r)?;
    let feature = match type_id {
        DOCUMENT_ID => {
            let mut document = Document::new();
            *document.data_mut() = data;
            let role = r.read_u8()?;
            document.set_role(
                DocumentRole::from_u8(role)
                    .ok_or_else(|| GeoDataError::Pack(format!("bad document role {role}")))?,
            );
            document.set_file_name(read_string(r)?);
            for _ in 0..r.read_u32::<BigEndian>()? {
                document.add_style(unpack_style(r)?);
            }
            for _ in 0..r.read_u32::<BigEndian>()? {
                let mut map = StyleMap::with_id(read_string(r)?);
                for _ in 0..r.read_u32::<BigEndian>()? {
                    let key = read_string(r)?;
                    map.insert(key, read_string(r)?);
                }
                document.add_style_map(map);
            }
            for child in unpack_children(r, depth)? {
                document.append(child);
            }
            Feature::Document(document)
        }
        FOLDER_ID => {
            let mut folder = Folder::new();
            *folder.data_mut() = data;
            for child in unpack_children(r, depth)? {
                folder.append(child);
            }
            Feature::Folder(folder)
        }
        PLACEMARK_ID => {
            let mut placemark = Placemark::new();
            *placemark.data_mut() = data;
            placemark.set_geometry(unpack_geometry_at(r, depth + 1)?);
            Feature::Placemark(placemark)
        }
        TOUR_ID => {
            let mut tour = Tour::new();
            *tour.data_mut() = data;
            if r.read_u8()? != 0 {
                tour.playlist = Some(unpack_playlist(r)?);
            }
            Feature::Tour(tour)
        }
        other => return Err(GeoDataError::Pack(format!("unknown feature id {other}"))),
    };
    Ok(feature)
}

fn pack_document_body<W: Write>(document: &Document, w: &mut W) -> Result<()> {
    w.write_u8(DOCUMENT_ID)?;
    pack_feature_data(document.data(), w)?;
    w.write_u8(document.role().to_u8())?;
    write_string(document.file_name(), w)?;

    let styles: Vec<_> = document.styles().collect();
    w.write_u32::<BigEndian>(styles.len() as u32)?;
    for style in styles {
        pack_style(style, w)?;
    }

    let maps: Vec<_> = document.style_maps().collect();
    w.write_u32::<BigEndian>(maps.len() as u32)?;
    for map in maps {
        write_string(&map.id, w)?;
        w.write_u32::<BigEndian>(map.pairs.len() as u32)?;
        for (key, url) in &map.pairs {
            write_string(key, w)?;
            write_string(url, w)?;
        }
    }

    pack_children(document.children(), w)
}

fn pack_children<W: Write>(children: &[Feature], w: &mut W) -> Result<()> {
    w.write_u32::<BigEndian>(children.len() as u32)?;
    for child in children {
        pack_feature(child, w)?;
    }
    Ok(())
}

fn unpack_children<R: Read>(r: &mut R, depth: usize) -> Result<Vec<Feature>> {
    let count = r.read_u32::<BigEndian>()?;
    (0..count).map(|_| unpack_feature_at(r, depth + 1)).collect()
}

fn pack_feature_data<W: Write>(d: &FeatureData, w: &mut W) -> Result<()> {
    write_string(&d.id, w)?;
    write_string(&d.target_id, w)?;
    write_string(&d.name, w)?;
    write_string(&d.description, w)?;
    w.write_u8(d.description_cdata as u8)?;
    write_string(&d.address, w)?;
    write_string(&d.phone_number, w)?;
    write_string(&d.snippet, w)?;
    w.write_u8(d.visible as u8)?;
    write_opt_string(d.timestamp.as_ref().map(|t| t.when.as_str()), w)?;
    match &d.timespan {
        Some(span) => {
            w.write_u8(1)?;
            write_opt_string(span.begin.as_ref().map(|t| t.when.as_str()), w)?;
            write_opt_string(span.end.as_ref().map(|t| t.when.as_str()), w)?;
        }
        None => w.write_u8(0)?,
    }
    write_string(&d.style_url, w)?;
    match &d.style {
        Some(style) => {
            w.write_u8(1)?;
            pack_style(style, w)?;
        }
        None => w.write_u8(0)?,
    }
    pack_extended_data(&d.extended_data, w)?;
    w.write_i32::<BigEndian>(d.zoom_level)?;
    w.write_i64::<BigEndian>(d.popularity)?;
    w.write_u16::<BigEndian>(d.visual_category.to_index())?;
    write_string(&d.role, w)
}

fn unpack_feature_data<R: Read>(r: &mut R) -> Result<FeatureData> {
    let id = read_string(r)?;
    let target_id = read_string(r)?;
    let name = read_string(r)?;
    let description = read_string(r)?;
    let description_cdata = r.read_u8()? != 0;
    let address = read_string(r)?;
    let phone_number = read_string(r)?;
    let snippet = read_string(r)?;
    let visible = r.read_u8()? != 0;
    let timestamp = read_opt_string(r)?.map(TimeStamp::new);
    let timespan = if r.read_u8()? != 0 {
        Some(TimeSpan {
            begin: read_opt_string(r)?.map(TimeStamp::new),
            end: read_opt_string(r)?.map(TimeStamp::new),
        })
    } else {
        None
    };
    let style_url = read_string(r)?;
    let style = if r.read_u8()? != 0 {
        Some(std::sync::Arc::new(unpack_style(r)?))
    } else {
        None
    };
    let extended_data = unpack_extended_data(r)?;
    let zoom_level = r.read_i32::<BigEndian>()?;
    let popularity = r.read_i64::<BigEndian>()?;
    let category = r.read_u16::<BigEndian>()?;
    let visual_category = VisualCategory::from_index(category)
        .ok_or_else(|| GeoDataError::Pack(format!("bad visual category {category}")))?;
    let role = read_string(r)?;

    Ok(FeatureData {
        id,
        target_id,
        name,
        description,
        description_cdata,
        address,
        phone_number,
        snippet,
        visible,
        timestamp,
        timespan,
        style_url,
        style,
        extended_data,
        zoom_level,
        popularity,
        visual_category,
        role,
    })
}

pub fn pack_geometry<W: Write>(geometry: &Geometry, w: &mut W) -> Result<()> {
    match geometry {
        Geometry::Point(p) => {
            w.write_u8(POINT_ID)?;
            write_coordinates(&p.coordinates, w)?;
            w.write_u8(p.extrude as u8)?;
            w.write_u8(p.altitude_mode.to_u8())?;
        }
        Geometry::LineString(l) => {
            w.write_u8(LINE_STRING_ID)?;
            pack_line_string(l, w)?;
        }
        Geometry::LinearRing(r) => {
            w.write_u8(LINEAR_RING_ID)?;
            pack_line_string(r, w)?;
        }
        Geometry::Polygon(p) => {
            w.write_u8(POLYGON_ID)?;
            w.write_u8(p.tessellate as u8)?;
            w.write_u8(p.extrude as u8)?;
            w.write_u8(p.altitude_mode.to_u8())?;
            pack_line_string(&p.outer, w)?;
            w.write_u32::<BigEndian>(p.inners.len() as u32)?;
            for inner in &p.inners {
                pack_line_string(inner, w)?;
            }
        }
        Geometry::MultiGeometry(m) => {
            w.write_u8(MULTI_GEOMETRY_ID)?;
            w.write_u32::<BigEndian>(m.geometries.len() as u32)?;
            for g in &m.geometries {
                pack_geometry(g, w)?;
            }
        }
        Geometry::Track(t) => {
            w.write_u8(TRACK_ID)?;
            w.write_u8(t.altitude_mode.to_u8())?;
            w.write_u32::<BigEndian>(t.when.len() as u32)?;
            for when in &t.when {
                write_string(when, w)?;
            }
            w.write_u32::<BigEndian>(t.coordinates.len() as u32)?;
            for c in &t.coordinates {
                write_coordinates(c, w)?;
            }
        }
    }
    Ok(())
}

pub fn unpack_geometry<R: Read>(r: &mut R) -> Result<Geometry> {
    unpack_geometry_at(r, 0)
}

fn unpack_geometry_at<R: Read>(r: &mut R, depth: usize) -> Result<Geometry> {
    check_depth(depth)?;
    let geometry = match r.read_u8()? {
        POINT_ID => {
            let mut point = Point::new(read_coordinates(r)?);
            point.extrude = r.read_u8()? != 0;
            point.altitude_mode = read_altitude_mode(r)?;
            Geometry::Point(point)
        }
        LINE_STRING_ID => Geometry::LineString(unpack_line_string(r)?),
        LINEAR_RING_ID => Geometry::LinearRing(LinearRing(unpack_line_string(r)?)),
        POLYGON_ID => {
            let tessellate = r.read_u8()? != 0;
            let extrude = r.read_u8()? != 0;
            let altitude_mode = read_altitude_mode(r)?;
            let mut polygon = Polygon::new(LinearRing(unpack_line_string(r)?));
            polygon.tessellate = tessellate;
            polygon.extrude = extrude;
            polygon.altitude_mode = altitude_mode;
            for _ in 0..r.read_u32::<BigEndian>()? {
                polygon.inners.push(LinearRing(unpack_line_string(r)?));
            }
            Geometry::Polygon(polygon)
        }
        MULTI_GEOMETRY_ID => {
            let mut multi = MultiGeometry::default();
            for _ in 0..r.read_u32::<BigEndian>()? {
                multi.push(unpack_geometry_at(r, depth + 1)?);
            }
            Geometry::MultiGeometry(multi)
        }
        TRACK_ID => {
            let mut track = Track {
                altitude_mode: read_altitude_mode(r)?,
                ..Default::default()
            };
            track.when = (0..r.read_u32::<BigEndian>()?)
                .map(|_| read_string(r))
                .collect::<Result<_>>()?;
            track.coordinates = (0..r.read_u32::<BigEndian>()?)
                .map(|_| read_coordinates(r))
                .collect::<Result<_>>()?;
            Geometry::Track(track)
        }
        other => return Err(GeoDataError::Pack(format!("unknown geometry id {other}"))),
    };
    Ok(geometry)
}

fn pack_line_string<W: Write>(l: &LineString, w: &mut W) -> Result<()> {
    w.write_u8(l.tessellate as u8)?;
    w.write_u8(l.extrude as u8)?;
    w.write_u8(l.altitude_mode.to_u8())?;
    w.write_u32::<BigEndian>(l.coordinates.len() as u32)?;
    for c in &l.coordinates {
        write_coordinates(c, w)?;
    }
    Ok(())
}

fn unpack_line_string<R: Read>(r: &mut R) -> Result<LineString> {
    let tessellate = r.read_u8()? != 0;
    let extrude = r.read_u8()? != 0;
    let altitude_mode = read_altitude_mode(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let coordinates = (0..count)
        .map(|_| read_coordinates(r))
        .collect::<Result<Vec<_>>>()?;
    let mut line = LineString::from_coordinates(coordinates);
    line.tessellate = tessellate;
    line.extrude = extrude;
    line.altitude_mode = altitude_mode;
    Ok(line)
}

fn pack_style<W: Write>(s: &Style, w: &mut W) -> Result<()> {
    write_string(&s.id, w)?;
    write_string(&s.icon_style.icon_path, w)?;
    w.write_f32::<BigEndian>(s.icon_style.scale)?;
    w.write_u32::<BigEndian>(s.icon_style.color.to_u32())?;
    w.write_f32::<BigEndian>(s.icon_style.hot_spot.x)?;
    w.write_f32::<BigEndian>(s.icon_style.hot_spot.y)?;
    w.write_u8(s.icon_style.hot_spot.x_units.to_u8())?;
    w.write_u8(s.icon_style.hot_spot.y_units.to_u8())?;
    w.write_f32::<BigEndian>(s.icon_style.heading)?;
    w.write_u32::<BigEndian>(s.label_style.color.to_u32())?;
    w.write_f32::<BigEndian>(s.label_style.scale)?;
    w.write_u32::<BigEndian>(s.line_style.color.to_u32())?;
    w.write_f32::<BigEndian>(s.line_style.width)?;
    w.write_u32::<BigEndian>(s.poly_style.color.to_u32())?;
    w.write_u8(s.poly_style.fill as u8)?;
    w.write_u8(s.poly_style.outline as u8)?;
    w.write_u8(s.list_style.item_type.to_u8())?;
    w.write_u32::<BigEndian>(s.list_style.background_color.to_u32())?;
    write_string(&s.balloon_style.text, w)?;
    w.write_u32::<BigEndian>(s.balloon_style.background_color.to_u32())?;
    w.write_u32::<BigEndian>(s.balloon_style.text_color.to_u32())?;
    Ok(())
}

fn unpack_style<R: Read>(r: &mut R) -> Result<Style> {
    let id = read_string(r)?;
    let icon_style = IconStyle {
        icon_path: read_string(r)?,
        scale: r.read_f32::<BigEndian>()?,
        color: read_color(r)?,
        hot_spot: HotSpot {
            x: r.read_f32::<BigEndian>()?,
            y: r.read_f32::<BigEndian>()?,
            x_units: read_hot_spot_units(r)?,
            y_units: read_hot_spot_units(r)?,
        },
        heading: r.read_f32::<BigEndian>()?,
    };
    let label_style = LabelStyle {
        color: read_color(r)?,
        scale: r.read_f32::<BigEndian>()?,
    };
    let line_style = LineStyle {
        color: read_color(r)?,
        width: r.read_f32::<BigEndian>()?,
    };
    let poly_style = PolyStyle {
        color: read_color(r)?,
        fill: r.read_u8()? != 0,
        outline: r.read_u8()? != 0,
    };
    let item_type = r.read_u8()?;
    let list_style = ListStyle {
        item_type: ListItemType::from_u8(item_type)
            .ok_or_else(|| GeoDataError::Pack(format!("bad list item type {item_type}")))?,
        background_color: read_color(r)?,
    };
    let balloon_style = BalloonStyle {
        text: read_string(r)?,
        background_color: read_color(r)?,
        text_color: read_color(r)?,
    };
    Ok(Style {
        id,
        icon_style,
        label_style,
        line_style,
        poly_style,
        list_style,
        balloon_style,
    })
}

fn pack_extended_data<W: Write>(ext: &ExtendedData, w: &mut W) -> Result<()> {
    let entries = ext.entries();
    w.write_u32::<BigEndian>(entries.len() as u32)?;
    for data in entries {
        write_string(&data.name, w)?;
        write_string(&data.display_name, w)?;
        pack_variant(&data.value, w)?;
    }
    let arrays = ext.simple_arrays();
    w.write_u32::<BigEndian>(arrays.len() as u32)?;
    for (name, values) in arrays {
        write_string(name, w)?;
        w.write_u32::<BigEndian>(values.len() as u32)?;
        for value in values {
            pack_variant(value, w)?;
        }
    }
    Ok(())
}

fn unpack_extended_data<R: Read>(r: &mut R) -> Result<ExtendedData> {
    let mut ext = ExtendedData::new();
    for _ in 0..r.read_u32::<BigEndian>()? {
        let name = read_string(r)?;
        let display_name = read_string(r)?;
        let value = unpack_variant(r)?;
        ext.add_value(Data {
            name,
            display_name,
            value,
        });
    }
    for _ in 0..r.read_u32::<BigEndian>()? {
        let name = read_string(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let values = (0..count)
            .map(|_| unpack_variant(r))
            .collect::<Result<Vec<_>>>()?;
        ext.set_simple_array(name, values);
    }
    Ok(ext)
}

fn pack_variant<W: Write>(value: &Variant, w: &mut W) -> Result<()> {
    match value {
        Variant::Null => w.write_u8(0)?,
        Variant::Bool(b) => {
            w.write_u8(1)?;
            w.write_u8(*b as u8)?;
        }
        Variant::Int(i) => {
            w.write_u8(2)?;
            w.write_i64::<BigEndian>(*i)?;
        }
        Variant::Double(d) => {
            w.write_u8(3)?;
            w.write_f64::<BigEndian>(*d)?;
        }
        Variant::String(s) => {
            w.write_u8(4)?;
            write_string(s, w)?;
        }
    }
    Ok(())
}

fn unpack_variant<R: Read>(r: &mut R) -> Result<Variant> {
    Ok(match r.read_u8()? {
        0 => Variant::Null,
        1 => Variant::Bool(r.read_u8()? != 0),
        2 => Variant::Int(r.read_i64::<BigEndian>()?),
        3 => Variant::Double(r.read_f64::<BigEndian>()?),
        4 => Variant::String(read_string(r)?),
        other => return Err(GeoDataError::Pack(format!("unknown variant tag {other}"))),
    })
}

fn pack_playlist<W: Write>(playlist: &Playlist, w: &mut W) -> Result<()> {
    write_string(&playlist.id, w)?;
    w.write_u32::<BigEndian>(playlist.size() as u32)?;
    for primitive in playlist.primitives() {
        match primitive {
            TourPrimitive::Wait { duration } => {
                w.write_u8(0)?;
                w.write_f64::<BigEndian>(*duration)?;
            }
            TourPrimitive::FlyTo {
                duration,
                mode,
                look_at,
            } => {
                w.write_u8(1)?;
                w.write_f64::<BigEndian>(*duration)?;
                w.write_u8(matches!(mode, FlyToMode::Smooth) as u8)?;
                write_coordinates(&look_at.coordinates, w)?;
                w.write_f64::<BigEndian>(look_at.range)?;
                w.write_f64::<BigEndian>(look_at.heading)?;
                w.write_f64::<BigEndian>(look_at.tilt)?;
            }
            TourPrimitive::SoundCue { href, delay } => {
                w.write_u8(2)?;
                write_string(href, w)?;
                w.write_f64::<BigEndian>(*delay)?;
            }
            TourPrimitive::TourControl { play_mode } => {
                w.write_u8(3)?;
                w.write_u8(matches!(play_mode, PlayMode::Play) as u8)?;
            }
        }
    }
    Ok(())
}

fn unpack_playlist<R: Read>(r: &mut R) -> Result<Playlist> {
    let mut playlist = Playlist::new();
    playlist.id = read_string(r)?;
    for _ in 0..r.read_u32::<BigEndian>()? {
        let primitive = match r.read_u8()? {
            0 => TourPrimitive::Wait {
                duration: r.read_f64::<BigEndian>()?,
            },
            1 => {
                let duration = r.read_f64::<BigEndian>()?;
                let mode = if r.read_u8()? != 0 {
                    FlyToMode::Smooth
                } else {
                    FlyToMode::Bounce
                };
                let look_at = LookAt {
                    coordinates: read_coordinates(r)?,
                    range: r.read_f64::<BigEndian>()?,
                    heading: r.read_f64::<BigEndian>()?,
                    tilt: r.read_f64::<BigEndian>()?,
                };
                TourPrimitive::FlyTo {
                    duration,
                    mode,
                    look_at,
                }
            }
            2 => TourPrimitive::SoundCue {
                href: read_string(r)?,
                delay: r.read_f64::<BigEndian>()?,
            },
            3 => TourPrimitive::TourControl {
                play_mode: if r.read_u8()? != 0 {
                    PlayMode::Play
                } else {
                    PlayMode::Pause
                },
            },
            other => return Err(GeoDataError::Pack(format!("unknown primitive {other}"))),
        };
        playlist.add_primitive(primitive);
    }
    Ok(playlist)
}

fn write_coordinates<W: Write>(c: &Coordinates, w: &mut W) -> Result<()> {
    w.write_f64::<BigEndian>(c.lon)?;
    w.write_f64::<BigEndian>(c.lat)?;
    w.write_f64::<BigEndian>(c.alt)?;
    Ok(())
}

fn read_coordinates<R: Read>(r: &mut R) -> Result<Coordinates> {
    let lon = r.read_f64::<BigEndian>()?;
    let lat = r.read_f64::<BigEndian>()?;
    let alt = r.read_f64::<BigEndian>()?;
    Ok(Coordinates::new(lon, lat, alt))
}

fn read_color<R: Read>(r: &mut R) -> Result<Color> {
    Ok(Color::from_u32(r.read_u32::<BigEndian>()?))
}

fn read_hot_spot_units<R: Read>(r: &mut R) -> Result<HotSpotUnits> {
    let value = r.read_u8()?;
    HotSpotUnits::from_u8(value)
        .ok_or_else(|| GeoDataError::Pack(format!("bad hot spot units {value}")))
}

fn read_altitude_mode<R: Read>(r: &mut R) -> Result<AltitudeMode> {
    let value = r.read_u8()?;
    AltitudeMode::from_u8(value)
        .ok_or_else(|| GeoDataError::Pack(format!("bad altitude mode {value}")))
}

fn write_string<W: Write>(s: &str, w: &mut W) -> Result<()> {
    w.write_u32::<BigEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_opt_string<W: Write>(s: Option<&str>, w: &mut W) -> Result<()> {
    match s {
        Some(s) => {
            w.write_u8(1)?;
            write_string(s, w)
        }
        None => Ok(w.write_u8(0)?),
    }
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u32::<BigEndian>()? as usize;
    let mut bytes = Vec::new();
    r.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(GeoDataError::Pack("truncated string".into()));
    }
    String::from_utf8(bytes).map_err(|e| GeoDataError::Pack(e.to_string()))
}

fn read_opt_string<R: Read>(r: &mut R) -> Result<Option<String>> {
    if r.read_u8()? != 0 {
        Ok(Some(read_string(r)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        doc.set_name("sample");
        doc.set_role(DocumentRole::UserObject);
        doc.set_file_name("sample.kml");
        let mut style = Style::with_id("s1");
        style.icon_style.icon_path = "pin.png".into();
        style.list_style.item_type = ListItemType::RadioFolder;
        style.icon_style.hot_spot = HotSpot {
            x: 12.0,
            y: 0.25,
            x_units: HotSpotUnits::InsetPixels,
            y_units: HotSpotUnits::Fraction,
        };
        doc.add_style(style.clone());
        let mut map = StyleMap::with_id("m1");
        map.insert(StyleMap::NORMAL, "#s1");
        doc.add_style_map(map);

        let mut folder = Folder::named("folder");
        let mut p = Placemark::new();
        p.set_name("point");
        p.set_description("<b>bold</b>");
        p.set_coordinate(Coordinates::new(1.5, -2.5, 10.0));
        p.set_visual_category(VisualCategory::Bookmark);
        p.set_style(Some(Arc::new(style)));
        p.extended_data_mut()
            .add_value(Data::new("ele", Variant::Double(12.5)));
        p.extended_data_mut()
            .set_simple_array("hr", vec![Variant::Int(80), Variant::Int(82)]);
        p.data_mut().timestamp = Some(TimeStamp::new("2020-01-01"));
        folder.append(p);

        let mut multi = MultiGeometry::default();
        multi.push(Geometry::LineString(LineString::from_coordinates(vec![
            Coordinates::new(0.0, 0.0, 0.0),
            Coordinates::new(1.0, 1.0, 0.0),
        ])));
        let mut polygon = Polygon::new(LinearRing::from_coordinates(vec![
            Coordinates::new(0.0, 0.0, 0.0),
            Coordinates::new(1.0, 0.0, 0.0),
            Coordinates::new(1.0, 1.0, 0.0),
        ]));
        polygon.inners.push(LinearRing::default());
        multi.push(Geometry::Polygon(polygon));
        let mut track = Track::default();
        track.add_point("2020-01-01T00:00:00Z", Coordinates::new(3.0, 4.0, 5.0));
        multi.push(Geometry::Track(track));
        folder.append(Placemark::with_geometry("multi", Geometry::MultiGeometry(multi)));
        doc.append(folder);

        let mut tour = Tour::new();
        tour.set_name("tour");
        tour.playlist_mut().add_primitive(TourPrimitive::Wait { duration: 2.0 });
        tour.playlist_mut().add_primitive(TourPrimitive::FlyTo {
            duration: 5.0,
            mode: FlyToMode::Smooth,
            look_at: LookAt {
                coordinates: Coordinates::new(7.0, 8.0, 0.0),
                range: 1000.0,
                heading: 0.0,
                tilt: 45.0,
            },
        });
        tour.playlist_mut().add_primitive(TourPrimitive::SoundCue {
            href: "intro.mp3".into(),
            delay: 1.5,
        });
        tour.playlist_mut().add_primitive(TourPrimitive::TourControl {
            play_mode: PlayMode::Play,
        });
        doc.append(tour);
        doc
    }

    #[test]
    fn test_pack_unpack_preserves_tree() {
        let doc = sample_document();
        let bytes = pack_to_bytes(&doc).unwrap();
        let restored = unpack_from_bytes(&bytes).unwrap();
        assert_eq!(restored, doc);
        assert_eq!(restored.style_by_id("s1").unwrap().icon_style.icon_path, "pin.png");
    }

    #[test]
    fn test_track_with_unmatched_times_survives() {
        let mut track = Track::default();
        track.when = vec!["2020-01-01T00:00:00Z".into(), "2020-01-01T00:00:01Z".into()];
        track.coordinates = vec![Coordinates::new(1.0, 2.0, 3.0)];
        let mut doc = Document::new();
        doc.append(Placemark::with_geometry("run", Geometry::Track(track)));

        let restored = unpack_from_bytes(&pack_to_bytes(&doc).unwrap()).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_nesting_limit() {
        let mut geometry = Geometry::Point(Point::new(Coordinates::new(0.0, 0.0, 0.0)));
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            let mut multi = MultiGeometry::default();
            multi.push(geometry);
            geometry = Geometry::MultiGeometry(multi);
        }
        let mut bytes = Vec::new();
        pack_geometry(&geometry, &mut bytes).unwrap();
        assert!(matches!(
            unpack_geometry(&mut bytes.as_slice()),
            Err(GeoDataError::Pack(_))
        ));

        let mut folder = Folder::named("leaf");
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            let mut parent = Folder::new();
            parent.append(folder);
            folder = parent;
        }
        let mut doc = Document::new();
        doc.append(folder);
        let bytes = pack_to_bytes(&doc).unwrap();
        assert!(matches!(unpack_from_bytes(&bytes), Err(GeoDataError::Pack(_))));
    }

    #[test]
    fn test_unpacked_children_are_parented() {
        let bytes = pack_to_bytes(&sample_document()).unwrap();
        let restored = unpack_from_bytes(&bytes).unwrap();
        let folder = restored.child(0).unwrap();
        assert_eq!(folder.parent(), Some(restored.uid()));
        let first = folder.as_container().unwrap().child(0).unwrap();
        assert_eq!(first.parent(), Some(folder.uid()));
    }

    #[test]
    fn test_rejects_bad_magic_and_version() {
        assert!(matches!(
            unpack_from_bytes(b"NOPE\0\x01"),
            Err(GeoDataError::Pack(_))
        ));
        let mut bytes = pack_to_bytes(&Document::new()).unwrap();
        bytes[5] = 9;
        assert!(matches!(unpack_from_bytes(&bytes), Err(GeoDataError::Pack(_))));
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let bytes = pack_to_bytes(&sample_document()).unwrap();
        assert!(unpack_from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }
}
