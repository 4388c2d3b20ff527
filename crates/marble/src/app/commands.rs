//! Subcommand implementations
//!
//! Every command works on the [`AppState`] and prints its result to the given writer, so the
//! binary and the tests share one code path.

use crate::app::settings::{BookmarkAction, Command, DatasetArgs};
use crate::app::state::AppState;
use crate::app::AppError;
use marble_entrypoints::async_runtime::Runtime;
use marble_geodata::pack::{pack_to_bytes, unpack_from_bytes};
use marble_geodata::tiles::{DownloadRegion, TileDataset, download_region};
use marble_geodata::utils::EARTH_RADIUS;
use marble_geodata::{
    BookmarkManager, Container, Coordinates, ElevationModel, Feature, GeoDataTreeModel,
    GeoFeature, GeoNode, Geometry, INVALID_ELEVATION_DATA, ItemData, LatLonAltBox, LineString,
    ModelIndex, ObjectUid, Placemark, Point, Role,
};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Run `command`; async work is driven on `runtime`
pub fn execute(
    state: &mut AppState,
    command: Command,
    runtime: &Runtime,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    tracing::debug!(?command, "Executing");
    match command {
        Command::Info { files, depth } => info(state, files, depth, out),
        Command::Convert { input, output } => convert(state, &input, &output, out),
        Command::Pack { input, output } => pack(state, &input, &output, out),
        Command::Unpack { input, output } => unpack(state, &input, &output, out),
        Command::Bookmarks { action } => bookmarks(state, action, out),
        Command::TileStatus {
            dataset,
            level,
            x,
            y,
        } => tile_status(state, &dataset, (level, x, y), runtime, out),
        Command::DownloadRegion {
            dataset,
            bbox,
            track,
            offset,
            min_level,
            max_level,
        } => {
            let area = match (bbox, track) {
                (Some(bbox), _) => Area::Box(bbox),
                (None, Some(track)) => Area::Track { track, offset },
                (None, None) => {
                    return Err(AppError::Usage("Give either --bbox or --track".into()));
                }
            };
            region(state, &dataset, area, (min_level, max_level), runtime, out)
        }
        Command::Elevation { dataset, lon, lat } => {
            elevation(state, &dataset, lon, lat, runtime, out)
        }
        Command::Profile {
            dataset,
            from_lon,
            from_lat,
            to_lon,
            to_lat,
        } => profile(state, &dataset, (from_lon, from_lat), (to_lon, to_lat), runtime, out),
        Command::Recent => recent(state, out),
        Command::Downloads { enabled } => {
            state.preferences.download_enabled = enabled;
            writeln!(
                out,
                "Downloads {}",
                if enabled { "enabled" } else { "disabled" }
            )?;
            Ok(())
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

fn info(
    state: &mut AppState,
    files: Vec<PathBuf>,
    depth: Option<usize>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let (rows, errors) = state.load_files(files);
    for row in &rows {
        print_node(&state.model, &ModelIndex::root().child(*row), 0, depth, out)?;
    }
    for (path, error) in &errors {
        writeln!(out, "{}: {}", path.display(), error)?;
    }
    match errors.into_iter().next() {
        Some((_, error)) if rows.is_empty() => Err(error.into()),
        _ => Ok(()),
    }
}

/// One line per node: indentation, node type, name and, for placemarks, the coordinate
fn print_node(
    model: &GeoDataTreeModel,
    index: &ModelIndex,
    level: usize,
    max_depth: Option<usize>,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let Some(node) = model.object(index) else {
        return Ok(());
    };
    let mut line = format!("{:indent$}{:?}", "", node.node_type(), indent = level * 2);
    if let Some(ItemData::Text(name)) = model.data(index, Role::Display)
        && !name.is_empty()
    {
        line.push_str(&format!(" {name:?}"));
    }
    if let Some(ItemData::Coordinates(c)) = model.data(index, Role::Coordinate) {
        line.push_str(&format!(" [{}]", c.to_decimal_string().trim()));
    }
    writeln!(out, "{line}")?;

    if max_depth.is_none_or(|d| level < d) {
        for row in 0..model.row_count(index) {
            if let Some(child) = model.index(row, index) {
                print_node(model, &child, level + 1, max_depth, out)?;
            }
        }
    }
    Ok(())
}

fn convert(
    state: &mut AppState,
    input: &Path,
    output: &Path,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let document = state.registry.parse_file(input)?;
    state.remember_recent(input);
    state.registry.write_file(&document, output)?;
    writeln!(out, "Wrote {} features to {}", document.size(), output.display())?;
    Ok(())
}

fn pack(
    state: &mut AppState,
    input: &Path,
    output: &Path,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let document = state.registry.parse_file(input)?;
    state.remember_recent(input);
    let bytes = pack_to_bytes(&document)?;
    std::fs::write(output, &bytes)?;
    writeln!(
        out,
        "Packed {} features into {} ({} bytes)",
        document.size(),
        output.display(),
        bytes.len()
    )?;
    Ok(())
}

fn unpack(
    state: &mut AppState,
    input: &Path,
    output: &Path,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let document = unpack_from_bytes(&std::fs::read(input)?)?;
    state.registry.write_file(&document, output)?;
    writeln!(out, "Unpacked {} features to {}", document.size(), output.display())?;
    Ok(())
}

fn recent(state: &AppState, out: &mut dyn Write) -> Result<(), AppError> {
    let preferences = &state.preferences;
    if preferences.recent_files.is_empty() {
        writeln!(out, "No recent files")?;
    }
    for (i, path) in preferences.recent_files.iter().enumerate() {
        writeln!(out, "{:2}. {}", i + 1, path.display())?;
    }
    writeln!(
        out,
        "Downloads: {}",
        if preferences.download_enabled { "enabled" } else { "disabled" }
    )?;
    if let Some(dataset) = &preferences.last_dataset {
        writeln!(out, "Last dataset: {}", dataset.display())?;
    }
    Ok(())
}

// ============================================================================
// Bookmarks
// ============================================================================

fn folder_uid(manager: &BookmarkManager, model: &GeoDataTreeModel, name: &str) -> Option<ObjectUid> {
    manager
        .folders(model)
        .into_iter()
        .find(|f| f.name() == name)
        .map(GeoFeature::uid)
}

fn bookmark_uid(manager: &BookmarkManager, model: &GeoDataTreeModel, name: &str) -> Option<ObjectUid> {
    manager
        .folders(model)
        .into_iter()
        .flat_map(|f| f.placemarks())
        .find(|p| p.name() == name)
        .map(GeoFeature::uid)
}

fn bookmarks(state: &mut AppState, action: BookmarkAction, out: &mut dyn Write) -> Result<(), AppError> {
    let (manager, model) = state.bookmarks()?;
    let unknown_folder = |name: &str| AppError::Usage(format!("No bookmark folder named {name:?}"));

    match action {
        BookmarkAction::List => {
            for folder in manager.folders(model) {
                writeln!(out, "{}", folder.name())?;
                for placemark in folder.placemarks() {
                    writeln!(
                        out,
                        "  {}  [{}]",
                        placemark.name(),
                        placemark.coordinate().to_decimal_string().trim()
                    )?;
                }
            }
        }
        BookmarkAction::Add {
            lon,
            lat,
            name,
            folder,
        } => {
            let container = match folder_uid(manager, model, &folder) {
                Some(uid) => uid,
                None => {
                    let document = manager
                        .document_uid()
                        .ok_or_else(|| AppError::Usage("Bookmarks are not loaded".into()))?;
                    manager
                        .add_new_bookmark_folder(model, document, &folder)?
                        .ok_or_else(|| unknown_folder(&folder))?
                }
            };
            let placemark = Placemark::with_geometry(
                name.unwrap_or_default(),
                Geometry::Point(Point::new(Coordinates::new(lon, lat, 0.0))),
            );
            manager
                .add_bookmark(model, container, &placemark)?
                .ok_or_else(|| unknown_folder(&folder))?;
            writeln!(out, "Bookmark added to {folder}")?;
        }
        BookmarkAction::Remove { name } => {
            let uid = bookmark_uid(manager, model, &name)
                .ok_or_else(|| AppError::Usage(format!("No bookmark named {name:?}")))?;
            manager.remove_bookmark(model, uid)?;
            writeln!(out, "Removed bookmark {name}")?;
        }
        BookmarkAction::AddFolder { name } => {
            let document = manager
                .document_uid()
                .ok_or_else(|| AppError::Usage("Bookmarks are not loaded".into()))?;
            if manager.add_new_bookmark_folder(model, document, &name)?.is_none() {
                return Err(AppError::Usage(format!(
                    "Folder {name:?} already exists or has no name"
                )));
            }
            writeln!(out, "Added folder {name}")?;
        }
        BookmarkAction::RenameFolder { from, to } => {
            let uid = folder_uid(manager, model, &from).ok_or_else(|| unknown_folder(&from))?;
            manager.rename_bookmark_folder(model, uid, &to)?;
            writeln!(out, "Renamed folder {from} to {to}")?;
        }
        BookmarkAction::RemoveFolder { name } => {
            let uid = folder_uid(manager, model, &name).ok_or_else(|| unknown_folder(&name))?;
            manager.remove_bookmark_folder(model, uid)?;
            manager.ensure_default_folder(model)?;
            writeln!(out, "Removed folder {name}")?;
        }
        BookmarkAction::Clear => {
            manager.remove_all_bookmarks(model)?;
            writeln!(out, "Removed all bookmarks")?;
        }
    }
    Ok(())
}

// ============================================================================
// Tiles
// ============================================================================

fn tile_status(
    state: &mut AppState,
    dataset: &DatasetArgs,
    (level, x, y): (u32, u32, u32),
    runtime: &Runtime,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let dataset = state.load_dataset(&dataset.dataset)?;
    let (columns, rows) = (dataset.tile_column_count(level), dataset.tile_row_count(level));
    if x >= columns || y >= rows {
        return Err(AppError::Usage(format!(
            "Tile {x}/{y} outside the {columns}x{rows} tiles of level {level}"
        )));
    }
    let loader = state.tile_loader(runtime.handle().clone())?;
    let id = dataset.tile_id(level, x, y);

    writeln!(out, "{id}: {:?}", loader.tile_status(&dataset, &id))?;
    writeln!(out, "File: {}", loader.tile_file_name(&dataset, &id).display())?;
    match dataset.download_url(&id) {
        Ok(url) => writeln!(out, "Url: {url}")?,
        Err(e) => writeln!(out, "Url: none ({e})")?,
    }
    writeln!(out, "Maximum level: {}", loader.maximum_tile_level(&dataset))?;
    Ok(())
}

enum Area {
    /// North, south, east, west in degrees
    Box(Vec<f64>),
    Track { track: PathBuf, offset: f64 },
}

/// First line found in a depth-first walk over the placemarks
fn first_line_string(container: &Container) -> Option<LineString> {
    container.iter().find_map(|feature| match feature {
        Feature::Placemark(placemark) => line_of(placemark.geometry()),
        other => other.as_container().and_then(first_line_string),
    })
}

fn line_of(geometry: &Geometry) -> Option<LineString> {
    match geometry {
        Geometry::LineString(line) => Some(line.clone()),
        Geometry::LinearRing(ring) => Some(ring.0.clone()),
        Geometry::Track(track) => Some(track.line_string()),
        Geometry::MultiGeometry(multi) => (0..multi.len()).find_map(|i| multi.child(i).and_then(line_of)),
        Geometry::Point(_) | Geometry::Polygon(_) => None,
    }
}

fn region(
    state: &mut AppState,
    dataset: &DatasetArgs,
    area: Area,
    (min_level, max_level): (u32, u32),
    runtime: &Runtime,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    if min_level > max_level {
        return Err(AppError::Usage(format!(
            "Minimum level {min_level} is above the maximum level {max_level}"
        )));
    }
    let dataset = state.load_dataset(&dataset.dataset)?;
    let region = DownloadRegion::new(min_level, max_level, max_level);

    let pyramids = match area {
        Area::Box(bbox) => {
            let &[north, south, east, west] = bbox.as_slice() else {
                return Err(AppError::Usage("--bbox takes NORTH SOUTH EAST WEST".into()));
            };
            region.region(&dataset, &LatLonAltBox::new(north, south, east, west))
        }
        Area::Track { track, offset } => {
            let document = state.registry.parse_file(&track)?;
            let line = first_line_string(&document)
                .ok_or_else(|| AppError::Usage(format!("{} holds no line", track.display())))?;
            region.from_path(&dataset, offset, &line, EARTH_RADIUS)
        }
    };

    let mut loader = state.tile_loader(runtime.handle().clone())?;
    let requested = download_region(&mut loader, &dataset, &pyramids);
    let queued = loader.download_manager().pending_jobs();
    writeln!(out, "Requested {requested} tiles, {queued} queued for download")?;
    if queued == 0 {
        return Ok(());
    }

    let downloaded = runtime.block_on(async {
        let mut downloaded = 0;
        while !loader.download_manager().is_idle() {
            downloaded += loader.wait_for_downloads().await.len();
        }
        downloaded
    });
    writeln!(out, "Downloaded {downloaded} tiles")?;
    Ok(())
}

// ============================================================================
// Elevation
// ============================================================================

fn elevation_model(
    state: &mut AppState,
    dataset: &DatasetArgs,
    runtime: &Runtime,
) -> Result<ElevationModel, AppError> {
    let dataset: TileDataset = state.load_dataset(&dataset.dataset)?;
    let loader = state.tile_loader(runtime.handle().clone())?;
    Ok(ElevationModel::new(loader, Some(dataset)))
}

/// Answer `query`; when it queued downloads, wait for them and ask once more
fn settled<T>(
    runtime: &Runtime,
    model: &mut ElevationModel,
    mut query: impl FnMut(&mut ElevationModel) -> T,
) -> T {
    let value = query(model);
    if model.loader().download_manager().is_idle() {
        return value;
    }
    runtime.block_on(async {
        while !model.loader().download_manager().is_idle() {
            model.wait_for_update().await;
        }
    });
    query(model)
}

fn elevation(
    state: &mut AppState,
    dataset: &DatasetArgs,
    lon: f64,
    lat: f64,
    runtime: &Runtime,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let mut model = elevation_model(state, dataset, runtime)?;
    let height = settled(runtime, &mut model, |m| m.height(lon, lat));
    if height == INVALID_ELEVATION_DATA {
        writeln!(out, "No elevation data at {lon}, {lat}")?;
    } else {
        writeln!(out, "{height:.1} m")?;
    }
    Ok(())
}

fn profile(
    state: &mut AppState,
    dataset: &DatasetArgs,
    (from_lon, from_lat): (f64, f64),
    (to_lon, to_lat): (f64, f64),
    runtime: &Runtime,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let mut model = elevation_model(state, dataset, runtime)?;
    let points = settled(runtime, &mut model, |m| {
        m.height_profile(from_lon, from_lat, to_lon, to_lat)
    });
    for point in &points {
        writeln!(out, "{:.6} {:.6} {:.1}", point.lon, point.lat, point.alt)?;
    }
    tracing::info!(samples = points.len(), "Height profile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::tests::settings_in;
    use image::{Rgba, RgbaImage};
    use marble_entrypoints::async_runtime::build_runtime;

    const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Trip</name>
    <Folder>
      <name>Stops</name>
      <Placemark>
        <name>Berlin</name>
        <Point><coordinates>13.4,52.5,0</coordinates></Point>
      </Placemark>
    </Folder>
    <Placemark>
      <name>Route</name>
      <LineString><coordinates>13.4,52.5 11.6,48.1</coordinates></LineString>
    </Placemark>
  </Document>
</kml>"#;

    struct Fixture {
        dir: tempfile::TempDir,
        state: AppState,
        runtime: Runtime,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let state = AppState::new(&settings_in(dir.path(), &["--offline"])).unwrap();
            Self {
                dir,
                state,
                runtime: build_runtime().unwrap(),
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn run(&mut self, command: Command) -> Result<String, AppError> {
            let mut out = Vec::new();
            execute(&mut self.state, command, &self.runtime, &mut out)?;
            Ok(String::from_utf8(out).unwrap())
        }

        fn bookmarks(&mut self, action: BookmarkAction) -> String {
            self.run(Command::Bookmarks { action }).unwrap()
        }

        /// 2x1 level zero tiles of 4x4 pixels, every sample `height` meters
        fn elevation_dataset(&self, height: i16) -> DatasetArgs {
            let path = self.path("srtm.json");
            std::fs::write(
                &path,
                r#"{"name": "SRTM", "sourceDir": "earth/srtm", "tileSize": [4, 4], "maximumTileLevel": 0}"#,
            )
            .unwrap();
            let dataset = TileDataset::from_json_file(&path).unwrap();
            let [high, low] = height.to_be_bytes();
            let tile = RgbaImage::from_pixel(4, 4, Rgba([0, high, low, 255]));
            for x in 0..2 {
                let file = self
                    .state
                    .cache_dir()
                    .join(dataset.relative_tile_file_name(&dataset.tile_id(0, x, 0)));
                std::fs::create_dir_all(file.parent().unwrap()).unwrap();
                tile.save(&file).unwrap();
            }
            DatasetArgs { dataset: path }
        }
    }

    #[test]
    fn test_info_prints_tree() {
        let mut fx = Fixture::new();
        let kml = fx.path("trip.kml");
        std::fs::write(&kml, KML).unwrap();

        let output = fx
            .run(Command::Info {
                files: vec![kml.clone()],
                depth: None,
            })
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Document \"Trip\"");
        assert_eq!(lines[1], "  Folder \"Stops\"");
        assert!(lines[2].starts_with("    Placemark \"Berlin\" [13.400°E"));
        assert!(lines[3].starts_with("  Placemark \"Route\""));
        assert_eq!(lines.len(), 4);

        let shallow = fx
            .run(Command::Info {
                files: vec![kml],
                depth: Some(1),
            })
            .unwrap();
        assert!(!shallow.contains("Berlin"));
        assert!(shallow.contains("Route"));
    }

    #[test]
    fn test_info_fails_when_nothing_loads() {
        let mut fx = Fixture::new();
        let result = fx.run(Command::Info {
            files: vec![fx.path("missing.kml")],
            depth: None,
        });
        assert!(matches!(result, Err(AppError::GeoData(_))));
    }

    #[test]
    fn test_pack_unpack_convert() {
        let mut fx = Fixture::new();
        let kml = fx.path("trip.kml");
        std::fs::write(&kml, KML).unwrap();

        let packed = fx.path("trip.pack");
        let output = fx
            .run(Command::Pack {
                input: kml.clone(),
                output: packed.clone(),
            })
            .unwrap();
        assert!(output.starts_with("Packed 2 features"));

        let restored = fx.path("restored.kml");
        fx.run(Command::Unpack {
            input: packed,
            output: restored.clone(),
        })
        .unwrap();
        let document = fx.state.registry.parse_file(&restored).unwrap();
        assert_eq!(document.name(), "Trip");
        assert_eq!(document.size(), 2);

        let gpx_out = fx.run(Command::Convert {
            input: kml,
            output: fx.path("trip.gpx"),
        });
        assert!(matches!(
            gpx_out,
            Err(AppError::GeoData(marble_geodata::GeoDataError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn test_bookmark_lifecycle() {
        let mut fx = Fixture::new();
        fx.bookmarks(BookmarkAction::Add {
            lon: 13.4,
            lat: 52.5,
            name: Some("Berlin".into()),
            folder: "Default".into(),
        });
        fx.bookmarks(BookmarkAction::Add {
            lon: 2.35,
            lat: 48.85,
            name: None,
            folder: "Trips".into(),
        });

        let listing = fx.bookmarks(BookmarkAction::List);
        assert!(listing.contains("Default\n  Berlin"));
        assert!(listing.contains("Trips\n"));

        fx.bookmarks(BookmarkAction::RenameFolder {
            from: "Trips".into(),
            to: "Holidays".into(),
        });
        fx.bookmarks(BookmarkAction::Remove {
            name: "Berlin".into(),
        });
        let listing = fx.bookmarks(BookmarkAction::List);
        assert!(!listing.contains("Berlin"));
        assert!(listing.contains("Holidays"));

        let duplicate = fx.run(Command::Bookmarks {
            action: BookmarkAction::AddFolder {
                name: "Holidays".into(),
            },
        });
        assert!(matches!(duplicate, Err(AppError::Usage(_))));

        fx.bookmarks(BookmarkAction::Clear);
        assert_eq!(fx.bookmarks(BookmarkAction::List), "Default\n");
    }

    #[test]
    fn test_remove_last_folder_recreates_default() {
        let mut fx = Fixture::new();
        fx.bookmarks(BookmarkAction::RemoveFolder {
            name: "Default".into(),
        });
        assert_eq!(fx.bookmarks(BookmarkAction::List), "Default\n");
    }

    #[test]
    fn test_tile_status() {
        let mut fx = Fixture::new();
        let dataset = fx.elevation_dataset(100);
        let output = fx
            .run(Command::TileStatus {
                dataset: dataset.clone(),
                level: 0,
                x: 1,
                y: 0,
            })
            .unwrap();
        assert!(output.starts_with("earth/srtm:0:1:0: Available"));
        assert!(output.contains("Maximum level: 0"));

        let missing = fx
            .run(Command::TileStatus {
                dataset: dataset.clone(),
                level: 1,
                x: 0,
                y: 0,
            })
            .unwrap();
        assert!(missing.contains("Missing"));

        let outside = fx.run(Command::TileStatus {
            dataset,
            level: 0,
            x: 2,
            y: 0,
        });
        assert!(matches!(outside, Err(AppError::Usage(_))));
        assert!(fx.state.preferences.last_dataset.is_some());
    }

    #[test]
    fn test_elevation_and_profile() {
        let mut fx = Fixture::new();
        let dataset = fx.elevation_dataset(-42);
        let output = fx
            .run(Command::Elevation {
                dataset: dataset.clone(),
                lon: 10.0,
                lat: 10.0,
            })
            .unwrap();
        assert_eq!(output, "-42.0 m\n");

        let profile = fx
            .run(Command::Profile {
                dataset,
                from_lon: 0.0,
                from_lat: 0.0,
                to_lon: 90.0,
                to_lat: 0.0,
            })
            .unwrap();
        assert!(profile.lines().count() > 1);
        assert!(profile.lines().all(|l| l.ends_with(" -42.0")));
    }

    #[test]
    fn test_download_region_offline_queues_nothing() {
        let mut fx = Fixture::new();
        let dataset = fx.elevation_dataset(0);
        let output = fx
            .run(Command::DownloadRegion {
                dataset,
                bbox: Some(vec![10.0, -10.0, 10.0, -10.0]),
                track: None,
                offset: 500.0,
                min_level: 0,
                max_level: 1,
            })
            .unwrap();
        assert!(output.starts_with("Requested "));
        assert!(output.ends_with("0 queued for download\n"));
    }

    #[test]
    fn test_download_region_needs_an_area() {
        let mut fx = Fixture::new();
        let dataset = fx.elevation_dataset(0);
        let result = fx.run(Command::DownloadRegion {
            dataset,
            bbox: None,
            track: None,
            offset: 500.0,
            min_level: 0,
            max_level: 1,
        });
        assert!(matches!(result, Err(AppError::Usage(_))));
    }

    #[test]
    fn test_first_line_string_searches_folders() {
        let document = marble_geodata::kml::parse_kml(KML).unwrap();
        let line = first_line_string(&document).unwrap();
        assert_eq!(line.len(), 2);
        assert_eq!(line.coordinates[1], Coordinates::new(11.6, 48.1, 0.0));
    }

    #[test]
    fn test_recent_and_downloads() {
        let mut fx = Fixture::new();
        assert!(fx.run(Command::Recent).unwrap().starts_with("No recent files"));
        fx.run(Command::Downloads { enabled: false }).unwrap();
        assert!(fx.run(Command::Recent).unwrap().contains("Downloads: disabled"));
    }
}
