use clap::{Args, Parser, Subcommand};
use marble_entrypoints::parse_args;
use marble_geodata::tiles::MAX_TILE_LEVEL;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Marble - inspect and convert geodata, manage bookmarks, download map tiles and query elevation
pub struct Settings {
    /// Directory holding bookmarks and map data [default: $HOME/.local/share/marble]
    #[clap(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory tiles are cached in [default: the data directory]
    #[clap(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Persisted state file [default: $HOME/.config/marble/storage.json]
    #[clap(long, value_name = "FILE")]
    pub storage_file: Option<PathBuf>,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,

    /// Never download; work from the cache only
    #[clap(long, default_value = "false")]
    pub offline: bool,

    /// Record a Chrome trace of this run (needs the profiling feature)
    #[clap(long, default_value = "false")]
    pub trace: bool,

    #[clap(subcommand)]
    pub command: Command,
}

/// Tile dataset selection shared by the tile commands
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Tile dataset description (JSON)
    #[clap(long, value_name = "FILE")]
    pub dataset: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the feature tree of KML or GPX files
    Info {
        #[clap(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Deepest tree level printed
        #[clap(long)]
        depth: Option<usize>,
    },

    /// Convert a document; the output format follows the file extension
    Convert { input: PathBuf, output: PathBuf },

    /// Store a document in the binary pack format
    Pack { input: PathBuf, output: PathBuf },

    /// Read a pack file and write it in the format of the output extension
    Unpack { input: PathBuf, output: PathBuf },

    /// Manage bookmarks
    Bookmarks {
        #[clap(subcommand)]
        action: BookmarkAction,
    },

    /// Show the cache status of one tile
    TileStatus {
        #[clap(flatten)]
        dataset: DatasetArgs,
        #[clap(value_parser = level_parser())]
        level: u32,
        x: u32,
        y: u32,
    },

    /// Download every tile covering a box or a track
    #[clap(allow_negative_numbers = true)]
    DownloadRegion {
        #[clap(flatten)]
        dataset: DatasetArgs,

        /// Box as NORTH SOUTH EAST WEST in degrees
        #[clap(long, num_args = 4, value_names = ["NORTH", "SOUTH", "EAST", "WEST"], conflicts_with = "track")]
        bbox: Option<Vec<f64>>,

        /// KML or GPX file whose first line is followed
        #[clap(long, value_name = "FILE")]
        track: Option<PathBuf>,

        /// Distance around the track to cover, in meters
        #[clap(long, default_value = "500")]
        offset: f64,

        #[clap(long, default_value = "0", value_parser = level_parser())]
        min_level: u32,

        #[clap(long, value_parser = level_parser())]
        max_level: u32,
    },

    /// Terrain height at a position
    #[clap(allow_negative_numbers = true)]
    Elevation {
        #[clap(flatten)]
        dataset: DatasetArgs,
        lon: f64,
        lat: f64,
    },

    /// Terrain heights along the line between two positions
    #[clap(allow_negative_numbers = true)]
    Profile {
        #[clap(flatten)]
        dataset: DatasetArgs,
        from_lon: f64,
        from_lat: f64,
        to_lon: f64,
        to_lat: f64,
    },

    /// List recently opened files and stored preferences
    Recent,

    /// Enable or disable downloads for future runs
    Downloads {
        #[clap(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BookmarkAction {
    /// Print all bookmark folders and bookmarks
    List,

    /// Bookmark a position
    #[clap(allow_negative_numbers = true)]
    Add {
        lon: f64,
        lat: f64,

        /// Defaults to the coordinate
        #[clap(long)]
        name: Option<String>,

        #[clap(long, default_value = marble_geodata::DEFAULT_FOLDER_NAME)]
        folder: String,
    },

    /// Remove the bookmark with this name
    Remove { name: String },

    AddFolder { name: String },

    RenameFolder { from: String, to: String },

    /// Remove a folder with all its bookmarks
    RemoveFolder { name: String },

    /// Remove every bookmark and folder
    Clear,
}

fn level_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=i64::from(MAX_TILE_LEVEL))
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match parse_args::<Settings>() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_and_subcommand() {
        let settings = Settings::parse_from([
            "marble",
            "--data-dir",
            "/tmp/marble",
            "--offline",
            "info",
            "a.kml",
            "b.gpx",
        ]);
        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/marble")));
        assert!(settings.offline);
        assert!(!settings.ignore_persisted);
        let Command::Info { files, depth } = settings.command else {
            panic!("expected info");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(depth, None);
    }

    #[test]
    fn test_negative_coordinates() {
        let settings = Settings::parse_from([
            "marble",
            "elevation",
            "--dataset",
            "srtm.json",
            "-70.5",
            "-33.4",
        ]);
        let Command::Elevation { lon, lat, dataset } = settings.command else {
            panic!("expected elevation");
        };
        assert_eq!((lon, lat), (-70.5, -33.4));
        assert_eq!(dataset.dataset, PathBuf::from("srtm.json"));
    }

    #[test]
    fn test_bookmark_add_defaults_to_default_folder() {
        let settings = Settings::parse_from(["marble", "bookmarks", "add", "13.4", "52.5"]);
        let Command::Bookmarks {
            action: BookmarkAction::Add { folder, name, .. },
        } = settings.command
        else {
            panic!("expected bookmarks add");
        };
        assert_eq!(folder, "Default");
        assert_eq!(name, None);
    }

    #[test]
    fn test_download_region_bbox() {
        let settings = Settings::parse_from([
            "marble",
            "download-region",
            "--dataset",
            "osm.json",
            "--bbox",
            "53",
            "52",
            "14",
            "-13",
            "--max-level",
            "5",
        ]);
        let Command::DownloadRegion { bbox, track, max_level, min_level, .. } = settings.command else {
            panic!("expected download-region");
        };
        assert_eq!(bbox, Some(vec![53.0, 52.0, 14.0, -13.0]));
        assert!(track.is_none());
        assert_eq!((min_level, max_level), (0, 5));
    }

    #[test]
    fn test_tile_levels_are_range_checked() {
        let too_deep = Settings::try_parse_from([
            "marble", "tile-status", "--dataset", "osm.json", "40", "0", "0",
        ]);
        assert!(too_deep.is_err());
        let too_deep = Settings::try_parse_from([
            "marble", "download-region", "--dataset", "osm.json", "--bbox", "1", "0", "1", "0",
            "--max-level", "31",
        ]);
        assert!(too_deep.is_err());
        assert!(
            Settings::try_parse_from([
                "marble", "tile-status", "--dataset", "osm.json", "30", "0", "0",
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Settings::try_parse_from(["marble"]).is_err());
    }
}
