//! Marble - command-line front end of the Marble geodata core
//!
//! Loads KML and GPX documents into the tree model, converts and packs them, manages the
//! bookmark file, downloads map tiles for regions and tracks, and answers elevation queries.
//!
//! The binary only sets up logging and hands the parsed [`Settings`] to [`run`].

mod app;

pub use app::commands::execute;
pub use app::{
    AppError, AppState, BookmarkAction, Command, DatasetArgs, MAX_RECENT_FILES, Preferences,
    Settings, run,
};
pub use app::storage::StorageError;
