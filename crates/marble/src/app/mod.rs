//! Application module
//!
//! - [`Settings`]: command line, parsed with clap
//! - [`AppState`]: tree model, parser registry and persisted preferences
//! - [`commands`]: one function per subcommand, printing to any writer
//! - [`storage`]: the JSON key/value file preferences are kept in

pub mod commands;
pub(crate) mod settings;
pub(crate) mod state;
pub(crate) mod storage;

pub use settings::{BookmarkAction, Command, DatasetArgs, Settings};
pub use state::{AppState, MAX_RECENT_FILES, Preferences};

use marble_entrypoints::async_runtime::build_runtime;
use marble_geodata::GeoDataError;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    GeoData(#[from] GeoDataError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}

/// Run one command line invocation to completion
///
/// Preferences are saved even when the command fails.
pub fn run(settings: Settings) -> Result<(), AppError> {
    if settings.trace {
        marble_entrypoints::start_profiling();
    }

    let mut state = AppState::new(&settings)?;
    let runtime = build_runtime()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = commands::execute(&mut state, settings.command, &runtime, &mut out);
    let saved = state.save();

    if settings.trace {
        marble_entrypoints::stop_profiling();
    }
    result?;
    saved?;
    Ok(())
}
