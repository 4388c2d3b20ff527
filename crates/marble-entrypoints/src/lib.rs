//! Entry point helpers shared by Marble command-line tools
//!
//! This crate provides the process-level plumbing every tool needs before it touches map data:
//! argument parsing, logging with optional Chrome-trace profiling, build metadata and the tokio
//! runtime that drives tile downloads.
//!
//! # Usage
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     marble_entrypoints::setup_logging_and_profiling();
//!     marble_entrypoints::log_version_info();
//!     let settings: MySettings = match marble_entrypoints::parse_args() {
//!         Ok(settings) => settings,
//!         Err(e) => e.exit(),
//!     };
//!     let runtime = marble_entrypoints::async_runtime::build_runtime()?;
//!     // ...
//! }
//! ```

pub mod async_runtime;
pub mod cli;
pub mod profiling;

// Re-export commonly used items
pub use cli::{get_env, parse_args, parse_args_from};
pub use profiling::{
    is_profiling_enabled, setup_logging_and_profiling, start_profiling, stop_profiling,
};

mod metadata;
pub use metadata::{log_version_info, short_version_info};
