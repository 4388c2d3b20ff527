/*!
Logging and profiling integration for Marble tools.

This module exposes a consistent API regardless of whether the profiling
feature is compiled in. There are two implementations:

- real: compiled only when `feature = "profiling"` is set.
  Adds a reloadable tracing-chrome layer next to the fmt layer, so a
  `trace-*.json` file can be recorded for part of a run and opened in Perfetto.
- stub: compiled in all other configurations.
  Logging only; the profiling functions do nothing.

Top-level API (always available):
- `setup_logging_and_profiling()`
- `start_profiling()`
- `stop_profiling() -> Option<PathBuf>`
- `is_profiling_enabled() -> bool`
- `default_log_filter() -> &'static str`
*/

/// `RUST_LOG` used when none is set
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,hyper_util=info,reqwest::connect=info,rustls=info"
    } else {
        "info"
    }
}

fn ensure_rust_log() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            std::env::set_var("RUST_LOG", default_log_filter());
        }
    }
}

#[cfg(feature = "profiling")]
mod inner {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tracing_chrome::{ChromeLayer, FlushGuard};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{Registry, reload};

    /// Register the current thread with the profiling backend.
    ///
    /// Usage:
    ///   register_profiling_thread!("WorkerName");
    #[macro_export]
    macro_rules! register_profiling_thread {
        ($name:literal) => {
            ::profiling::register_thread!($name);
        };
    }

    struct ProfilingState {
        /// Reload handle for the chrome layer
        reload_handle: reload::Handle<Option<ChromeLayer<Registry>>, Registry>,
        /// Flushes the trace file when dropped
        guard: Option<FlushGuard>,
        /// Trace file of the active session
        trace_file: Option<PathBuf>,
    }

    static PROFILING_STATE: Mutex<Option<ProfilingState>> = Mutex::new(None);

    fn with_state<R>(f: impl FnOnce(&mut Option<ProfilingState>) -> R) -> R {
        let mut guard = match PROFILING_STATE.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("Profiling state mutex poisoned; recovering");
                poisoned.into_inner()
            }
        };
        f(&mut guard)
    }

    /// Initialize logging and the reloadable profiling layer.
    ///
    /// Behavior:
    /// - If RUST_LOG is not set, set a default for the build profile.
    /// - If ENABLE_PROFILING is set, start recording right away.
    pub fn setup_logging_and_profiling() {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        super::ensure_rust_log();

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());

        let (reload_layer, reload_handle) = reload::Layer::new(None::<ChromeLayer<Registry>>);
        let registry = tracing_subscriber::registry()
            .with(reload_layer)
            .with(fmt_layer);

        with_state(|state| {
            *state = Some(ProfilingState {
                reload_handle,
                guard: None,
                trace_file: None,
            });
        });

        if let Err(e) = registry.try_init() {
            eprintln!("Logging already initialized: {e}");
            return;
        }
        tracing::debug!("Tracing initialized with reloadable chrome profiling layer");

        if std::env::var("ENABLE_PROFILING").is_ok() {
            tracing::info!("ENABLE_PROFILING set - starting profiling session at startup");
            start_profiling();
        }
    }

    /// Start a profiling session by enabling the chrome layer.
    pub fn start_profiling() {
        with_state(|state| {
            let Some(state) = state.as_mut() else {
                tracing::error!("Profiling state not initialized");
                return;
            };
            if state.trace_file.is_some() {
                tracing::warn!("Profiling already enabled");
                return;
            }

            let millis = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            let trace_file = PathBuf::from(format!("trace-{millis}.json"));
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(&trace_file)
                .include_args(true)
                .build();

            if let Err(e) = state.reload_handle.reload(Some(chrome_layer)) {
                tracing::error!("Failed to enable chrome layer: {:?}", e);
                return;
            }
            state.guard = Some(guard);
            state.trace_file = Some(trace_file);
            tracing::info!("Profiling session started");
        });
    }

    /// Stop profiling and flush the trace; returns the trace file written
    pub fn stop_profiling() -> Option<PathBuf> {
        with_state(|state| {
            let state = state.as_mut()?;
            let Some(trace_file) = state.trace_file.take() else {
                tracing::warn!("Profiling not enabled");
                return None;
            };
            if let Err(e) = state.reload_handle.reload(None::<ChromeLayer<Registry>>) {
                tracing::error!("Failed to disable chrome layer: {:?}", e);
            }
            // dropping the guard flushes
            state.guard = None;

            match std::fs::metadata(&trace_file) {
                Ok(md) => tracing::info!(
                    "Trace written to {} ({} bytes), open it in https://ui.perfetto.dev",
                    trace_file.display(),
                    md.len()
                ),
                Err(e) => tracing::warn!("Trace file {} missing: {}", trace_file.display(), e),
            }
            Some(trace_file)
        })
    }

    pub fn is_profiling_enabled() -> bool {
        with_state(|state| state.as_ref().is_some_and(|s| s.trace_file.is_some()))
    }
}

#[cfg(not(feature = "profiling"))]
mod inner {
    use std::path::PathBuf;
    use tracing_subscriber::prelude::*;

    /// Initialize logging with sensible defaults; profiling is a no-op here.
    pub fn setup_logging_and_profiling() {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        super::ensure_rust_log();

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());
        if let Err(e) = tracing_subscriber::registry().with(fmt_layer).try_init() {
            eprintln!("Logging already initialized: {e}");
            return;
        }

        tracing::debug!("Logging initialized (profiling disabled in this build)");
    }

    pub fn start_profiling() {
        tracing::info!("start_profiling() called but profiling is disabled in this build");
    }

    pub fn stop_profiling() -> Option<PathBuf> {
        tracing::info!("stop_profiling() called but profiling is disabled in this build");
        None
    }

    pub fn is_profiling_enabled() -> bool {
        false
    }
}

// Re-export a stable API surface regardless of which `inner` module was compiled.
pub use inner::{is_profiling_enabled, setup_logging_and_profiling, start_profiling, stop_profiling};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_valid() {
        let filter = default_log_filter();
        assert!(tracing_subscriber::EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn test_profiling_idle_before_start() {
        assert!(!is_profiling_enabled());
        assert!(stop_profiling().is_none());
    }
}
