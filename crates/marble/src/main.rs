use marble::Settings;
use std::process::ExitCode;

fn main() -> ExitCode {
    marble_entrypoints::setup_logging_and_profiling();
    marble_entrypoints::log_version_info();

    let settings = Settings::from_cli();
    match marble::run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
