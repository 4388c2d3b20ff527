use clap::Parser;
use std::ffi::OsString;

/// Generic function to get environment variable, parsing it to the desired type.
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Parses the process command line arguments.
pub fn parse_args<T: Parser>() -> Result<T, clap::Error> {
    T::try_parse()
}

/// Parses `args` as if they were the command line, program name first.
///
/// Arguments given through the `MARBLE_ARGS` environment variable (whitespace separated) are
/// appended, so wrappers can inject flags without editing the invocation.
pub fn parse_args_from<T, I, S>(args: I) -> Result<T, clap::Error>
where
    T: Parser,
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if let Some(extra) = get_env::<String>("MARBLE_ARGS") {
        args.extend(extra.split_whitespace().map(OsString::from));
    }
    T::try_parse_from(args)
}
