/// Logger setup shared by the binaries
use log::LevelFilter;

/// `--quiet` keeps warnings and errors, each `-v` adds a level above Info.
/// An explicit RUST_LOG takes precedence over both.
pub fn init(quiet: bool, verbose: u8) {
    let level = if quiet {
        LevelFilter::Warn
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).format_target(false).init();
}
