use std::error::Error;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Initializes the global logger from the `-v` count.
///
/// Everything outside this crate stays silenced.
pub fn init(verbosity: usize) -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level("bam", level_for(verbosity))
        .with_utc_timestamps()
        .init()?;

    Ok(())
}

/// Info by default, debug at `-v`, trace beyond that.
fn level_for(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
