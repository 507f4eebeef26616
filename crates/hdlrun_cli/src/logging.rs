//! Logger installation.
//!
//! Operational messages (commands run, resolution decisions, staging) go
//! through the `log` facade and are dispatched to stderr by `fern`.
//! Diagnostics are rendered separately, so their log mirror stays quiet
//! unless `--verbose` is given.

use log::LevelFilter;

use crate::GlobalArgs;

/// Returns the level for hdlrun's own log records.
pub fn level(global: &GlobalArgs) -> LevelFilter {
    if global.quiet {
        LevelFilter::Error
    } else if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Installs the global logger.
pub fn init(global: &GlobalArgs) -> Result<(), log::SetLoggerError> {
    let diagnostics = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Off
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level(global))
        .level_for("hdlrun_diagnostics", diagnostics)
        .chain(std::io::stderr())
        .apply()
}
