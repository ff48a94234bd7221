//! Logging configuration.

use log::LevelFilter;

/// Install the process-wide logger. Level comes from `MATHMATE_LOG_LEVEL`,
/// defaulting to `info`; third-party crates stay at `warn`.
pub fn init() -> anyhow::Result<()> {
    let level = resolve_level();
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{:<5}] {}: {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("mathmate_bot", level)
        .level_for("mathmate_core", level)
        .level_for("mathmate_calc", level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn resolve_level() -> LevelFilter {
    match std::env::var("MATHMATE_LOG_LEVEL") {
        Ok(val) => parse_log_level(&val).unwrap_or_else(|| {
            eprintln!(
                "Warning: invalid MATHMATE_LOG_LEVEL '{}', falling back to info",
                val
            );
            LevelFilter::Info
        }),
        Err(_) => LevelFilter::Info,
    }
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}
