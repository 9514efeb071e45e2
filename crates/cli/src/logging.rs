//! Stderr logger behind the `log` facade.
//!
//! Level comes from `-v`/`-q`, else `FAIRWAYS_LOG` (`error`..`trace`),
//! else `warn`.

use log::{Level, LevelFilter, Log, Metadata, Record};

pub const LOG_ENV: &str = "FAIRWAYS_LOG";

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        if self.level >= LevelFilter::Debug {
            eprintln!("[{tag} {}] {}", record.target(), record.args());
        } else {
            eprintln!("[{tag}] {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Resolve the level from flag counts and the environment value.
pub fn level_for(verbose: u8, quiet: bool, env: Option<&str>) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => env
            .and_then(|v| v.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(verbose: u8, quiet: bool) {
    let env = std::env::var(LOG_ENV).ok();
    let level = level_for(verbose, quiet, env.as_deref());
    // A second init (tests) keeps the first logger
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}
