//! Stderr logging for the lasershot crates and CLI.
//!
//! Lines look like `+   1.234s WARN  lasershot_calib::store: message`, with
//! the time measured from logger installation. Setting `LASERSHOT_LOG` to a
//! level name (`error` .. `trace`, or `off`) overrides the level chosen by the
//! caller; with the `tracing` feature it is read as an `EnvFilter` directive.

use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the log level.
pub const LOG_LEVEL_ENV: &str = "LASERSHOT_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

fn format_line(elapsed: Duration, record: &Record<'_>) -> String {
    format!(
        "+{:>8.3}s {:<5} {}: {}",
        elapsed.as_secs_f64(),
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(self.started.elapsed(), record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

fn level_from_env() -> Option<LevelFilter> {
    std::env::var(LOG_LEVEL_ENV).ok()?.trim().parse().ok()
}

/// Install the stderr logger at `level` (or the `LASERSHOT_LOG` level).
///
/// Only the first call has an effect.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let level = level_from_env().unwrap_or(level);
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber with span-close events, plain or JSON.
///
/// `log` records are forwarded to it. The filter comes from `LASERSHOT_LOG`
/// and defaults to `info`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
