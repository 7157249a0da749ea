//! Logging setup and structured debug metrics for the writer.
//!
//! The `log_metric!` macro is compiled out of release builds entirely; the
//! `#[cfg(debug_assertions)]` gate means the calls cost nothing in production.

use crate::error::OutputError;
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use evstore::log_metric;
/// let events = 4;
/// log_metric!("event"="file_closed", "reason"="MaxEvents", "events"=&events);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            log::debug!("EVSTORE_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend once per process. Later calls are no-ops.
/// With `log_file` set, log lines are appended to that file instead of stderr.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), OutputError> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}

/// Routes log output through the test harness so it only shows for failing tests.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .try_init();
}
