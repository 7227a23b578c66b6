//! Logging initialization using the `tracing` ecosystem.
//!
//! Provides:
//! - Console output (colored, human-readable)
//! - File output as JSON lines (daily rotation, non-blocking writer)
//! - Configurable log level via env var `RUST_LOG` or explicit parameter
//!
//! The HTTP client and server stacks are held at `warn` unless `RUST_LOG`
//! says otherwise; at `debug` they drown out the session traces.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose internals are only interesting when asked for explicitly.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls", "tower_http=info"];

/// Keeps the background file writer alive; drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber.
///
/// Should be called once at program start. A second call leaves the first
/// subscriber in place.
///
/// # Parameters
///
/// - `log_level`: default level if `RUST_LOG` env var is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating log files
/// - `module_name`: used as the log file prefix (e.g. `"dx-runner"`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, module_name: &str) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{module_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    LogGuard { _file: guard }
}

/// `"debug"` → `"debug,hyper=warn,...,tower_http=info"`.
fn default_directives(log_level: &str) -> String {
    let mut directives = log_level.trim().to_string();
    for target in QUIET_TARGETS {
        directives.push(',');
        directives.push_str(target);
        if !target.contains('=') {
            directives.push_str("=warn");
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_targets_are_appended() {
        let d = default_directives(" debug ");
        assert!(d.starts_with("debug,"));
        assert!(d.contains("reqwest=warn"));
        assert!(d.contains("tower_http=info"));
        assert!(EnvFilter::try_new(&d).is_ok());
    }

    #[test]
    fn second_init_does_not_panic() {
        let _a = init_logging("info", None, "dx-test");
        let _b = init_logging("info", None, "dx-test");
    }
}
