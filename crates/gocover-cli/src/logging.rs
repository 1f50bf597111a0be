use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging.
///
/// Logs go to stderr, or to `gocover.YYYY-MM-DD` in `log_dir` with daily
/// rotation. The level defaults to `warn` and can be overridden via the
/// `GOCOVER_LOG` or `RUST_LOG` environment variables.
///
/// When logging to a file the returned [`WorkerGuard`] **must** be held for
/// the lifetime of the program so buffered records are flushed on shutdown.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_env("GOCOVER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "gocover");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .with(env_filter)
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(false)
                        .with_target(false),
                )
                .with(env_filter)
                .init();

            None
        }
    }
}
