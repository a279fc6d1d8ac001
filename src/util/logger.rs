use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Holds the non-blocking writer guards for the lifetime of the process.
pub struct Logger {
    pub guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

impl Logger {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let guards = Self::setup_logging()?;
        Ok(Logger { guards })
    }

    pub fn setup_logging(
    ) -> Result<Vec<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
        std::fs::create_dir_all("logs")?;

        let console_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,startronics_backend=debug"));

        let general_file = rolling::daily("logs", "startronics-backend.log");
        let (non_blocking_general, guard_general) = non_blocking(general_file);

        let error_file = rolling::daily("logs/error", "startronics-backend-error.log");
        let (non_blocking_error, guard_error) = non_blocking(error_file);

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(true)
                    .with_filter(console_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(non_blocking_general)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(EnvFilter::new(
                        std::env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
                    )),
            )
            .with(
                fmt::layer()
                    .with_writer(non_blocking_error)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(EnvFilter::new(
                        std::env::var("ERROR_FILE_LOG_LEVEL").unwrap_or_else(|_| "error".to_string()),
                    )),
            )
            .init();

        Ok(vec![guard_general, guard_error])
    }
}
