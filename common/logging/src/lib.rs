use tracing_subscriber::EnvFilter;

/// Default filter used when neither `RUST_LOG` nor an explicit filter is supplied.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug)]
pub enum Error {
    InvalidFilter(String),
    AlreadyInitialized(String),
}

/// Build the filter for the global subscriber.
///
/// An explicit `filter` takes precedence over `RUST_LOG`.
pub fn build_env_filter(filter: Option<&str>) -> Result<EnvFilter, Error> {
    match filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|e| Error::InvalidFilter(e.to_string()))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Install a global `tracing` subscriber writing to stderr.
pub fn init_tracing(filter: Option<&str>, format: LogFormat) -> Result<(), Error> {
    let env_filter = build_env_filter(filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| Error::AlreadyInitialized(e.to_string()))
}

/// Return a tracing subscriber suitable for test usage.
///
/// By default no logs will be printed, but they can be enabled via
/// the `test_logger` feature.  This feature can be enabled for any
/// dependent crate by passing `--features logging/test_logger`, e.g.
/// ```bash
/// cargo test -p state_processing --features logging/test_logger
/// ```
pub fn create_test_tracing_subscriber() {
    if cfg!(feature = "test_logger") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }
}
