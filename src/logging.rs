use thiserror::Error;
use tracing::Level;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::PrettyFields;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("init logging error: `{0}`")]
    TryInitError(String),
}

pub struct Logging;

impl Logging {
    /// Installs the global `tracing` subscriber. Honours `WARD_LOG` if set,
    /// falling back to `RUST_LOG`, falling back to `info` when neither is.
    pub fn try_init() -> Result<(), LoggingError> {
        let directive = std::env::var("WARD_LOG").or_else(|_| std::env::var("RUST_LOG"));
        let filter = match directive {
            Ok(directive) => EnvFilter::try_new(directive)
                .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
            Err(_) => EnvFilter::new(LevelFilter::INFO.to_string()),
        };

        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_env_filter(filter)
            .fmt_fields(PrettyFields::new())
            .try_init()
            .map_err(|_| {
                LoggingError::TryInitError("unable to set global logging subscriber".to_string())
            })
    }
}
