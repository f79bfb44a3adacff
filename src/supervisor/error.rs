use thiserror::Error;

use crate::config::ConfigError;
use crate::worker::WorkerError;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("unknown program `{0}`")]
    UnknownProgram(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
