use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("unknown user `{0}`")]
    UnknownUser(String),

    #[error("unknown group `{0}`")]
    UnknownGroup(String),

    #[error("invalid umask `{0}`")]
    InvalidUmask(String),

    #[error("invalid stop signal `{0}`")]
    InvalidSignal(String),

    #[error("program has no command to run")]
    EmptyCommand,

    #[error("could not open log file `{path}`: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("signal error: {0}")]
    Signal(#[from] nix::errno::Errno),
}
