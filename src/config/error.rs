use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate program name `{0}` in configuration")]
    DuplicateProgram(String),

    #[error("program `{program}` declares unknown user `{user}`")]
    UnknownUser { program: String, user: String },

    #[error("program `{program}` declares unknown group `{group}`")]
    UnknownGroup { program: String, group: String },

    #[error("program `{program}` declares non-existent working directory `{path}`")]
    MissingWorkingDir { program: String, path: String },
}
