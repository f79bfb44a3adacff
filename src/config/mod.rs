mod error;
mod provider;
mod server;
mod spec;
mod yaml_provider;

pub use error::ConfigError;
pub use provider::{ConfigProvider, LoadedConfig};
pub use server::{ServerConfig, TransportKind, DEFAULT_HTTP_PORT, DEFAULT_SOCKET_PORT};
pub use spec::{AutoRestart, NotificationBlock, ProgramSpec, SmtpConfig, StreamTarget};
pub use yaml_provider::YamlConfigProvider;
