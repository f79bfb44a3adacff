use std::collections::HashMap;

use super::error::ConfigError;
use super::server::ServerConfig;
use super::spec::{ProgramSpec, SmtpConfig};

/// A fully loaded configuration snapshot, as returned by a [`ConfigProvider`].
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub programs: HashMap<String, ProgramSpec>,
    pub server: ServerConfig,
    pub smtp: Option<SmtpConfig>,
}

/// External collaborator contract (SPEC_FULL.md §6): something that can
/// produce a program-table snapshot and server block on demand. The core
/// never parses configuration grammar itself beyond what [`YamlConfigProvider`]
/// does for convenience; richer providers (templating, remote config, schema
/// validation) can implement this trait without touching the Supervisor.
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<LoadedConfig, ConfigError>;
}
