use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nix::unistd::{Group, User};
use serde::Deserialize;

use super::error::ConfigError;
use super::provider::{ConfigProvider, LoadedConfig};
use super::server::ServerConfig;
use super::spec::{ProgramSpec, SmtpConfig};

/// On-disk shape of the configuration file: a `programs` map plus optional
/// `server`/`smtp` blocks. This is the default, convenience implementation of
/// [`ConfigProvider`] described in SPEC_FULL.md §6; it deliberately does not
/// attempt to support every grammar extension a richer parser might (includes,
/// templating) — those are external collaborators.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    programs: HashMap<String, ProgramSpec>,
    #[serde(default)]
    server: ServerConfig,
    smtp: Option<SmtpConfig>,
}

pub struct YamlConfigProvider {
    path: PathBuf,
}

impl YamlConfigProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigProvider for YamlConfigProvider {
    fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        let raw: RawConfig = serde_yaml::from_str(&contents)?;

        let mut programs = HashMap::with_capacity(raw.programs.len());
        for (name, mut spec) in raw.programs {
            spec.name = name.clone();
            validate_program(&spec)?;
            if programs.insert(name.clone(), spec).is_some() {
                return Err(ConfigError::DuplicateProgram(name));
            }
        }

        Ok(LoadedConfig {
            programs,
            server: raw.server,
            smtp: raw.smtp,
        })
    }
}

/// Rejects a program spec whose `user`, `group`, or `workingdir` cannot
/// possibly succeed at spawn time. Per SPEC_FULL.md §7 item 1, an unknown
/// user/group or a non-existent working directory is a **Configuration
/// error**: it must abort startup (or fail the reload and leave the
/// previous configuration in effect), not surface later as a per-Worker
/// `fatal` status the first time the program is started.
fn validate_program(spec: &ProgramSpec) -> Result<(), ConfigError> {
    if let Some(user) = &spec.user {
        let resolved = User::from_name(user).map_err(|_| ConfigError::UnknownUser {
            program: spec.name.clone(),
            user: user.clone(),
        })?;
        if resolved.is_none() {
            return Err(ConfigError::UnknownUser {
                program: spec.name.clone(),
                user: user.clone(),
            });
        }
    }

    if let Some(group) = &spec.group {
        let resolved = Group::from_name(group).map_err(|_| ConfigError::UnknownGroup {
            program: spec.name.clone(),
            group: group.clone(),
        })?;
        if resolved.is_none() {
            return Err(ConfigError::UnknownGroup {
                program: spec.name.clone(),
                group: group.clone(),
            });
        }
    }

    if let Some(dir) = &spec.workingdir {
        if !dir.is_dir() {
            return Err(ConfigError::MissingWorkingDir {
                program: spec.name.clone(),
                path: dir.display().to_string(),
            });
        }
    }

    Ok(())
}
