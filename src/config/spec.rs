use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Restart policy for a program, see [`ProgramSpec::autorestart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoRestart {
    Always,
    Never,
    Unexpected,
}

impl Default for AutoRestart {
    fn default() -> Self {
        AutoRestart::Never
    }
}

/// Where a child's stdout/stderr should go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamTarget {
    Path(PathBuf),
    Rotating {
        path: PathBuf,
        #[serde(default)]
        maxbytes: u64,
        #[serde(default)]
        backups: u32,
    },
}

impl StreamTarget {
    pub fn path(&self) -> &PathBuf {
        match self {
            StreamTarget::Path(p) => p,
            StreamTarget::Rotating { path, .. } => path,
        }
    }
}

/// SMTP parameters carried by a notification block. The core never opens an
/// SMTP connection itself; this is schema only, handed to whatever
/// [`crate::notify::NotificationSink`] is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SmtpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
}

fn default_smtp_server() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotificationBlock {
    #[serde(default)]
    pub smtp: SmtpConfig,
}

fn default_numprocs() -> u32 {
    1
}
fn default_umask() -> String {
    "022".to_string()
}
fn default_exitcodes() -> HashSet<i32> {
    HashSet::from([0])
}
fn default_startretries() -> u32 {
    3
}
fn default_startsecs() -> u64 {
    1
}
fn default_stopsignal() -> String {
    "TERM".to_string()
}
fn default_stoptsecs() -> u64 {
    10
}

/// The immutable declaration of one managed program, as loaded from
/// configuration. See SPEC_FULL.md §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    #[serde(skip)]
    pub name: String,

    pub cmd: Vec<String>,

    #[serde(default = "default_numprocs")]
    pub numprocs: u32,

    #[serde(default = "default_umask")]
    pub umask: String,

    pub workingdir: Option<PathBuf>,

    #[serde(default)]
    pub autostart: bool,

    #[serde(default)]
    pub autorestart: AutoRestart,

    #[serde(default = "default_exitcodes")]
    pub exitcodes: HashSet<i32>,

    #[serde(default = "default_startretries")]
    pub startretries: u32,

    #[serde(default = "default_startsecs")]
    pub startsecs: u64,

    #[serde(default = "default_stopsignal")]
    pub stopsignal: String,

    #[serde(default = "default_stoptsecs")]
    pub stoptsecs: u64,

    pub stdout: Option<StreamTarget>,
    pub stderr: Option<StreamTarget>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    pub user: Option<String>,
    pub group: Option<String>,

    pub priority: Option<i32>,

    pub on_success: Option<NotificationBlock>,
    pub on_failure: Option<NotificationBlock>,
}

impl ProgramSpec {
    /// Fields that require a running child to be restarted for the change to
    /// take effect, per SPEC_FULL.md §4.2.
    pub fn requires_restart(&self, other: &ProgramSpec) -> bool {
        self.cmd != other.cmd
            || self.user != other.user
            || self.group != other.group
            || self.workingdir != other.workingdir
            || self.umask != other.umask
            || self.env != other.env
            || self.stdout != other.stdout
            || self.stderr != other.stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let yaml = r#"
cmd: ["/bin/sleep", "1"]
"#;
        let spec: ProgramSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(1, spec.numprocs);
        assert_eq!("022", spec.umask);
        assert_eq!(HashSet::from([0]), spec.exitcodes);
        assert_eq!(3, spec.startretries);
        assert_eq!(1, spec.startsecs);
        assert_eq!("TERM", spec.stopsignal);
        assert_eq!(10, spec.stoptsecs);
        assert_eq!(AutoRestart::Never, spec.autorestart);
        assert!(!spec.autostart);
    }

    #[test]
    fn requires_restart_on_cmd_change_only() {
        let base: ProgramSpec = serde_yaml::from_str(r#"cmd: ["a"]"#).unwrap();
        let mut changed = base.clone();
        changed.priority = Some(5);
        assert!(!base.requires_restart(&changed));

        changed.cmd = vec!["b".to_string()];
        assert!(base.requires_restart(&changed));
    }
}
