use serde::{Deserialize, Serialize};

/// The lifecycle state of a managed program, per SPEC_FULL.md §4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Stopped,
    Starting,
    Running,
    Stopping,
    Exited,
    Fatal,
}

impl Default for Status {
    fn default() -> Self {
        Status::Stopped
    }
}

impl Status {
    /// Whether a child process is expected to be alive in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Starting | Status::Running | Status::Stopping)
    }
}
