use std::time::{Duration, SystemTime};

use serde::Serialize;

use super::status::Status;

/// A point-in-time, serializable view of a [`super::worker::Worker`], as
/// returned by `status`/`detail` commands. Field names on the wire match
/// the client-facing vocabulary (`restarts`, not the internal
/// `restart_count`) rather than the internal Worker State field names.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub status: Status,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub retry_count: u32,
    #[serde(rename = "restarts")]
    pub restart_count: u32,
    pub exit_code: Option<i32>,
}

impl WorkerSnapshot {
    pub fn uptime_since(started_at: Option<SystemTime>) -> Option<u64> {
        started_at.and_then(|t| SystemTime::now().duration_since(t).ok().map(|d: Duration| d.as_secs()))
    }
}
