use tracing::{info, warn};

/// The event a [`NotificationSink`] is told about: which lifecycle action
/// triggered it, and whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
        }
    }
}

/// External collaborator contract (SPEC_FULL.md §6): something that reacts
/// to a Worker's start/stop/restart outcome. The core never dispatches a
/// real notification (e.g. opens an SMTP connection) itself — delivering
/// mail is explicitly out of scope (SPEC_FULL.md §1 Non-goals) — it only
/// ever calls this trait with the program name, the action, whether it
/// succeeded, and an optional error reason.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, program: &str, action: Action, success: bool, error: Option<&str>);
}

/// Default sink: does nothing. Used when no notification sink is wired up.
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _program: &str, _action: Action, _success: bool, _error: Option<&str>) {}
}

/// Default sink the daemon actually wires up: logs the event through
/// `tracing` instead of sending mail, so operators watching logs still see
/// every notification that would have gone out. An SMTP-backed sink can
/// implement the same trait and be swapped in without touching the Worker.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, program: &str, action: Action, success: bool, error: Option<&str>) {
        if success {
            info!(program, action = action.as_str(), "program event succeeded");
        } else {
            warn!(
                program,
                action = action.as_str(),
                error = error.unwrap_or("unknown error"),
                "program event failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_does_not_panic() {
        NoopSink.notify("web", Action::Start, true, None);
    }

    #[test]
    fn tracing_sink_does_not_panic_on_failure() {
        TracingSink.notify("web", Action::Restart, false, Some("exec format error"));
    }
}
