use std::sync::Arc;

use serde_json::json;

use crate::supervisor::Supervisor;

use super::reply::Reply;
use super::verb::{self, Verb};

/// Turns a request line into a [`Reply`] by driving the [`Supervisor`].
/// Both the socket transport and the HTTP transport route every request
/// through the same `Dispatcher::handle_line`, so the two never drift.
///
/// Per SPEC_FULL.md §4.4, the verb table is closed to `alive`, `status`,
/// `detail`, `start`, `stop`, `restart`, `reload`: there is no remote
/// `shutdown` command. Termination is driven only by SIGTERM/SIGINT, at
/// the daemon control layer (`src/daemon.rs`, `src/bin/wardd.rs`), never by
/// an unauthenticated client on the wire.
pub struct Dispatcher {
    supervisor: Arc<Supervisor>,
}

impl Dispatcher {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }

    pub fn handle_line(&self, line: &str) -> Reply {
        match verb::parse(line) {
            Ok(verb) => self.handle(verb),
            Err(err) => Reply::error(err.to_string()),
        }
    }

    fn handle(&self, verb: Verb) -> Reply {
        match verb {
            Verb::Alive => Reply::success("ward is alive", None),
            Verb::Start(name) => self.with_program(&name, |sup| {
                sup.start(&name)
                    .map(|started| outcome_reply(sup, &name, started, "started"))
            }),
            Verb::Stop(name) => self.with_program(&name, |sup| {
                sup.stop(&name).map(|_| outcome_reply(sup, &name, true, "stopped"))
            }),
            Verb::Restart(name) => self.with_program(&name, |sup| {
                sup.restart(&name)
                    .map(|restarted| outcome_reply(sup, &name, restarted, "restarted"))
            }),
            Verb::Status => {
                let snapshots = self.supervisor.status();
                Reply::success_data(json!(snapshots))
            }
            Verb::Detail(name) => self.with_program(&name, |sup| {
                sup.status_one(&name).map(|snapshot| {
                    Reply::success_data(json!({ name.as_str(): snapshot }))
                })
            }),
            Verb::Reload => match self.supervisor.reload() {
                Ok(()) => Reply::success("configuration reloaded", None),
                Err(err) => Reply::error(err.to_string()),
            },
        }
    }

    fn with_program<F>(&self, name: &str, f: F) -> Reply
    where
        F: FnOnce(&Supervisor) -> Result<Reply, crate::supervisor::SupervisorError>,
    {
        if !self.supervisor.exists(name) {
            return Reply::error(format!("program '{name}' not found"));
        }
        match f(&self.supervisor) {
            Ok(reply) => reply,
            Err(err) => Reply::error(err.to_string()),
        }
    }
}

fn outcome_reply(supervisor: &Supervisor, name: &str, ok: bool, verb_past: &str) -> Reply {
    let data = supervisor
        .status_one(name)
        .ok()
        .map(|snapshot| json!(snapshot));
    if ok {
        Reply::success(format!("program '{name}' {verb_past} successfully"), data)
    } else {
        Reply {
            status: super::reply::ReplyStatus::Error,
            message: Some(format!("failed to {verb_past} program '{name}'")),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}
