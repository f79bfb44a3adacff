use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::config::{AutoRestart, ProgramSpec};
use crate::notify::{Action, NotificationSink};

use super::error::WorkerError;
use super::ids::{parse_umask, resolve_group, resolve_user};
use super::snapshot::WorkerSnapshot;
use super::status::Status;
use super::streams::open_stream;

/// How often `stop()` re-checks for exit while waiting out `stoptsecs`.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Distinguishes a user-issued `start`/`restart` from one the Supervisor
/// drives on its own (autostart at boot, reload, or the Monitor's
/// autorestart). Per SPEC_FULL.md §4.1, `retry_count` resets to zero only
/// on the user-issued path; every other caller accumulates against the
/// same `startretries` budget across repeated attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSource {
    User,
    System,
}

struct WorkerState {
    status: Status,
    child: Option<Child>,
    pid: Option<u32>,
    started_at: Option<SystemTime>,
    stopped_at: Option<SystemTime>,
    retry_count: u32,
    restart_count: u32,
    last_exit_code: Option<i32>,
    stopped_by_user: bool,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            status: Status::Stopped,
            child: None,
            pid: None,
            started_at: None,
            stopped_at: None,
            retry_count: 0,
            restart_count: 0,
            last_exit_code: None,
            stopped_by_user: false,
        }
    }
}

/// The mutable runtime record for one managed program: its declared spec,
/// a possible live child process, and the bookkeeping the Monitor needs to
/// drive restarts. See SPEC_FULL.md §4.1 and §3.
pub struct Worker {
    spec: Mutex<ProgramSpec>,
    state: Mutex<WorkerState>,
    notifier: Option<std::sync::Arc<dyn NotificationSink>>,
}

impl Worker {
    pub fn new(spec: ProgramSpec) -> Self {
        Self {
            spec: Mutex::new(spec),
            state: Mutex::new(WorkerState::default()),
            notifier: None,
        }
    }

    /// Attaches a notification sink, called by the Supervisor at
    /// construction time so the Worker can report its own lifecycle events
    /// without the Supervisor re-deriving success/failure after the fact.
    pub fn with_notifier(mut self, notifier: std::sync::Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn notify(&self, action: Action, success: bool, error: Option<&str>) {
        if let Some(sink) = &self.notifier {
            sink.notify(&self.name(), action, success, error);
        }
    }

    pub fn name(&self) -> String {
        self.spec.lock().unwrap().name.clone()
    }

    pub fn spec(&self) -> ProgramSpec {
        self.spec.lock().unwrap().clone()
    }

    /// Swaps in a new declaration for a program that did not require a
    /// restart, per SPEC_FULL.md §4.2 (reload).
    pub fn update_spec(&self, spec: ProgramSpec) {
        *self.spec.lock().unwrap() = spec;
    }

    pub fn status(&self) -> Status {
        self.state.lock().unwrap().status
    }

    pub fn stopped_by_user(&self) -> bool {
        self.state.lock().unwrap().stopped_by_user
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        let state = self.state.lock().unwrap();
        WorkerSnapshot {
            name: self.name(),
            status: state.status,
            pid: state.pid,
            uptime_secs: WorkerSnapshot::uptime_since(state.started_at),
            retry_count: state.retry_count,
            restart_count: state.restart_count,
            exit_code: state.last_exit_code,
        }
    }

    /// Spawns the child process on behalf of a user-issued `start`, per
    /// SPEC_FULL.md §4.1. Equivalent to `start_from(StartSource::User)`;
    /// this is the entry point the Supervisor's `start`/`restart` verbs use.
    pub fn start(&self) -> Result<bool, WorkerError> {
        self.start_from(StartSource::User)
    }

    /// Spawns the child process, per SPEC_FULL.md §4.1. Preconditions:
    /// current status is `stopped`, `exited`, or `fatal`; a Worker already
    /// `starting`/`running`/`stopping` is left untouched and this returns
    /// `Ok(false)`. A `numprocs` of zero is a permanent no-op: the worker
    /// exists but never spawns, and stays `stopped`.
    ///
    /// `source` decides whether `retry_count` resets: a user-issued start
    /// clears the counter before counting this attempt, so that an operator
    /// restarting a Worker that previously exhausted `startretries` gets a
    /// fresh retry budget; a system-issued start (autostart at boot,
    /// reload, or the Monitor's autorestart) accumulates against whatever
    /// budget is already in progress.
    pub fn start_from(&self, source: StartSource) -> Result<bool, WorkerError> {
        let spec = self.spec();

        let mut state = self.state.lock().unwrap();
        if state.status.is_active() {
            return Ok(false);
        }

        state.stopped_by_user = false;

        if spec.numprocs == 0 {
            debug!(program = %spec.name, "numprocs is 0, refusing to spawn");
            return Ok(false);
        }

        if source == StartSource::User {
            state.retry_count = 0;
        }
        state.retry_count += 1;

        let uid = match spec.user.as_deref().map(resolve_user).transpose() {
            Ok(uid) => uid,
            Err(err) => {
                state.status = Status::Fatal;
                drop(state);
                warn!(program = %spec.name, error = %err, "failed to resolve user, marking fatal");
                self.notify(Action::Start, false, Some(&err.to_string()));
                return Ok(false);
            }
        };
        let gid = match spec.group.as_deref().map(resolve_group).transpose() {
            Ok(gid) => gid,
            Err(err) => {
                state.status = Status::Fatal;
                drop(state);
                warn!(program = %spec.name, error = %err, "failed to resolve group, marking fatal");
                self.notify(Action::Start, false, Some(&err.to_string()));
                return Ok(false);
            }
        };

        match spawn_child(&spec, uid, gid) {
            Ok(child) => {
                let pid = child.id();
                state.child = Some(child);
                state.pid = Some(pid);
                state.started_at = Some(SystemTime::now());
                state.status = Status::Starting;
                state.last_exit_code = None;
                drop(state);
                info!(program = %spec.name, pid, "spawned child process");
                self.notify(Action::Start, true, None);
                Ok(true)
            }
            Err(err) => {
                state.status = Status::Fatal;
                drop(state);
                warn!(program = %spec.name, error = %err, "spawn failed, marking fatal");
                self.notify(Action::Start, false, Some(&err.to_string()));
                Ok(false)
            }
        }
    }

    /// Sends the configured stop signal, then escalates to `SIGKILL` if the
    /// child has not exited by `stoptsecs`, mirroring the teacher's
    /// terminate-then-escalate pattern. Per SPEC_FULL.md §4.1, always marks
    /// `stopped_by_user`, even when there is nothing running to stop.
    pub fn stop(&self) -> Result<bool, WorkerError> {
        let spec = self.spec();
        let pid = {
            let mut state = self.state.lock().unwrap();
            state.stopped_by_user = true;
            match state.pid {
                Some(pid) if state.status.is_active() => {
                    state.status = Status::Stopping;
                    pid
                }
                _ => return Ok(true),
            }
        };

        let sig = parse_signal(&spec.stopsignal)?;
        if let Err(err) = signal::kill(Pid::from_raw(pid as i32), sig) {
            self.notify(Action::Stop, false, Some(&err.to_string()));
            return Err(WorkerError::Signal(err));
        }

        let deadline = Duration::from_secs(spec.stoptsecs);
        let start = SystemTime::now();
        let mut exited = self.reap_if_exited();
        while !exited && start.elapsed().unwrap_or_default() < deadline {
            std::thread::sleep(STOP_POLL_INTERVAL);
            exited = self.reap_if_exited();
        }

        if !exited {
            warn!(program = %spec.name, pid, "stop timed out, sending SIGKILL");
            signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL).ok();
            self.wait_for_exit_unconditionally();
            self.notify(Action::Stop, false, Some("stop timed out, escalated to SIGKILL"));
        } else {
            self.notify(Action::Stop, true, None);
        }

        Ok(true)
    }

    /// Reaps the child if it has already exited, recording `stop_time` and
    /// transitioning to `stopped`. Returns whether the child had exited.
    fn reap_if_exited(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(child) = state.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                state.child = None;
                state.last_exit_code = status.code();
                state.stopped_at = Some(SystemTime::now());
                state.status = Status::Stopped;
                true
            }
            _ => false,
        }
    }

    /// Blocks, with no timeout, until the child has exited. Used only after
    /// `SIGKILL` has already been sent, so this cannot hang forever.
    fn wait_for_exit_unconditionally(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(child) = state.child.as_mut() {
            if let Ok(status) = child.wait() {
                state.last_exit_code = status.code();
            }
            state.child = None;
        }
        state.pid = None;
        state.stopped_at = Some(SystemTime::now());
        state.status = Status::Stopped;
    }

    /// Executes `stop()` followed by a user-issued `start()`, per
    /// SPEC_FULL.md §4.1. Equivalent to `restart_from(StartSource::User)`;
    /// this is the entry point the Supervisor's `restart` verb uses.
    pub fn restart(&self) -> Result<bool, WorkerError> {
        self.restart_from(StartSource::User)
    }

    /// Executes `stop()` followed by `start_from(source)` with
    /// `stopped_by_user` cleared before the start, per SPEC_FULL.md §4.1.
    /// Increments `restart_count` on a successful start.
    pub fn restart_from(&self, source: StartSource) -> Result<bool, WorkerError> {
        self.stop()?;
        {
            let mut state = self.state.lock().unwrap();
            state.stopped_by_user = false;
        }
        let started = self.start_from(source)?;
        if started {
            self.state.lock().unwrap().restart_count += 1;
            self.notify(Action::Restart, true, None);
        } else {
            self.notify(Action::Restart, false, Some("restart failed to start child"));
        }
        Ok(started)
    }

    /// Non-blocking status refresh used by the Monitor, per SPEC_FULL.md
    /// §4.1. Reaps the child if it has exited and drives the lifecycle
    /// state machine. Never decides whether to restart; that is
    /// `should_autorestart`'s job.
    pub fn poll(&self) -> Result<(), WorkerError> {
        let spec = self.spec();
        let mut state = self.state.lock().unwrap();

        let Some(child) = state.child.as_mut() else {
            return Ok(());
        };

        let exit_status = match child.try_wait().map_err(WorkerError::Spawn)? {
            Some(status) => status,
            None => {
                if state.status == Status::Starting {
                    let elapsed = state
                        .started_at
                        .and_then(|t| t.elapsed().ok())
                        .unwrap_or_default();
                    if elapsed >= Duration::from_secs(spec.startsecs) {
                        state.status = Status::Running;
                    }
                }
                return Ok(());
            }
        };

        let code = exit_status.code();
        state.child = None;
        state.pid = None;
        state.last_exit_code = code;
        state.stopped_at = Some(SystemTime::now());

        if state.status == Status::Stopping {
            state.status = Status::Stopped;
            return Ok(());
        }

        let reached_startsecs = state
            .started_at
            .and_then(|t| t.elapsed().ok())
            .map(|elapsed| elapsed >= Duration::from_secs(spec.startsecs))
            .unwrap_or(false);

        // Fatal vs exited is purely about whether the child stayed up long
        // enough, per SPEC_FULL.md §4.1 — not about the exit code itself.
        // Whether a dirty-but-long-lived exit should be restarted is
        // `should_autorestart`'s concern, driven by `autorestart`/`exitcodes`.
        state.status = if reached_startsecs {
            Status::Exited
        } else {
            Status::Fatal
        };

        Ok(())
    }

    /// Pure query deciding whether the Monitor should respawn this Worker
    /// after an observed death, per SPEC_FULL.md §4.1. Never mutates state
    /// and never restarts as a side effect.
    pub fn should_autorestart(&self) -> bool {
        let spec = self.spec();
        let state = self.state.lock().unwrap();

        if state.status.is_active() || state.stopped_by_user {
            return false;
        }

        let bounded = state.retry_count <= spec.startretries;

        if spec.autorestart == AutoRestart::Always && bounded {
            return true;
        }
        if spec.autorestart == AutoRestart::Unexpected {
            let clean = state
                .last_exit_code
                .map(|c| spec.exitcodes.contains(&c))
                .unwrap_or(false);
            if !clean && bounded {
                return true;
            }
        }
        // Retry a fatal spawn/startup failure regardless of policy, per
        // SPEC_FULL.md §4.1's fourth rule.
        state.status == Status::Fatal && bounded
    }
}

fn parse_signal(name: &str) -> Result<Signal, WorkerError> {
    let candidate = if name.to_uppercase().starts_with("SIG") {
        name.to_uppercase()
    } else {
        format!("SIG{}", name.to_uppercase())
    };
    Signal::from_str(&candidate).map_err(|_| WorkerError::InvalidSignal(name.to_string()))
}

fn spawn_child(
    spec: &ProgramSpec,
    uid: Option<nix::unistd::Uid>,
    gid: Option<nix::unistd::Gid>,
) -> Result<Child, WorkerError> {
    let (program, args) = spec.cmd.split_first().ok_or(WorkerError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(args);
    command.envs(spec.env.iter());
    command.stdin(std::process::Stdio::null());
    command.stdout(open_stream(spec.stdout.as_ref())?);
    command.stderr(open_stream(spec.stderr.as_ref())?);

    if let Some(dir) = &spec.workingdir {
        command.current_dir(dir);
    }

    let umask = parse_umask(&spec.umask)?;
    let priority = spec.priority;

    unsafe {
        command.pre_exec(move || {
            libc::umask(umask as libc::mode_t);
            if let Some(prio) = priority {
                if libc::setpriority(libc::PRIO_PROCESS, 0, prio) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }
            if let Some(gid) = gid {
                nix::unistd::setgid(gid)
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            }
            if let Some(uid) = uid {
                nix::unistd::setuid(uid)
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            }
            Ok(())
        });
    }

    command.spawn().map_err(WorkerError::Spawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_spec(cmd: Vec<&str>) -> ProgramSpec {
        ProgramSpec {
            name: "test".to_string(),
            cmd: cmd.into_iter().map(String::from).collect(),
            numprocs: 1,
            umask: "022".to_string(),
            workingdir: None,
            autostart: false,
            autorestart: AutoRestart::Never,
            exitcodes: HashSet::from([0]),
            startretries: 3,
            startsecs: 0,
            stopsignal: "TERM".to_string(),
            stoptsecs: 1,
            stdout: None,
            stderr: None,
            env: Default::default(),
            user: None,
            group: None,
            priority: None,
            on_success: None,
            on_failure: None,
        }
    }

    #[test]
    fn numprocs_zero_never_spawns() {
        let mut spec = test_spec(vec!["/bin/sleep", "5"]);
        spec.numprocs = 0;
        let worker = Worker::new(spec);
        assert!(!worker.start().unwrap());
        assert_eq!(Status::Stopped, worker.status());
    }

    #[test]
    fn start_then_poll_transitions_to_running() {
        let worker = Worker::new(test_spec(vec!["/bin/sleep", "2"]));
        assert!(worker.start().unwrap());
        assert_eq!(Status::Starting, worker.status());

        worker.poll().unwrap();
        assert_eq!(Status::Running, worker.status());

        worker.stop().unwrap();
    }

    #[test]
    fn clean_exit_without_autorestart_is_exited() {
        let worker = Worker::new(test_spec(vec!["/bin/true"]));
        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert_eq!(Status::Exited, worker.status());
        assert!(!worker.should_autorestart());
    }

    #[test]
    fn exit_before_startsecs_is_fatal() {
        let mut spec = test_spec(vec!["/bin/false"]);
        spec.startsecs = 2;
        let worker = Worker::new(spec);
        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert_eq!(Status::Fatal, worker.status());
    }

    #[test]
    fn exit_after_startsecs_is_exited_even_with_bad_code() {
        let worker = Worker::new(test_spec(vec!["/bin/false"]));
        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert_eq!(Status::Exited, worker.status());
    }

    #[test]
    fn always_policy_requests_restart_until_retries_exhausted() {
        let mut spec = test_spec(vec!["/bin/true"]);
        spec.autorestart = AutoRestart::Always;
        spec.startretries = 1;
        let worker = Worker::new(spec);

        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert!(worker.should_autorestart());

        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert!(!worker.should_autorestart());
    }

    #[test]
    fn unexpected_policy_does_not_restart_on_clean_exit() {
        let mut spec = test_spec(vec!["/bin/true"]);
        spec.autorestart = AutoRestart::Unexpected;
        spec.startretries = 3;
        let worker = Worker::new(spec);

        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        worker.poll().unwrap();
        assert_eq!(Status::Exited, worker.status());
        assert!(!worker.should_autorestart());
    }

    #[test]
    fn unexpected_exit_retries_exactly_startretries_plus_one_attempts() {
        let mut spec = test_spec(vec!["/bin/sh", "-c", "exit 7"]);
        spec.autorestart = AutoRestart::Unexpected;
        spec.exitcodes = HashSet::from([0]);
        spec.startretries = 2;
        spec.startsecs = 1;
        let worker = Worker::new(spec);

        let mut attempts = 0;
        loop {
            assert!(worker.start().unwrap());
            attempts += 1;
            std::thread::sleep(Duration::from_millis(100));
            worker.poll().unwrap();
            if !worker.should_autorestart() {
                break;
            }
        }

        assert_eq!(3, attempts, "initial attempt plus two retries");
        assert_eq!(Status::Fatal, worker.status());
        assert_eq!(0, worker.snapshot().restart_count);
    }

    #[test]
    fn user_stop_prevents_autorestart() {
        let mut spec = test_spec(vec!["/bin/sleep", "5"]);
        spec.autorestart = AutoRestart::Always;
        spec.startretries = 5;
        let worker = Worker::new(spec);

        worker.start().unwrap();
        worker.stop().unwrap();
        assert!(worker.stopped_by_user());
        assert!(!worker.should_autorestart());
    }

    #[test]
    fn user_start_resets_stopped_by_user() {
        let worker = Worker::new(test_spec(vec!["/bin/sleep", "1"]));
        worker.start().unwrap();
        worker.stop().unwrap();
        assert!(worker.stopped_by_user());

        worker.start().unwrap();
        assert!(!worker.stopped_by_user());
        worker.stop().unwrap();
    }

    #[test]
    fn system_start_does_not_reset_retry_count_but_user_start_does() {
        let mut spec = test_spec(vec!["/bin/sh", "-c", "exit 7"]);
        spec.autorestart = AutoRestart::Unexpected;
        spec.exitcodes = HashSet::from([0]);
        spec.startretries = 1;
        spec.startsecs = 1;
        let worker = Worker::new(spec);

        // Exhaust the retry budget via system-issued (Monitor-style) starts,
        // mirroring autostart-at-boot and the Monitor's autorestart path.
        assert!(worker.start_from(StartSource::System).unwrap());
        std::thread::sleep(Duration::from_millis(100));
        worker.poll().unwrap();
        assert!(worker.should_autorestart());

        assert!(worker.start_from(StartSource::System).unwrap());
        std::thread::sleep(Duration::from_millis(100));
        worker.poll().unwrap();
        assert_eq!(Status::Fatal, worker.status());
        assert!(!worker.should_autorestart(), "retry budget exhausted");

        // A user-issued start clears the counter, giving a fresh budget.
        assert!(worker.start().unwrap());
        std::thread::sleep(Duration::from_millis(100));
        worker.poll().unwrap();
        assert!(
            worker.should_autorestart(),
            "user start should reset retry_count and re-enable autorestart"
        );
    }
}
