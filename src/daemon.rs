use std::fs;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;
use tracing::{info, warn};

const PID_FILE_PATH: &str = "/tmp/wardd.pid";

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("wardd is already running with pid {0}")]
    AlreadyRunning(i32),

    #[error("could not access pid-file `{path}`: {source}")]
    PidFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fork failed: {0}")]
    Fork(#[from] nix::errno::Errno),
}

/// Arbitrates the single-instance pid-file described in SPEC_FULL.md §4.6:
/// if a live process already owns it, refuse to start; otherwise claim it
/// for this process. Call before binding any transport.
pub fn acquire_pid_file() -> Result<PidFileGuard, DaemonError> {
    acquire_pid_file_at(PID_FILE_PATH)
}

pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    /// Removes the pid-file. A plain `unlink`, never `rmdir` — the
    /// original implementation's `daemonize` shutdown path called
    /// `os.rmdir` against what is a regular file, which can never succeed;
    /// SPEC_FULL.md §9 calls this out explicitly as a defect not to repeat.
    fn release(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "failed to remove pid-file");
            }
        }
    }

    /// Rewrites the pid-file with the current process id, used after
    /// `daemonize()` forks into a new process with a different pid than
    /// the one that originally acquired the file.
    pub fn rewrite_current_pid(&self) -> Result<(), DaemonError> {
        write_pid_file(&self.path, unistd::getpid())
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn acquire_pid_file_at(path: impl AsRef<Path>) -> Result<PidFileGuard, DaemonError> {
    let path = path.as_ref().to_path_buf();

    if let Ok(contents) = fs::read_to_string(&path) {
        if let Some(existing_pid) = contents.trim().parse::<i32>().ok() {
            if process_is_alive(existing_pid) {
                return Err(DaemonError::AlreadyRunning(existing_pid));
            }
            info!(pid = existing_pid, "removing stale pid-file");
        }
    }

    write_pid_file(&path, unistd::getpid())?;
    Ok(PidFileGuard { path })
}

fn write_pid_file(path: &Path, pid: Pid) -> Result<(), DaemonError> {
    fs::write(path, format!("{pid}\n")).map_err(|source| DaemonError::PidFile {
        path: path.display().to_string(),
        source,
    })
}

fn process_is_alive(pid: i32) -> bool {
    nix::sys::signal::kill(Pid::from_raw(pid), None).is_ok()
}

/// Detaches the process into the background: double-fork, new session,
/// `umask(0)`, chdir into `working_dir`, and standard streams redirected to
/// `/dev/null`. Mirrors the original implementation's `daemonize()` in
/// `taskmasterd.py`, which captures `os.getcwd()` before forking and chdirs
/// the daemonised process back into it rather than into `/` — the caller is
/// expected to capture its own working directory before calling this, since
/// `std::env::current_dir()` is meaningless after `setsid`/fork. The parent
/// and the intermediate child both exit immediately; only the grandchild
/// returns.
pub fn daemonize(working_dir: &Path) -> Result<(), DaemonError> {
    match unsafe { unistd::fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    unistd::setsid()?;

    match unsafe { unistd::fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    nix::sys::stat::umask(Mode::empty());
    unistd::chdir(working_dir).ok();
    redirect_standard_streams();

    Ok(())
}

fn redirect_standard_streams() {
    use std::fs::OpenOptions;

    let Ok(dev_null) = OpenOptions::new().read(true).write(true).open("/dev/null") else {
        return;
    };
    let fd = dev_null.as_raw_fd();
    unsafe {
        libc::dup2(fd, libc::STDIN_FILENO);
        libc::dup2(fd, libc::STDOUT_FILENO);
        libc::dup2(fd, libc::STDERR_FILENO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_and_releases_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pid");

        let guard = acquire_pid_file_at(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(unistd::getpid().to_string(), contents.trim());

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn stale_pid_file_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.pid");
        fs::write(&path, "999999999\n").unwrap();

        let guard = acquire_pid_file_at(&path).unwrap();
        drop(guard);
    }

    #[test]
    fn live_pid_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.pid");
        fs::write(&path, "1\n").unwrap();

        assert!(matches!(
            acquire_pid_file_at(&path),
            Err(DaemonError::AlreadyRunning(1))
        ));
    }
}
