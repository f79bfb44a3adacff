use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::context::Context;
use crate::supervisor::Supervisor;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// The background health-check loop: wakes once a second, asks the
/// [`Supervisor`] to poll every worker, and restarts whichever ones report
/// they should come back up. Mirrors the original implementation's
/// `monitor_loop`, which slept a fixed second between passes rather than
/// reacting to process-exit events directly.
pub struct Monitor {
    cancel: Context<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn spawn(supervisor: Arc<Supervisor>) -> Self {
        let cancel = Context::new();
        let cancel_child = cancel.clone();

        let handle = thread::spawn(move || {
            loop {
                let (lock, cvar) = cancel_child.get_lock_cvar();
                let stop = {
                    let guard = lock.lock().unwrap();
                    let (guard, _timeout) = cvar.wait_timeout(guard, TICK_INTERVAL).unwrap();
                    *guard
                };
                if stop {
                    break;
                }

                debug!("monitor tick");
                supervisor.tick();
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Signals the loop to stop and blocks until it has exited.
    pub fn stop(mut self) {
        self.cancel.cancel_all(true).ok();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
