use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::ConfigProvider;
use crate::notify::NotificationSink;
use crate::worker::{StartSource, Worker, WorkerSnapshot};

use super::error::SupervisorError;
use super::table::ProgramTable;

/// Owns the live program table and is the single entry point every
/// transport (socket, HTTP) and the background Monitor go through to touch
/// a worker. See SPEC_FULL.md §4.2 and §5.
///
/// `table` is the single mutex SPEC_FULL.md §5 describes: every
/// state-transitioning method (`start`, `stop`, `restart`, `reload`) holds
/// it for the whole operation, and `status`/`status_one` take the same
/// lock just long enough to clone a consistent snapshot. This serializes
/// state-changing calls against each other by design, at the cost of one
/// program's slow stop briefly delaying another's — the trade-off
/// SPEC_FULL.md's concurrency model accepts in exchange for a snapshot
/// that never reflects a half-updated transition.
pub struct Supervisor {
    table: Mutex<ProgramTable>,
    config: Arc<dyn ConfigProvider>,
    notifier: Arc<dyn NotificationSink>,
}

impl Supervisor {
    pub fn new(config: Arc<dyn ConfigProvider>, notifier: Arc<dyn NotificationSink>) -> Result<Self, SupervisorError> {
        let loaded = config.load()?;
        let mut table = ProgramTable::new();
        for (name, spec) in loaded.programs {
            table.insert(name, Arc::new(Worker::new(spec).with_notifier(notifier.clone())));
        }

        Ok(Self {
            table: Mutex::new(table),
            config,
            notifier,
        })
    }

    /// Spawns every program whose spec has `autostart: true`. Called once
    /// at daemon boot. This is a system-issued start, not a user one: it
    /// does not reset `retry_count` (there is nothing to reset yet at boot,
    /// but the distinction matters identically to reload's autostart path).
    pub fn start_autostart_programs(&self) {
        let table = self.table.lock().unwrap();
        for worker in table.values() {
            if worker.spec().autostart {
                if let Err(err) = worker.start_from(StartSource::System) {
                    warn!(program = %worker.name(), error = %err, "failed to start program");
                }
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table.lock().unwrap().contains_key(name)
    }

    pub fn start(&self, name: &str) -> Result<bool, SupervisorError> {
        let table = self.table.lock().unwrap();
        let worker = table
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownProgram(name.to_string()))?;
        Ok(worker.start()?)
    }

    pub fn stop(&self, name: &str) -> Result<bool, SupervisorError> {
        let table = self.table.lock().unwrap();
        let worker = table
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownProgram(name.to_string()))?;
        Ok(worker.stop()?)
    }

    pub fn restart(&self, name: &str) -> Result<bool, SupervisorError> {
        let table = self.table.lock().unwrap();
        let worker = table
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownProgram(name.to_string()))?;
        Ok(worker.restart()?)
    }

    pub fn status(&self) -> Vec<WorkerSnapshot> {
        self.table
            .lock()
            .unwrap()
            .values()
            .map(|w| w.snapshot())
            .collect()
    }

    pub fn status_one(&self, name: &str) -> Result<WorkerSnapshot, SupervisorError> {
        let table = self.table.lock().unwrap();
        let worker = table
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownProgram(name.to_string()))?;
        Ok(worker.snapshot())
    }

    /// Runs one Monitor tick across every worker. Per SPEC_FULL.md §4.3 and
    /// §5, each worker is reconciled under its own brief lock acquisition —
    /// not one lock held across the whole tick — so a slow restart on one
    /// program never delays the Monitor's pass over the others, and a
    /// concurrent user `stop` on a different program is never blocked by it.
    pub fn tick(&self) {
        let names: Vec<String> = self.table.lock().unwrap().keys().cloned().collect();
        for name in names {
            self.reconcile_one(&name);
        }
    }

    fn reconcile_one(&self, name: &str) {
        let table = self.table.lock().unwrap();
        let Some(worker) = table.get(name) else {
            return;
        };
        if let Err(err) = worker.poll() {
            warn!(program = %name, error = %err, "error polling worker");
            return;
        }
        if worker.should_autorestart() {
            if let Err(err) = worker.start_from(StartSource::System) {
                warn!(program = %name, error = %err, "monitor-initiated restart failed");
            }
        }
    }

    /// Reconciles the live program table against a freshly loaded
    /// configuration: programs present in both keep running (restarting
    /// only if their spec changed in a way that requires it), programs only
    /// in the new config are added and started if `autostart`, and programs
    /// only in the old table are stopped and dropped. See SPEC_FULL.md §4.2.
    pub fn reload(&self) -> Result<(), SupervisorError> {
        let loaded = self.config.load()?;
        let mut table = self.table.lock().unwrap();

        let old_names: HashSet<String> = table.keys().cloned().collect();
        let new_names: HashSet<String> = loaded.programs.keys().cloned().collect();

        for removed in old_names.difference(&new_names) {
            if let Some(worker) = table.get(removed) {
                worker.stop()?;
            }
            table.remove(removed);
            info!(program = %removed, "removed program on reload");
        }

        for name in old_names.intersection(&new_names) {
            let worker = table.get(name).expect("name came from this table's own keys");
            let new_spec = loaded.programs[name].clone();
            if worker.spec().requires_restart(&new_spec) {
                worker.stop()?;
                worker.update_spec(new_spec);
                worker.start_from(StartSource::System)?;
                info!(program = %name, "restarted program on reload");
            } else {
                worker.update_spec(new_spec);
            }
        }

        for added in new_names.difference(&old_names) {
            let spec = loaded.programs[added].clone();
            let autostart = spec.autostart;
            let worker = Arc::new(Worker::new(spec).with_notifier(self.notifier.clone()));
            table.insert(added.clone(), worker.clone());
            info!(program = %added, "added program on reload");
            if autostart {
                if let Err(err) = worker.start_from(StartSource::System) {
                    warn!(program = %added, error = %err, "failed to autostart program added on reload");
                }
            }
        }

        Ok(())
    }

    /// Stops every running worker in parallel, per SPEC_FULL.md §4.2's
    /// explicit carve-out for `shutdown()` (unlike the other
    /// state-transitioning methods, which serialize through `table`).
    /// Called once, at daemon shutdown.
    pub fn shutdown(&self) {
        let workers: Vec<Arc<Worker>> = self.table.lock().unwrap().values().cloned().collect();
        std::thread::scope(|scope| {
            for worker in &workers {
                scope.spawn(move || {
                    if let Err(err) = worker.stop() {
                        warn!(program = %worker.name(), error = %err, "error stopping worker during shutdown");
                    }
                });
            }
        });
    }
}
