//! Background eviction of idle keys.

use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::RegistryState;

/// Handle to the sweeper task.
///
/// The task stops when [`Sweeper::shutdown`] is called, when this handle is
/// dropped (the stop channel closes), or when the registry state it sweeps has
/// been freed.
#[derive(Debug)]
pub(crate) struct Sweeper {
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    pub(crate) fn spawn(runtime: &Handle, state: Weak<RegistryState>, interval: Duration) -> Self {
        let (stop, stopped) = watch::channel(false);
        let task = runtime.spawn(run(state, interval, stopped));
        Self { stop, task: Mutex::new(Some(task)) }
    }

    pub(crate) fn is_running(&self) -> bool {
        let guard = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the task to stop and wait for it to exit. Idempotent.
    pub(crate) async fn shutdown(&self) {
        self.stop.send_replace(true);
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                if err.is_panic() {
                    warn!(target: "keylimit::sweeper", error = %err, "sweeper task panicked");
                }
            }
        }
    }
}

async fn run(state: Weak<RegistryState>, interval: Duration, mut stop: watch::Receiver<bool>) {
    debug!(target: "keylimit::sweeper", ?interval, "sweeper started");
    loop {
        tokio::select! {
            biased;
            // Fires on an explicit stop and when the handle is dropped.
            _ = stop.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let Some(live) = state.upgrade() else { break };
        live.sweep();
    }
    debug!(target: "keylimit::sweeper", "sweeper stopped");
}
