use crate::config::ConfigStore;
use crate::services::reconciler::{Reconciler, StateCapture};
use crate::shell::WindowSystem;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Restoration progress of a tracked window. The transition happens exactly
/// once, on the first successful restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, saved state not applied yet; change events re-attempt the
    /// restore instead of persisting anything
    Pending,
    /// Restore applied; change events are save triggers from now on
    Settled,
}

/// Per-tracked-window state machine.
///
/// Owns at most one pending save-debounce task and one pending
/// workspace-switch task; arming a slot always cancels its predecessor.
/// Never persisted, torn down with the window.
pub struct WindowSession {
    pub window_id: u64,
    pub class_id: String,
    phase: SessionPhase,
    /// Most recent capture handed to the debounce slot; fallback for the
    /// final save when the window is already gone at unmanage time
    pub last_capture: Option<StateCapture>,
    save_timer: Option<JoinHandle<()>>,
    workspace_timer: Option<JoinHandle<()>>,
}

impl WindowSession {
    pub fn new(window_id: u64, class_id: impl Into<String>) -> Self {
        Self {
            window_id,
            class_id: class_id.into(),
            phase: SessionPhase::Pending,
            last_capture: None,
            save_timer: None,
            workspace_timer: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the initial restoration has completed
    pub fn restore_applied(&self) -> bool {
        self.phase == SessionPhase::Settled
    }

    /// One-way `Pending -> Settled` transition
    pub fn mark_settled(&mut self) {
        self.phase = SessionPhase::Settled;
    }

    /// Schedule (or reschedule) the trailing-debounce save. The capture was
    /// taken synchronously at event time; the rule is resolved again when the
    /// timer fires so live rule edits win.
    pub fn arm_save_timer(
        &mut self,
        reconciler: Arc<Reconciler>,
        config: Arc<ConfigStore>,
        capture: StateCapture,
        debounce: Duration,
    ) {
        if let Some(previous) = self.save_timer.take() {
            previous.abort();
        }
        self.last_capture = Some(capture);

        let window_id = self.window_id;
        let class_id = self.class_id.clone();
        self.save_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let Some(rule) = config.match_rule(&class_id) else {
                debug!(window = window_id, class = %class_id, "No rule at save time, dropping snapshot");
                return;
            };
            if let Err(err) = reconciler.snapshot(&rule, &class_id, &capture).await {
                warn!(window = window_id, error = %err, "Debounced snapshot failed");
            }
        }));
    }

    /// Schedule (or reschedule) the deferred workspace activation that
    /// follows a workspace restore, letting the geometry settle first.
    pub fn arm_workspace_timer(
        &mut self,
        system: Arc<dyn WindowSystem>,
        workspace: i32,
        delay: Duration,
    ) {
        if let Some(previous) = self.workspace_timer.take() {
            previous.abort();
        }

        let window_id = self.window_id;
        self.workspace_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match system.active_workspace() {
                Ok(active) if active == workspace => {}
                Ok(_) => {
                    if let Err(err) = system.activate_workspace(workspace) {
                        debug!(window = window_id, workspace, error = %err, "Workspace activation failed");
                    }
                }
                Err(err) => {
                    debug!(window = window_id, error = %err, "Could not query active workspace");
                }
            }
        }));
    }

    /// Cancel both timer slots unconditionally. Safe on completed tasks.
    pub fn cancel_timers(&mut self) {
        if let Some(timer) = self.save_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.workspace_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for WindowSession {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
