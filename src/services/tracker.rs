use crate::config::{ConfigStore, StateStore};
use crate::services::reconciler::{Reconciler, RestoreOutcome, StateCapture};
use crate::services::session::WindowSession;
use crate::shell::{WindowChange, WindowSystem};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Counters for tracker lifecycle operations
#[derive(Debug, Default, Clone)]
pub struct TrackerMetrics {
    pub windows_seen: u64,
    pub sessions_created: u64,
    pub deferred_setups: u64,
    pub restores_applied: u64,
    pub teardowns: u64,
}

/// Registry mapping live windows to their sessions.
///
/// Owns session lifecycle and routes windowing-system notifications to the
/// right session; the platform event pump calls the `on_*` methods.
pub struct Tracker {
    system: Arc<dyn WindowSystem>,
    config: Arc<ConfigStore>,
    states: Arc<StateStore>,
    reconciler: Arc<Reconciler>,
    sessions: RwLock<HashMap<u64, WindowSession>>,
    /// Windows seen before their class identifier resolved
    pending: RwLock<HashSet<u64>>,
    metrics: RwLock<TrackerMetrics>,
}

impl Tracker {
    pub fn new(
        system: Arc<dyn WindowSystem>,
        config: Arc<ConfigStore>,
        states: Arc<StateStore>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            system,
            config,
            states,
            reconciler,
            sessions: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashSet::new()),
            metrics: RwLock::new(TrackerMetrics::default()),
        }
    }

    /// Shared access to the persisted state map, for diagnostic surfaces
    pub fn states(&self) -> Arc<StateStore> {
        self.states.clone()
    }

    /// A window became managed. Tracking starts when a rule matches its
    /// class; windows without a class yet are parked until the identifier
    /// resolves.
    pub async fn on_window_appeared(&self, window_id: u64) -> Result<()> {
        if self.sessions.read().await.contains_key(&window_id) {
            return Ok(());
        }
        self.metrics.write().await.windows_seen += 1;

        let Some(window) = self.system.window(window_id)? else {
            return Ok(());
        };

        match window.wm_class {
            Some(class_id) => self.setup_session(window_id, class_id, window.is_mapped).await,
            None => {
                debug!(window = window_id, "Class identifier not available yet, deferring");
                self.pending.write().await.insert(window_id);
                self.metrics.write().await.deferred_setups += 1;
                Ok(())
            }
        }
    }

    /// The windowing system resolved a deferred window's class identifier
    pub async fn on_class_resolved(&self, window_id: u64) -> Result<()> {
        if !self.pending.write().await.remove(&window_id) {
            return Ok(());
        }

        let Some(window) = self.system.window(window_id)? else {
            return Ok(());
        };
        match window.wm_class {
            Some(class_id) => self.setup_session(window_id, class_id, window.is_mapped).await,
            None => Ok(()),
        }
    }

    /// Route a live change notification to the owning session.
    ///
    /// Before the first restore, every event is another restoration
    /// opportunity (some windowing systems fire geometry events before the
    /// window is shown). Afterwards, change events capture state immediately
    /// and reschedule the trailing-debounce save.
    pub async fn on_window_event(&self, window_id: u64, change: WindowChange) -> Result<()> {
        {
            let sessions = self.sessions.read().await;
            let Some(session) = sessions.get(&window_id) else {
                return Ok(());
            };
            if !session.restore_applied() {
                drop(sessions);
                return self.run_restore(window_id).await;
            }
        }

        if change == WindowChange::Shown {
            return Ok(());
        }

        // Capture geometry synchronously at event time; the window may move
        // again before the debounce fires
        let Some(window) = self.system.window(window_id)? else {
            return Ok(());
        };
        let capture = StateCapture::of(&window);

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&window_id) {
            session.arm_save_timer(
                self.reconciler.clone(),
                self.config.clone(),
                capture,
                self.reconciler.tuning().save_debounce(),
            );
        }
        Ok(())
    }

    /// The window is closing: one final non-debounced save, then teardown
    pub async fn on_window_unmanaged(&self, window_id: u64) -> Result<()> {
        let Some(mut session) = self.sessions.write().await.remove(&window_id) else {
            self.pending.write().await.remove(&window_id);
            return Ok(());
        };
        session.cancel_timers();

        if session.restore_applied() {
            let capture = match self.system.window(window_id)? {
                Some(window) => Some(StateCapture::of(&window)),
                None => session.last_capture,
            };
            if let (Some(rule), Some(capture)) =
                (self.config.match_rule(&session.class_id), capture)
            {
                if let Err(err) = self
                    .reconciler
                    .snapshot(&rule, &session.class_id, &capture)
                    .await
                {
                    warn!(window = window_id, error = %err, "Final snapshot failed");
                }
            }
        }

        self.metrics.write().await.teardowns += 1;
        debug!(window = window_id, "Session torn down on unmanage");
        Ok(())
    }

    /// The rule list changed: reload it and drop every session whose class
    /// no longer matches any rule.
    pub async fn on_config_changed(&self) {
        self.config.reload();

        let orphaned: Vec<u64> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|session| self.config.match_rule(&session.class_id).is_none())
                .map(|session| session.window_id)
                .collect()
        };

        for window_id in orphaned {
            info!(window = window_id, "Rule removed, untracking window");
            self.teardown(window_id).await;
        }
    }

    /// Cancel timers and drop the session. Idempotent: unknown windows are a
    /// no-op, and cleanup never fails.
    pub async fn teardown(&self, window_id: u64) -> bool {
        self.pending.write().await.remove(&window_id);

        let Some(mut session) = self.sessions.write().await.remove(&window_id) else {
            return false;
        };
        session.cancel_timers();
        self.metrics.write().await.teardowns += 1;
        true
    }

    /// Tear down every tracked window; used on daemon shutdown
    pub async fn shutdown(&self) {
        let tracked: Vec<u64> = self.sessions.read().await.keys().copied().collect();
        for window_id in tracked {
            self.teardown(window_id).await;
        }
        self.pending.write().await.clear();
        info!("Tracker shut down");
    }

    pub async fn tracked_windows(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.sessions.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn metrics(&self) -> TrackerMetrics {
        self.metrics.read().await.clone()
    }

    async fn setup_session(
        &self,
        window_id: u64,
        class_id: String,
        is_mapped: bool,
    ) -> Result<()> {
        if let Err(err) = self.config.record_known_class(&class_id) {
            warn!(class = %class_id, error = %err, "Could not record known class");
        }

        if self.config.match_rule(&class_id).is_none() {
            debug!(window = window_id, class = %class_id, "No rule matches, window stays untracked");
            return Ok(());
        }

        debug!(window = window_id, class = %class_id, "Tracking window");
        self.sessions
            .write()
            .await
            .insert(window_id, WindowSession::new(window_id, class_id));
        self.metrics.write().await.sessions_created += 1;

        // Windows that are already mapped never get a later "shown" signal;
        // restore right away
        if is_mapped {
            self.run_restore(window_id).await?;
        }
        Ok(())
    }

    async fn run_restore(&self, window_id: u64) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&window_id) else {
            return Ok(());
        };
        if session.restore_applied() {
            return Ok(());
        }

        // Rule lookup happens here, not at session creation, so rule edits
        // made in between are honored
        let Some(rule) = self.config.match_rule(&session.class_id) else {
            return Ok(());
        };

        match self
            .reconciler
            .apply_saved_state(window_id, &session.class_id, &rule)
            .await
        {
            Ok(RestoreOutcome::Applied { workspace_switch }) => {
                if let Some(workspace) = workspace_switch {
                    session.arm_workspace_timer(
                        self.system.clone(),
                        workspace,
                        self.reconciler.tuning().workspace_switch_delay(),
                    );
                }
                session.mark_settled();
                self.metrics.write().await.restores_applied += 1;
            }
            Ok(RestoreOutcome::Skipped) => {
                debug!(window = window_id, "Restore skipped, next event will retry");
            }
            Err(err) => {
                warn!(window = window_id, error = %err, "Restore attempt failed");
            }
        }
        Ok(())
    }
}
