use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Reconciliation tunables.
///
/// Defaults match the reference behavior; a `settings.toml` next to the
/// settings document may override individual values. This is the daemon's own
/// configuration, separate from the rule/state documents the preferences UI
/// owns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcilerTuning {
    /// Quiet window before a change event is persisted
    pub save_debounce_ms: u64,
    /// Delay before activating a restored workspace
    pub workspace_switch_delay_ms: u64,
    /// Smallest width/height considered a real saved size
    pub min_sane_size: i32,
    /// Slack around the work area when validating a saved position
    pub work_area_tolerance: i32,
    /// Diagonal offset applied per collision-avoidance step
    pub collision_step: i32,
    /// Two windows closer than this on both axes count as colliding
    pub collision_tolerance: i32,
    /// Upper bound on collision-avoidance iterations
    pub max_collision_attempts: u32,
    /// Minimum strip of the frame kept inside the work area when clamping
    pub edge_margin: i32,
}

impl Default for ReconcilerTuning {
    fn default() -> Self {
        Self {
            save_debounce_ms: 500,
            workspace_switch_delay_ms: 250,
            min_sane_size: 50,
            work_area_tolerance: 50,
            collision_step: 50,
            collision_tolerance: 50,
            max_collision_attempts: 50,
            edge_margin: 50,
        }
    }
}

impl ReconcilerTuning {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn workspace_switch_delay(&self) -> Duration {
        Duration::from_millis(self.workspace_switch_delay_ms)
    }

    /// Load overrides from `<config_dir>/settings.toml` when present.
    /// A missing file yields the defaults; a malformed one is logged and
    /// ignored the same way the JSON documents are.
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join("settings.toml");
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match toml::from_str(&content) {
            Ok(tuning) => tuning,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Tuning file is malformed, using defaults"
                );
                Self::default()
            }
        }
    }
}
