use super::settings_store::{SettingsStore, KEY_APP_STATES};
use crate::models::SavedState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes the persisted per-class saved-state map.
///
/// The map lives as a string-encoded JSON object under the
/// `window-app-states` key. Reads tolerate a malformed document by degrading
/// to an empty map; writes only hit the backing store when a merge actually
/// changed the entry.
pub struct StateStore {
    store: Arc<dyn SettingsStore>,
}

impl StateStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// The full persisted map
    pub fn states(&self) -> HashMap<String, SavedState> {
        match self.store.get_string(KEY_APP_STATES) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "Saved-state map is malformed, treating as empty");
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read saved-state map, treating as empty");
                HashMap::new()
            }
        }
    }

    /// Saved state for one class identifier
    pub fn get(&self, class_id: &str) -> Option<SavedState> {
        self.states().remove(class_id)
    }

    /// Read-modify-write merge for one class entry. The closure receives the
    /// current entry (or a fresh default); the result is committed only when
    /// it differs from what was stored. Returns whether a write happened.
    pub fn merge(
        &self,
        class_id: &str,
        update: impl FnOnce(&mut SavedState),
    ) -> Result<bool> {
        let mut states = self.states();
        let previous = states.get(class_id).cloned();

        let mut entry = previous.clone().unwrap_or_default();
        update(&mut entry);

        let unchanged = match &previous {
            Some(stored) => *stored == entry,
            // Nothing stored and nothing recorded: don't create empty entries
            None => entry == SavedState::default(),
        };
        if unchanged {
            debug!(class = class_id, "Saved state unchanged, skipping write");
            return Ok(false);
        }

        states.insert(class_id.to_string(), entry);
        self.write_map(&states)?;
        Ok(true)
    }

    /// Drop one class entry; returns whether it existed
    pub fn clear(&self, class_id: &str) -> Result<bool> {
        let mut states = self.states();
        if states.remove(class_id).is_none() {
            return Ok(false);
        }
        self.write_map(&states)?;
        Ok(true)
    }

    fn write_map(&self, states: &HashMap<String, SavedState>) -> Result<()> {
        let raw = serde_json::to_string(states)?;
        self.store.set_string(KEY_APP_STATES, &raw)
    }
}
