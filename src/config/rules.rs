use super::settings_store::{SettingsStore, KEY_APP_CONFIGS, KEY_KNOWN_CLASSES};
use crate::models::{match_rule, Rule};
use crate::Result;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Cached view of the configured rule list.
///
/// The cache is refreshed from the backing store on construction, on
/// `reload()`, and by the tracker whenever the store signals a change, so a
/// live rule edit takes effect on the next lookup. Per-window match decisions
/// are never cached.
pub struct ConfigStore {
    store: Arc<dyn SettingsStore>,
    rules: RwLock<Vec<Rule>>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let config = Self {
            store,
            rules: RwLock::new(Vec::new()),
        };
        config.reload();
        config
    }

    /// Re-parse the rule list from the backing store. A malformed document is
    /// logged and treated as an empty list; it never propagates.
    pub fn reload(&self) {
        let parsed = match self.store.get_string(KEY_APP_CONFIGS) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Rule>>(&raw) {
                Ok(rules) => rules,
                Err(err) => {
                    warn!(error = %err, "Rule list is malformed, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read rule list, treating as empty");
                Vec::new()
            }
        };

        debug!(count = parsed.len(), "Loaded window rules");
        *self.rules.write().unwrap() = parsed;
    }

    /// Snapshot of the current rule list
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.read().unwrap().clone()
    }

    /// First rule matching `class_id`, by list order
    pub fn match_rule(&self, class_id: &str) -> Option<Rule> {
        let rules = self.rules.read().unwrap();
        match_rule(class_id, &rules).cloned()
    }

    /// Replace the persisted rule list (used by the CLI surface)
    pub fn save_rules(&self, rules: &[Rule]) -> Result<()> {
        let raw = serde_json::to_string(rules)?;
        self.store.set_string(KEY_APP_CONFIGS, &raw)?;
        *self.rules.write().unwrap() = rules.to_vec();
        Ok(())
    }

    /// Record an observed class identifier in the known-classes list,
    /// deduplicated and kept sorted.
    pub fn record_known_class(&self, class_id: &str) -> Result<()> {
        let mut known = self.store.get_string_list(KEY_KNOWN_CLASSES)?;
        if known.iter().any(|entry| entry == class_id) {
            return Ok(());
        }

        known.push(class_id.to_string());
        known.sort();
        self.store.set_string_list(KEY_KNOWN_CLASSES, &known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings_store::InMemorySettingsStore;

    fn store_with_rules(raw: &str) -> (Arc<InMemorySettingsStore>, ConfigStore) {
        let store = Arc::new(InMemorySettingsStore::new());
        store.set_string(KEY_APP_CONFIGS, raw).unwrap();
        let config = ConfigStore::new(store.clone() as Arc<dyn SettingsStore>);
        (store, config)
    }

    #[test]
    fn parses_rule_list_from_store() {
        let (_, config) = store_with_rules(
            r#"[{"classPattern": "firefox", "restorePosition": true},
                {"classPattern": "org\\..*", "isRegex": true, "restoreSize": true}]"#,
        );

        assert_eq!(config.rules().len(), 2);
        let matched = config.match_rule("org.gnome.Terminal").unwrap();
        assert!(matched.restore_size);
    }

    #[test]
    fn malformed_rules_degrade_to_empty() {
        let (_, config) = store_with_rules("{definitely not an array");
        assert!(config.rules().is_empty());
        assert!(config.match_rule("firefox").is_none());
    }

    #[test]
    fn reload_picks_up_store_edits() {
        let (store, config) = store_with_rules("[]");
        assert!(config.match_rule("firefox").is_none());

        store
            .set_string(KEY_APP_CONFIGS, r#"[{"classPattern": "firefox"}]"#)
            .unwrap();
        config.reload();

        assert!(config.match_rule("firefox").is_some());
    }

    #[test]
    fn known_classes_stay_sorted_and_deduplicated() {
        let store = Arc::new(InMemorySettingsStore::new());
        let config = ConfigStore::new(store.clone() as Arc<dyn SettingsStore>);

        config.record_known_class("zsh-term").unwrap();
        config.record_known_class("editor").unwrap();
        config.record_known_class("zsh-term").unwrap();

        assert_eq!(
            store.get_string_list(KEY_KNOWN_CLASSES).unwrap(),
            vec!["editor".to_string(), "zsh-term".to_string()]
        );
    }

    #[test]
    fn save_rules_round_trips() {
        let store = Arc::new(InMemorySettingsStore::new());
        let config = ConfigStore::new(store.clone() as Arc<dyn SettingsStore>);

        let rules = vec![Rule::for_class("firefox")];
        config.save_rules(&rules).unwrap();

        let reloaded = ConfigStore::new(store as Arc<dyn SettingsStore>);
        assert_eq!(reloaded.rules(), rules);
    }
}
