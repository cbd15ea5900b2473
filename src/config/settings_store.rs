use crate::{PlacekeeperError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Settings key holding the JSON array of rules
pub const KEY_APP_CONFIGS: &str = "window-app-configs";
/// Settings key holding the JSON object of per-class saved states
pub const KEY_APP_STATES: &str = "window-app-states";
/// Settings key holding the sorted list of observed class identifiers
pub const KEY_KNOWN_CLASSES: &str = "known-wm-classes";

/// Callback invoked with the key that changed
pub type SettingsListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Key-value settings collaborator.
///
/// Holds string-encoded JSON documents and one structured string-array value,
/// with per-key change notification. Matches the preferences backend the
/// configuration UI writes to.
pub trait SettingsStore: Send + Sync {
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    fn set_string(&self, key: &str, value: &str) -> Result<()>;

    fn get_string_list(&self, key: &str) -> Result<Vec<String>>;

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()>;

    /// Register a change listener for `key`; returns a handle for release
    fn subscribe(&self, key: &str, listener: SettingsListener) -> Uuid;

    /// Release a previously registered listener. Best-effort: releasing an
    /// unknown handle returns `false` instead of failing.
    fn unsubscribe(&self, id: Uuid) -> bool;
}

type ListenerMap = RwLock<HashMap<Uuid, (String, SettingsListener)>>;

fn notify(listeners: &ListenerMap, key: &str) {
    let matching: Vec<SettingsListener> = listeners
        .read()
        .unwrap()
        .values()
        .filter(|(listener_key, _)| listener_key == key)
        .map(|(_, listener)| Arc::clone(listener))
        .collect();

    // Listeners run outside the registry lock so they may re-enter the store
    for listener in matching {
        listener(key);
    }
}

/// File-backed settings store: one JSON document holding every key, written
/// atomically via a temp file rename.
pub struct FileSettingsStore {
    path: PathBuf,
    values: RwLock<HashMap<String, Value>>,
    listeners: ListenerMap,
}

impl FileSettingsStore {
    /// Open (or create) the store under the given directory
    pub fn open(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        fs::create_dir_all(&config_dir)?;

        let path = config_dir.join("settings.json");
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Settings document is malformed, starting from empty"
                );
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
            listeners: RwLock::new(HashMap::new()),
        })
    }

    /// Default config directory, `~/.config/placekeeper`
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("placekeeper")
    }

    fn persist(&self) -> Result<()> {
        let content = {
            let values = self.values.read().unwrap();
            serde_json::to_string_pretty(&*values)
                .map_err(|err| PlacekeeperError::StoreError(err.to_string()))?
        };

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(temp_path, &self.path)?;
        Ok(())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value);
        self.persist()?;
        notify(&self.listeners, key);
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string()))
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        let values = self.values.read().unwrap();
        let list = values
            .get(key)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(list)
    }

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let entries = values.iter().cloned().map(Value::String).collect();
        self.set_value(key, Value::Array(entries))
    }

    fn subscribe(&self, key: &str, listener: SettingsListener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .unwrap()
            .insert(id, (key.to_string(), listener));
        id
    }

    fn unsubscribe(&self, id: Uuid) -> bool {
        self.listeners.write().unwrap().remove(&id).is_some()
    }
}

/// In-memory settings store mirroring the file store's contract, used by the
/// test suite and available to embedding code that manages persistence itself.
#[derive(Default)]
pub struct InMemorySettingsStore {
    values: RwLock<HashMap<String, Value>>,
    listeners: ListenerMap,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_value(&self, key: &str, value: Value) {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value);
        notify(&self.listeners, key);
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string()));
        Ok(())
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        let values = self.values.read().unwrap();
        let list = values
            .get(key)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(list)
    }

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let entries = values.iter().cloned().map(Value::String).collect();
        self.set_value(key, Value::Array(entries));
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: SettingsListener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners
            .write()
            .unwrap()
            .insert(id, (key.to_string(), listener));
        id
    }

    fn unsubscribe(&self, id: Uuid) -> bool {
        self.listeners.write().unwrap().remove(&id).is_some()
    }
}
