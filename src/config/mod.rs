//! Configuration and persistence layer for Placekeeper

pub mod rules;
pub mod settings_store;
pub mod state;
pub mod tuning;

pub use rules::ConfigStore;
pub use settings_store::{
    FileSettingsStore, InMemorySettingsStore, SettingsListener, SettingsStore,
    KEY_APP_CONFIGS, KEY_APP_STATES, KEY_KNOWN_CLASSES,
};
pub use state::StateStore;
pub use tuning::ReconcilerTuning;
