//! Placekeeper - Per-Application Window Position and State Restorer
//!
//! Placekeeper watches externally managed windows, matches them against
//! user-defined per-application rules, and persists/restores their geometry,
//! maximized/minimized/pinned state and workspace assignment across window
//! lifecycles.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod shell;

pub use models::*;
pub use services::*;

/// Result type alias for Placekeeper operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to Placekeeper operations
#[derive(thiserror::Error, Debug)]
pub enum PlacekeeperError {
    #[error("Window not found: {0}")]
    WindowNotFound(u64),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(i32),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Settings store error: {0}")]
    StoreError(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
