//! Data models for the Placekeeper reconciliation engine

pub mod rule;
pub mod saved_state;

pub use rule::*;
pub use saved_state::*;
