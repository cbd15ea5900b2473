//! Windowing-system collaborator boundary
//!
//! The compositor/window manager is an external collaborator; this module
//! defines the trait Placekeeper programs against, plus an in-memory
//! implementation used by the test suite.

pub mod in_memory;
pub mod window_system;

pub use in_memory::*;
pub use window_system::*;
