//! Core services of the reconciliation engine

pub mod reconciler;
pub mod session;
pub mod tracker;

pub use reconciler::*;
pub use session::*;
pub use tracker::*;
