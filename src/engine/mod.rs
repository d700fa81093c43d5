// src/engine/mod.rs

//! The watch reactor.
//!
//! This module ties together:
//! - the per-category state machine (Idle -> Dispatching -> Building)
//! - the coalescing queue for changes that arrive mid-build
//! - the main runtime event loop that reacts to:
//!   - filesystem change events
//!   - build completion events
//!   - shutdown signals

pub mod pending;
pub mod runtime;

pub use pending::PendingChanges;
pub use runtime::{ChangeEvent, ChangeKind, Runtime, RuntimeEvent};
