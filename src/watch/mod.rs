// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the per-category `watch` / `exclude` glob patterns.
//! - Compiling the per-category `src` patterns for entry enumeration.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that turns raw
//!   events into per-category change events for the runtime.
//!
//! It does **not** know about transforms or the build cache; it only turns
//! filesystem changes into category-level change events.

pub mod patterns;
pub mod watcher;

pub use patterns::{
    build_watch_profiles, glob_base, relative_str, CategorySources, CategoryWatchProfile,
};
pub use watcher::{spawn_watcher, WatcherHandle};
