//! Local store persistence.
//!
//! This module provides:
//! - Atomic JSON file operations
//! - The avatar entry and mod mapping record types
//! - `LocalStore`, typed load/save of both documents

mod atomic;
mod manager;
mod types;

pub use atomic::{atomic_read_json, atomic_write_json};
pub use manager::LocalStore;
pub use types::{AvatarEntry, ModMapping};
