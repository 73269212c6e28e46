//! API implementation submodules.
//!
//! Each submodule contains `impl WorkshopMirror` blocks that extend the
//! public API. The struct definition remains in `lib.rs`.

mod builder;
mod library;
mod lifecycle;

pub use builder::WorkshopMirrorBuilder;
