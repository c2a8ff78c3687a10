// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. sync::SyncState)
    clippy::module_name_repetitions
)]

//! # Carve
//!
//! Extract a region of a document into a mirror and keep the two in sync.
//!
//! Edits made in the mirror are written back over the region; edits made in
//! the source move and resize the region and are copied into the mirror.
//!
//! ## Architecture
//!
//! Carve is a single-threaded, host-driven engine:
//! - **Host**: owns documents and reports what users do to them
//! - **Session**: routes host notifications and fires timers
//! - **Pairing**: one region and its mirror, with its own propagation state
//!
//! Time is always passed in by the caller, so every behavior can be driven
//! deterministically from tests.
//!
//! ## Modules
//!
//! - [`text`]: Positions, ranges, edits, and position translation
//! - [`editor`]: Rope-backed text buffers
//! - [`sync`]: Range tracking, batching, and propagation
//! - [`session`]: Pairing lifecycle and event routing
//! - [`host`]: The host boundary, with in-memory and file-backed hosts
//! - [`language`]: Language hints for mirrors
//! - [`watcher`]: File watching
//! - [`config`]: Settings and rc files
//! - [`app`]: Command-line driver

pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod host;
pub mod language;
pub mod session;
pub mod sync;
pub mod text;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{MirrorBacking, SyncConfig};
    pub use crate::error::SyncError;
    pub use crate::host::{DocId, Event, Host, MemoryHost};
    pub use crate::session::Session;
    pub use crate::text::{EditOperation, TextPosition, TextRange};
}
