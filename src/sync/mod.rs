//! Keeping an extracted region and its mirror in step.
//!
//! This module handles:
//! - Timers driven by caller-supplied timestamps ([`Debouncer`])
//! - Coalescing source change notifications ([`ChangeBatcher`])
//! - Following the region through source edits ([`recompute`])
//! - Per-pairing propagation with echo suppression ([`Pairing`])

mod batcher;
mod engine;
mod pairing;
mod timer;
mod tracker;

pub(crate) use engine::read_failure;

pub use batcher::{ChangeBatcher, ChangeSet};
pub use engine::Propagation;
pub use pairing::{Direction, Pairing, PairingState, SyncState};
pub use timer::Debouncer;
pub use tracker::{recompute, recompute_batches};
