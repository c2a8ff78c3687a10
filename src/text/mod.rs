//! Positions, ranges, and edits over line/column addressed text.
//!
//! This module handles:
//! - The value types every other layer speaks ([`TextPosition`],
//!   [`TextRange`], [`EditOperation`])
//! - Mapping a position through an edit ([`translate`])
//! - Reducing a full-text rewrite to one edit ([`diff::single_edit`])

pub mod diff;
mod translate;
mod types;

pub use translate::translate;
pub use types::{EditOperation, TextPosition, TextRange};
