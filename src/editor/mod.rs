//! Rope-backed document storage shared by the hosts.
//!
//! Provides a text buffer addressed by [`crate::text::TextPosition`] whose
//! mutations come back as [`crate::text::EditOperation`]s.

mod buffer;

pub use buffer::EditorBuffer;
