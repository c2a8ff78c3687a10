//! The boundary between the sync engine and whatever owns the documents.
//!
//! The engine never touches views, files, or UI directly. It asks a [`Host`]
//! to open, read, edit, and save documents, and it learns about user activity
//! by draining the host's queued [`Event`]s.
//!
//! Two hosts ship with the crate:
//! - [`MemoryHost`]: in-memory documents with user-simulation helpers
//! - [`FsHost`]: files on disk, watched for external edits

mod fs;
mod memory;

pub use fs::FsHost;
pub use memory::{FailurePlan, MemoryHost};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::text::{EditOperation, TextRange};

/// Opaque identity of a document, allocated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(u64);

impl DocId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Handle to a temporary resource backing a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempResource {
    pub id: u64,
    /// On-disk location, for hosts that use real files.
    pub path: Option<PathBuf>,
}

/// What a new mirror should start out as.
#[derive(Debug, Clone, Copy)]
pub struct MirrorSeed<'a> {
    pub content: &'a str,
    pub language_hint: Option<&'a str>,
    pub resource: Option<&'a TempResource>,
}

/// Severity of a message surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        })
    }
}

/// A notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A document was edited; `edits` is one change set.
    DocumentChanged { doc: DocId, edits: Vec<EditOperation> },
    /// A document was written to its backing store.
    DocumentSaved(DocId),
    /// The set of visible documents changed.
    VisibleSetChanged,
    /// A document is gone.
    DocumentClosed(DocId),
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("{0} is not open")]
    NotOpen(DocId),

    #[error("range {range} does not fit {doc}")]
    InvalidRange { doc: DocId, range: TextRange },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the engine needs from its environment.
///
/// Every successful [`Host::apply_replace`] must later surface as exactly one
/// [`Event::DocumentChanged`] carrying that replacement verbatim; the engine
/// relies on it to recognize its own edits.
pub trait Host {
    /// Create a new document seeded with text.
    ///
    /// # Errors
    /// Returns an error if the host cannot create the document.
    fn open_mirror(&mut self, seed: MirrorSeed<'_>) -> Result<DocId, HostError>;

    /// Bring a mirror into view.
    ///
    /// # Errors
    /// Returns an error if the mirror cannot be shown.
    fn show_mirror(&mut self, mirror: DocId) -> Result<(), HostError>;

    /// Close a mirror the engine opened.
    ///
    /// # Errors
    /// Returns an error if the mirror is unknown or cannot be closed.
    fn close_mirror(&mut self, mirror: DocId) -> Result<(), HostError>;

    /// # Errors
    /// Returns an error if the document is not open.
    fn read_full_text(&self, doc: DocId) -> Result<String, HostError>;

    /// # Errors
    /// Returns an error if the document is not open or the range does not fit.
    fn read_range(&self, doc: DocId, range: TextRange) -> Result<String, HostError>;

    /// Atomically replace `range` with `text`.
    ///
    /// # Errors
    /// Returns an error if the edit was not applied.
    fn apply_replace(&mut self, doc: DocId, range: TextRange, text: &str)
    -> Result<(), HostError>;

    /// # Errors
    /// Returns an error if the document could not be saved.
    fn save_document(&mut self, doc: DocId) -> Result<(), HostError>;

    fn is_open(&self, doc: DocId) -> bool;

    fn is_visible(&self, doc: DocId) -> bool;

    /// Syntax name to give a mirror of `doc`.
    fn language_hint(&self, doc: DocId) -> Option<String>;

    /// # Errors
    /// Returns an error if the resource cannot be created.
    fn write_temp_resource(
        &mut self,
        bytes: &[u8],
        language_hint: Option<&str>,
    ) -> Result<TempResource, HostError>;

    /// # Errors
    /// Returns an error if the resource cannot be removed.
    fn delete_temp_resource(&mut self, resource: &TempResource) -> Result<(), HostError>;

    /// Cosmetic only.
    fn highlight_region(&mut self, doc: DocId, range: TextRange) {
        let _ = (doc, range);
    }

    fn clear_highlight(&mut self, doc: DocId) {
        let _ = doc;
    }

    fn notify_user(&mut self, level: NoticeLevel, message: &str);

    /// Drain queued notifications, oldest first.
    fn take_events(&mut self) -> Vec<Event>;
}
