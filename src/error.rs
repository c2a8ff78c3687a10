//! Failures of sync and lifecycle operations.
use thiserror::Error;

use crate::host::{DocId, HostError, NoticeLevel};
use crate::text::TextRange;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not open mirror: {0}")]
    OpenFailed(#[source] HostError),

    #[error("Could not show mirror: {0}")]
    ShowFailed(#[source] HostError),

    #[error("Could not apply edit: {0}")]
    ApplyEditFailed(#[source] HostError),

    #[error("Could not save: {0}")]
    SaveFailed(#[source] HostError),

    #[error("Temporary file error: {0}")]
    TempResourceError(#[source] HostError),

    #[error("{0} closed mid-operation")]
    StaleDocument(DocId),

    #[error("Selection {range} is not inside {doc}")]
    InvalidSelection { doc: DocId, range: TextRange },
}

impl SyncError {
    /// Whether the user should hear about this failure.
    ///
    /// Closing races are expected and frequent, so stale documents abort
    /// quietly.
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::StaleDocument(_))
    }

    pub const fn notice_level(&self) -> NoticeLevel {
        match self {
            Self::TempResourceError(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
