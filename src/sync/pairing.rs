use crate::config::SyncConfig;
use crate::host::{DocId, TempResource};
use crate::sync::batcher::ChangeBatcher;
use crate::sync::timer::Debouncer;
use crate::text::{EditOperation, TextRange};

/// Lifecycle of a pairing. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Created,
    Active,
    Closed,
}

/// Which way text is flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SourceToMirror,
    MirrorToSource,
}

/// Re-entrancy guard for propagation.
///
/// A propagation holds `Propagating` from the moment it applies its replace
/// until the host reports that very replace back (the echo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Propagating {
        direction: Direction,
        target: DocId,
        expected: EditOperation,
    },
}

/// The tracked relationship between a source region and its mirror.
#[derive(Debug)]
pub struct Pairing {
    pub(super) source: DocId,
    pub(super) mirror: DocId,
    pub(super) tracked: TextRange,
    pub(super) state: PairingState,
    pub(super) sync: SyncState,
    pub(super) programmatic_save: bool,
    pub(super) mirror_pending: bool,
    pub(super) temp: Option<TempResource>,
    pub(crate) batcher: ChangeBatcher,
    pub(crate) autosave: Debouncer<()>,
}

impl Pairing {
    pub fn new(
        source: DocId,
        mirror: DocId,
        tracked: TextRange,
        temp: Option<TempResource>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            source,
            mirror,
            tracked,
            state: PairingState::Created,
            sync: SyncState::Idle,
            programmatic_save: false,
            mirror_pending: false,
            temp,
            batcher: ChangeBatcher::new(config.batch_delay_ms),
            autosave: Debouncer::new(config.autosave_delay_ms),
        }
    }

    pub const fn source(&self) -> DocId {
        self.source
    }

    pub const fn mirror(&self) -> DocId {
        self.mirror
    }

    /// Where the extracted text currently lives in the source.
    pub const fn tracked_range(&self) -> TextRange {
        self.tracked
    }

    pub const fn state(&self) -> PairingState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == PairingState::Closed
    }

    pub const fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.sync, SyncState::Idle)
    }

    pub const fn is_programmatic_save(&self) -> bool {
        self.programmatic_save
    }

    pub const fn temp_resource(&self) -> Option<&TempResource> {
        self.temp.as_ref()
    }

    /// Queued source edits not yet folded into the tracked range.
    pub fn pending_edits(&self) -> usize {
        self.batcher.pending_edits()
    }

    pub(crate) fn activate(&mut self) {
        if self.state == PairingState::Created {
            self.state = PairingState::Active;
        }
    }

    /// Enter the terminal state, cancelling every timer.
    ///
    /// Returns `false` if the pairing was already closed.
    pub(crate) fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = PairingState::Closed;
        self.sync = SyncState::Idle;
        self.batcher.cancel();
        self.autosave.cancel_pending();
        self.programmatic_save = false;
        self.mirror_pending = false;
        true
    }

    pub(crate) fn take_temp(&mut self) -> Option<TempResource> {
        self.temp.take()
    }

    pub(crate) const fn begin_programmatic_save(&mut self) {
        self.programmatic_save = true;
    }

    /// Consume the programmatic-save flag; `true` if it was set.
    pub(crate) const fn end_programmatic_save(&mut self) -> bool {
        let was = self.programmatic_save;
        self.programmatic_save = false;
        was
    }

    pub(crate) const fn take_mirror_pending(&mut self) -> bool {
        let was = self.mirror_pending;
        self.mirror_pending = false;
        was
    }

    /// Earliest moment a timer owned by this pairing wants to fire.
    pub fn next_deadline(&self) -> Option<u64> {
        [self.batcher.deadline(), self.autosave.deadline()]
            .into_iter()
            .flatten()
            .min()
    }
}
