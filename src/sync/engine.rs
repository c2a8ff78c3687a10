use tracing::debug;

use crate::error::{Result, SyncError};
use crate::host::{DocId, Host, HostError};
use crate::sync::batcher::ChangeSet;
use crate::sync::pairing::{Direction, Pairing, SyncState};
use crate::sync::tracker::recompute_batches;
use crate::text::{EditOperation, TextPosition, TextRange};

/// What a propagation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// One replace was applied to the target; its echo is now expected.
    Applied,
    /// The target already held the text.
    Unchanged,
    /// Another propagation is in flight; the work was queued.
    Deferred,
}

/// Translate a failed read into the error the caller should see.
pub(crate) fn read_failure(doc: DocId, range: TextRange, err: HostError) -> SyncError {
    match err {
        HostError::NotOpen(doc) => SyncError::StaleDocument(doc),
        _ => SyncError::InvalidSelection { doc, range },
    }
}

impl Pairing {
    fn ensure_live<H: Host>(&self, host: &H) -> Result<()> {
        if self.is_closed() {
            return Err(SyncError::StaleDocument(self.source));
        }
        for doc in [self.source, self.mirror] {
            if !host.is_open(doc) {
                return Err(SyncError::StaleDocument(doc));
            }
        }
        Ok(())
    }

    /// Fold released source batches into the tracked range.
    pub(crate) fn absorb(&mut self, batches: &[ChangeSet]) {
        if !batches.is_empty() {
            self.tracked = recompute_batches(self.tracked, batches);
        }
    }

    /// Fold every queued source edit into the tracked range.
    pub(crate) fn settle(&mut self) {
        let batches = self.batcher.drain();
        self.absorb(&batches);
    }

    /// Whether `edits` is the echo of this pairing's in-flight replace on
    /// `doc`. A match is consumed and the pairing returns to idle.
    pub(crate) fn take_echo(&mut self, doc: DocId, edits: &[EditOperation]) -> bool {
        let matched = match &self.sync {
            SyncState::Propagating {
                target, expected, ..
            } => *target == doc && edits == std::slice::from_ref(expected),
            SyncState::Idle => false,
        };
        if matched {
            self.sync = SyncState::Idle;
        }
        matched
    }

    /// Copy the tracked source region into the mirror.
    ///
    /// Queued source edits are folded into the tracked range first. The mirror
    /// is rewritten wholesale with a single replace.
    ///
    /// # Errors
    /// Fails with [`SyncError::StaleDocument`] if either side has closed and
    /// [`SyncError::ApplyEditFailed`] if the host rejects the replace.
    pub fn push_source_text<H: Host>(&mut self, host: &mut H) -> Result<Propagation> {
        if !self.is_idle() {
            return Ok(Propagation::Deferred);
        }
        self.ensure_live(host)?;
        self.settle();

        let text = host
            .read_range(self.source, self.tracked)
            .map_err(|err| read_failure(self.source, self.tracked, err))?;
        host.highlight_region(self.source, self.tracked);

        let current = host
            .read_full_text(self.mirror)
            .map_err(|err| read_failure(self.mirror, TextRange::default(), err))?;
        if current == text {
            return Ok(Propagation::Unchanged);
        }

        let whole = TextRange::spanning(TextPosition::origin(), &current);
        host.apply_replace(self.mirror, whole, &text)
            .map_err(SyncError::ApplyEditFailed)?;
        debug!(source = %self.source, mirror = %self.mirror, range = %self.tracked, "source -> mirror");
        self.sync = SyncState::Propagating {
            direction: Direction::SourceToMirror,
            target: self.mirror,
            expected: EditOperation::new(whole, text),
        };
        Ok(Propagation::Applied)
    }

    /// Copy the mirror's content over the tracked source region.
    ///
    /// Called while another propagation is in flight, this only marks the
    /// mirror as pending. On success the tracked range is resized to the new
    /// text and the autosave timer restarts.
    ///
    /// # Errors
    /// Fails with [`SyncError::StaleDocument`] if either side has closed and
    /// [`SyncError::ApplyEditFailed`] if the host rejects the replace.
    pub fn push_mirror_text<H: Host>(&mut self, host: &mut H, now_ms: u64) -> Result<Propagation> {
        if !self.is_idle() {
            self.mirror_pending = true;
            return Ok(Propagation::Deferred);
        }
        self.ensure_live(host)?;
        self.settle();

        let text = host
            .read_full_text(self.mirror)
            .map_err(|err| read_failure(self.mirror, TextRange::default(), err))?;
        let current = host
            .read_range(self.source, self.tracked)
            .map_err(|err| read_failure(self.source, self.tracked, err))?;
        if current == text {
            return Ok(Propagation::Unchanged);
        }

        host.apply_replace(self.source, self.tracked, &text)
            .map_err(SyncError::ApplyEditFailed)?;
        debug!(source = %self.source, mirror = %self.mirror, range = %self.tracked, "mirror -> source");
        let expected = EditOperation::new(self.tracked, text);
        self.tracked = TextRange::spanning(self.tracked.start, &expected.inserted);
        self.sync = SyncState::Propagating {
            direction: Direction::MirrorToSource,
            target: self.source,
            expected,
        };
        self.autosave.schedule((), now_ms);
        Ok(Propagation::Applied)
    }
}
