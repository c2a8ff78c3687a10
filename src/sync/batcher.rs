use std::mem;

use crate::sync::timer::Debouncer;
use crate::text::EditOperation;

/// The edits of one change notification, in increasing position order and in
/// the coordinates of the document before that notification.
pub type ChangeSet = Vec<EditOperation>;

/// Coalesces source-document change notifications into one batch per quiet
/// window.
#[derive(Debug, Clone)]
pub struct ChangeBatcher {
    pending: Vec<ChangeSet>,
    timer: Debouncer<()>,
}

impl ChangeBatcher {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            pending: Vec::new(),
            timer: Debouncer::new(delay_ms),
        }
    }

    /// Queue a notification's edits and restart the window.
    pub fn push(&mut self, edits: ChangeSet, now_ms: u64) {
        if edits.is_empty() {
            return;
        }
        self.pending.push(edits);
        self.timer.schedule((), now_ms);
    }

    /// Hand over the whole queue once the window has elapsed quietly.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<Vec<ChangeSet>> {
        self.timer.take_ready(now_ms)?;
        Some(mem::take(&mut self.pending))
    }

    /// Hand over the queue right away, cancelling the window.
    pub fn drain(&mut self) -> Vec<ChangeSet> {
        self.timer.cancel_pending();
        mem::take(&mut self.pending)
    }

    /// Drop everything queued.
    pub fn cancel(&mut self) {
        self.drain();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of queued edit operations across all change sets.
    pub fn pending_edits(&self) -> usize {
        self.pending.iter().map(Vec::len).sum()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.timer.deadline()
    }
}
