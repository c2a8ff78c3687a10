/// A restartable one-shot timer driven by caller-supplied timestamps.
///
/// Scheduling stores a payload; the payload comes back from
/// [`Debouncer::take_ready`] once `delay_ms` has passed since the most
/// recent schedule. Nothing happens on its own: the owner polls it.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Arm the timer with `value`, replacing anything already pending and
    /// restarting the window.
    pub fn schedule(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms));
    }

    /// Disarm the timer without firing it.
    pub fn cancel_pending(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// The armed value, for adjusting it without restarting the window.
    pub fn pending_mut(&mut self) -> Option<&mut T> {
        self.pending.as_mut().map(|(value, _)| value)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// When the pending value becomes ready.
    pub fn deadline(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|(_, queued_at)| queued_at.saturating_add(self.delay_ms))
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.deadline().is_some_and(|deadline| now_ms >= deadline)
    }

    /// Fire the timer if its window has elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<T> {
        if self.is_due(now_ms) {
            self.cancel_pending()
        } else {
            None
        }
    }
}
