//! Pairing lifecycle and event routing.
//!
//! A [`Session`] owns a [`Host`], every live [`Pairing`], and the timers that
//! drive them. The caller feeds it time and lets it drain host notifications:
//! - [`Session::request_extraction`]: debounced creation of a pairing
//! - [`Session::pump`]: route queued host notifications
//! - [`Session::tick`]: fire due extraction, batch, and autosave timers
//! - [`Session::close`] / [`Session::shutdown`]: teardown

mod registry;

pub use registry::Registry;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::mem;

use tracing::{debug, info, warn};

use crate::config::{MirrorBacking, SyncConfig};
use crate::error::{Result, SyncError};
use crate::host::{DocId, Event, Host, MirrorSeed, TempResource};
use crate::sync::{Debouncer, Pairing, Propagation, read_failure, recompute};
use crate::text::{EditOperation, TextRange};

/// Counters for what the session has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub events: usize,
    pub source_to_mirror: usize,
    pub mirror_to_source: usize,
    pub echoes_suppressed: usize,
    pub autosaves: usize,
    pub teardowns: usize,
}

/// Why a pairing is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closure {
    Superseded,
    MirrorGone,
    SourceClosed,
    Explicit,
    Shutdown,
}

impl Closure {
    /// Whether a pending extraction for the same source should be dropped.
    const fn suppresses_requests(self) -> bool {
        matches!(self, Self::MirrorGone | Self::SourceClosed | Self::Explicit)
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Superseded => "superseded",
            Self::MirrorGone => "mirror closed",
            Self::SourceClosed => "source closed",
            Self::Explicit => "closed",
            Self::Shutdown => "shutdown",
        })
    }
}

pub struct Session<H: Host> {
    host: H,
    config: SyncConfig,
    registry: Registry,
    requests: HashMap<DocId, Debouncer<TextRange>>,
    inbox: VecDeque<Event>,
    stats: SyncStats,
}

impl<H: Host> Session<H> {
    pub fn new(host: H, config: SyncConfig) -> Self {
        Self {
            host,
            config,
            registry: Registry::new(),
            requests: HashMap::new(),
            inbox: VecDeque::new(),
            stats: SyncStats::default(),
        }
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pairing(&self, source: DocId) -> Option<&Pairing> {
        self.registry.get(source)
    }

    pub const fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn has_pending_requests(&self) -> bool {
        self.requests.values().any(Debouncer::is_pending)
    }

    /// Ask for `range` of `source` to be extracted once requests settle.
    ///
    /// Requests for the same source inside the debounce window collapse into
    /// the last one. Source edits made while the request waits move the
    /// range with the text it selected.
    pub fn request_extraction(&mut self, source: DocId, range: TextRange, now_ms: u64) {
        let delay = self.config.extract_debounce_ms;
        self.requests
            .entry(source)
            .or_insert_with(|| Debouncer::new(delay))
            .schedule(range, now_ms);
    }

    /// Extract `range` of `source` into a new mirror right away.
    ///
    /// An existing pairing for `source` is torn down first.
    ///
    /// # Errors
    /// Returns the [`SyncError`] that stopped the extraction; nothing is
    /// installed in that case. Temp-resource failures are reported and the
    /// mirror is opened without backing.
    pub fn extract_now(&mut self, source: DocId, range: TextRange, now_ms: u64) -> Result<DocId> {
        if !self.host.is_open(source) {
            return Err(SyncError::StaleDocument(source));
        }
        // Queued changes predate the selection and must not reach the new pairing.
        self.absorb_queued(source, now_ms);
        let text = self
            .host
            .read_range(source, range)
            .map_err(|err| read_failure(source, range, err))?;

        self.teardown(source, Closure::Superseded);

        let language = self.host.language_hint(source);
        let resource = match self.config.backing {
            MirrorBacking::TempFile => match self
                .host
                .write_temp_resource(text.as_bytes(), language.as_deref())
            {
                Ok(resource) => Some(resource),
                Err(err) => {
                    self.report(&SyncError::TempResourceError(err));
                    None
                }
            },
            MirrorBacking::Scratch => None,
        };

        let seed = MirrorSeed {
            content: &text,
            language_hint: language.as_deref(),
            resource: resource.as_ref(),
        };
        let mirror = match self.host.open_mirror(seed) {
            Ok(mirror) => mirror,
            Err(err) => {
                self.release(resource);
                return Err(SyncError::OpenFailed(err));
            }
        };
        if let Err(err) = self.host.show_mirror(mirror) {
            if let Err(close_err) = self.host.close_mirror(mirror) {
                debug!(%mirror, %close_err, "could not close unshown mirror");
            }
            self.release(resource);
            return Err(SyncError::ShowFailed(err));
        }

        self.host.highlight_region(source, range);
        let mut pairing = Pairing::new(source, mirror, range, resource, &self.config);
        pairing.activate();
        self.registry.create(pairing);
        info!(%source, %mirror, %range, "extracted region");
        Ok(mirror)
    }

    /// Route every queued host notification.
    ///
    /// Returns the number of notifications handled.
    pub fn pump(&mut self, now_ms: u64) -> usize {
        let before = self.stats.events;
        loop {
            self.inbox.extend(self.host.take_events());
            let Some(event) = self.inbox.pop_front() else {
                break;
            };
            self.handle(event, now_ms);
        }
        self.stats.events - before
    }

    /// Process one host notification.
    pub fn handle(&mut self, event: Event, now_ms: u64) {
        self.stats.events += 1;
        match event {
            Event::DocumentChanged { doc, edits } => self.on_changed(doc, edits, now_ms),
            Event::DocumentSaved(doc) => self.on_saved(doc),
            Event::VisibleSetChanged => self.on_visibility_changed(),
            Event::DocumentClosed(doc) => self.on_closed(doc),
        }
    }

    /// Fire every timer that is due.
    pub fn tick(&mut self, now_ms: u64) {
        let firing: Vec<DocId> = self
            .requests
            .iter()
            .filter(|(_, timer)| timer.is_due(now_ms))
            .map(|(source, _)| *source)
            .collect();
        for source in firing {
            self.absorb_queued(source, now_ms);
        }

        let mut due: Vec<(DocId, TextRange)> = self
            .requests
            .iter_mut()
            .filter_map(|(source, timer)| timer.take_ready(now_ms).map(|range| (*source, range)))
            .collect();
        self.requests.retain(|_, timer| timer.is_pending());
        due.sort_unstable_by_key(|(source, _)| *source);
        for (source, range) in due {
            if let Err(err) = self.extract_now(source, range, now_ms) {
                self.report(&err);
            }
        }

        for source in self.registry.sources() {
            self.flush_due(source, now_ms);
            self.fire_autosave(source, now_ms);
        }
    }

    /// Earliest moment [`Session::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        let requests = self.requests.values().filter_map(Debouncer::deadline);
        let pairings = self.registry.iter().filter_map(Pairing::next_deadline);
        requests.chain(pairings).min()
    }

    /// Tear down the pairing for `source`, dropping any pending request for it.
    pub fn close(&mut self, source: DocId) -> bool {
        let closed = self.teardown(source, Closure::Explicit);
        self.requests.remove(&source);
        closed
    }

    /// Close every pairing and forget every pending request.
    pub fn shutdown(&mut self) {
        self.requests.clear();
        for pairing in self.registry.clear_all() {
            self.dismantle(pairing, Closure::Shutdown);
        }
    }

    // --- Routing ---

    fn on_changed(&mut self, doc: DocId, edits: Vec<EditOperation>, now_ms: u64) {
        if let Some(requested) = self.requests.get_mut(&doc).and_then(Debouncer::pending_mut) {
            *requested = recompute(*requested, &edits);
        }
        if let Some(source) = self.registry.source_for_mirror(doc) {
            self.on_mirror_changed(source, doc, &edits, now_ms);
        }
        if let Some(pairing) = self.registry.get_mut(doc) {
            if pairing.take_echo(doc, &edits) {
                self.stats.echoes_suppressed += 1;
                self.resume(doc, now_ms);
            } else {
                pairing.batcher.push(edits, now_ms);
            }
        }
    }

    fn on_mirror_changed(&mut self, source: DocId, mirror: DocId, edits: &[EditOperation], now_ms: u64) {
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        if pairing.take_echo(mirror, edits) {
            self.stats.echoes_suppressed += 1;
            self.resume(source, now_ms);
        } else {
            self.propagate_mirror(source, now_ms);
        }
    }

    fn on_saved(&mut self, doc: DocId) {
        let Some(source) = self.registry.source_for_mirror(doc) else {
            return;
        };
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        if pairing.end_programmatic_save() {
            debug!(mirror = %doc, "autosave written");
            return;
        }
        pairing.autosave.cancel_pending();
        match self.host.save_document(source) {
            Ok(()) => debug!(%source, "saved source with mirror"),
            Err(err) => self.report(&SyncError::SaveFailed(err)),
        }
    }

    fn on_visibility_changed(&mut self) {
        let hidden: Vec<DocId> = self
            .registry
            .iter()
            .filter(|p| !self.host.is_visible(p.mirror()))
            .map(Pairing::source)
            .collect();
        for source in hidden {
            self.teardown(source, Closure::MirrorGone);
        }
    }

    fn on_closed(&mut self, doc: DocId) {
        if let Some(source) = self.registry.source_for_mirror(doc) {
            self.teardown(source, Closure::MirrorGone);
        }
        self.teardown(doc, Closure::SourceClosed);
        self.requests.remove(&doc);
    }

    // --- Propagation ---

    fn propagate_mirror(&mut self, source: DocId, now_ms: u64) {
        if self.registry.get(source).is_some_and(Pairing::is_idle) {
            self.absorb_queued(source, now_ms);
        }
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        match pairing.push_mirror_text(&mut self.host, now_ms) {
            Ok(Propagation::Applied) => self.stats.mirror_to_source += 1,
            Ok(Propagation::Deferred) => debug!(%source, "mirror edit deferred"),
            Ok(Propagation::Unchanged) => {}
            Err(err) => self.report(&err),
        }
    }

    fn flush_batch(&mut self, source: DocId, now_ms: u64) {
        let Some(mirror) = self.registry.get(source).map(Pairing::mirror) else {
            return;
        };
        self.absorb_queued(mirror, now_ms);
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        match pairing.push_source_text(&mut self.host) {
            Ok(Propagation::Applied) => self.stats.source_to_mirror += 1,
            Ok(Propagation::Deferred) => debug!(%source, "source batch held"),
            Ok(Propagation::Unchanged) => {}
            Err(err) => self.report(&err),
        }
    }

    /// Flush the source batch if its window has elapsed and nothing is in
    /// flight.
    fn flush_due(&mut self, source: DocId, now_ms: u64) {
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        if !pairing.is_idle() {
            return;
        }
        let Some(batches) = pairing.batcher.take_ready(now_ms) else {
            return;
        };
        pairing.absorb(&batches);
        self.flush_batch(source, now_ms);
    }

    /// Run work that waited for a propagation to finish.
    fn resume(&mut self, source: DocId, now_ms: u64) {
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        if pairing.take_mirror_pending() {
            self.propagate_mirror(source, now_ms);
        }
        self.flush_due(source, now_ms);
    }

    /// Handle queued change notifications for `doc` ahead of the rest.
    ///
    /// Every queued change is already applied in the host, so it must be
    /// accounted for before the engine writes to `doc`.
    fn absorb_queued(&mut self, doc: DocId, now_ms: u64) {
        self.inbox.extend(self.host.take_events());
        let (ours, rest): (VecDeque<Event>, VecDeque<Event>) = mem::take(&mut self.inbox)
            .into_iter()
            .partition(|event| matches!(event, Event::DocumentChanged { doc: d, .. } if *d == doc));
        self.inbox = rest;
        for event in ours {
            self.handle(event, now_ms);
        }
    }

    fn fire_autosave(&mut self, source: DocId, now_ms: u64) {
        let Some(pairing) = self.registry.get_mut(source) else {
            return;
        };
        if pairing.autosave.take_ready(now_ms).is_none() {
            return;
        }
        let mirror = pairing.mirror();
        pairing.begin_programmatic_save();
        match self.host.save_document(mirror) {
            Ok(()) => self.stats.autosaves += 1,
            Err(err) => {
                if let Some(pairing) = self.registry.get_mut(source) {
                    pairing.end_programmatic_save();
                }
                self.report(&SyncError::SaveFailed(err));
            }
        }
    }

    // --- Teardown ---

    fn teardown(&mut self, source: DocId, why: Closure) -> bool {
        let Some(pairing) = self.registry.remove(source) else {
            return false;
        };
        self.dismantle(pairing, why);
        true
    }

    /// Close a pairing already taken out of the registry and release what it
    /// holds.
    fn dismantle(&mut self, mut pairing: Pairing, why: Closure) {
        let source = pairing.source();
        pairing.close();
        if why.suppresses_requests() {
            self.requests.remove(&source);
        }
        self.host.clear_highlight(source);
        self.release(pairing.take_temp());

        let mirror = pairing.mirror();
        if self.host.is_open(mirror) {
            if let Err(err) = self.host.close_mirror(mirror) {
                warn!(%mirror, %err, "could not close mirror");
            }
        }
        self.stats.teardowns += 1;
        info!(%source, %mirror, reason = %why, "pairing closed");
    }

    fn release(&mut self, resource: Option<TempResource>) {
        if let Some(resource) = resource {
            if let Err(err) = self.host.delete_temp_resource(&resource) {
                self.report(&SyncError::TempResourceError(err));
            }
        }
    }

    fn report(&mut self, err: &SyncError) {
        if err.is_silent() {
            debug!(%err, "sync aborted");
            return;
        }
        warn!(%err, "sync failed");
        self.host.notify_user(err.notice_level(), &err.to_string());
    }
}

#[cfg(test)]
mod tests;
