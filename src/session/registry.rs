use std::collections::HashMap;

use crate::host::DocId;
use crate::sync::Pairing;

/// Live pairings, reachable from either of their documents.
///
/// A source has at most one pairing. A document may be the source of one
/// pairing and the mirror of another.
#[derive(Debug, Default)]
pub struct Registry {
    pairings: HashMap<DocId, Pairing>,
    mirrors: HashMap<DocId, DocId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a pairing, returning any pairing it displaced.
    pub fn create(&mut self, pairing: Pairing) -> Option<Pairing> {
        let previous = self.remove(pairing.source());
        self.mirrors.insert(pairing.mirror(), pairing.source());
        self.pairings.insert(pairing.source(), pairing);
        previous
    }

    pub fn get(&self, source: DocId) -> Option<&Pairing> {
        self.pairings.get(&source)
    }

    pub fn get_mut(&mut self, source: DocId) -> Option<&mut Pairing> {
        self.pairings.get_mut(&source)
    }

    pub fn remove(&mut self, source: DocId) -> Option<Pairing> {
        let pairing = self.pairings.remove(&source)?;
        self.mirrors.remove(&pairing.mirror());
        Some(pairing)
    }

    pub fn source_for_mirror(&self, mirror: DocId) -> Option<DocId> {
        self.mirrors.get(&mirror).copied()
    }

    /// Take every pairing out, ordered by source.
    pub fn clear_all(&mut self) -> Vec<Pairing> {
        self.mirrors.clear();
        let mut pairings: Vec<Pairing> = self.pairings.drain().map(|(_, pairing)| pairing).collect();
        pairings.sort_unstable_by_key(Pairing::source);
        pairings
    }

    /// Source documents with a live pairing, in a stable order.
    pub fn sources(&self) -> Vec<DocId> {
        let mut sources: Vec<DocId> = self.pairings.keys().copied().collect();
        sources.sort_unstable();
        sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pairing> {
        self.pairings.values()
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}
