use super::{ResolutionResult, ScopeId};
use crate::language::types::NodeId;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use tracing::trace;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoized path resolutions for one workspace revision.
///
/// Owned by the caller and handed to each [`Resolver`](super::Resolver). Not `Sync`.
#[derive(Debug, Default)]
pub struct ResolveCache {
    revision: Cell<Option<u64>>,
    entries: RefCell<FxHashMap<(NodeId, ScopeId), ResolutionResult>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry unless they were computed for `revision`.
    pub fn invalidate(&self, revision: u64) {
        if self.revision.get() == Some(revision) {
            return;
        }
        let dropped = self.entries.borrow().len();
        self.entries.borrow_mut().clear();
        self.revision.set(Some(revision));
        trace!(revision, dropped, "resolve cache invalidated");
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision.get()
    }

    pub(crate) fn get(&self, node: NodeId, scope: ScopeId) -> Option<ResolutionResult> {
        let hit = self.entries.borrow().get(&(node, scope)).cloned();
        match hit {
            Some(_) => self.hits.set(self.hits.get() + 1),
            None => self.misses.set(self.misses.get() + 1),
        }
        hit
    }

    pub(crate) fn insert(&self, node: NodeId, scope: ScopeId, result: ResolutionResult) {
        self.entries.borrow_mut().insert((node, scope), result);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.entries.borrow().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
