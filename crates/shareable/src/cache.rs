//! Per-runtime materialization cache

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::binding::BoundFunction;
use crate::frozen::{FrozenView, NativeValue};
use crate::value::ShareableId;

/// Entry count below which `insert` never sweeps.
const SWEEP_FLOOR: usize = 32;

/// Counters describing cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,

    /// Lookups that found nothing alive
    pub misses: u64,

    /// Frozen views constructed
    pub views_built: u64,

    /// Functions bound
    pub functions_bound: u64,
}

enum Entry {
    View(Weak<FrozenView>),
    Function(Weak<BoundFunction>),
}

impl Entry {
    fn upgrade(&self) -> Option<NativeValue> {
        match self {
            Entry::View(view) => view.upgrade().map(NativeValue::Object),
            Entry::Function(func) => func.upgrade().map(NativeValue::Function),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Entry::View(view) => view.strong_count() > 0,
            Entry::Function(func) => func.strong_count() > 0,
        }
    }
}

/// Identity cache from shareable values to their materialization in one
/// runtime.
///
/// Entries are weak: while script code (or a parent view) holds a
/// materialized object, materializing the same value again yields that same
/// object. Once it is dropped the entry is dead and the next request builds
/// a fresh one.
///
/// Owned by a [`Runtime`](crate::Runtime) and never shared, so lookups and
/// inserts for one runtime are serialized by construction.
///
/// Dead entries are swept by `insert` once the map has grown to twice the
/// live count of the previous sweep, so a value that is rebuilt over and
/// over (a cell rewritten in a loop) cannot grow the map without bound.
#[derive(Default)]
pub struct MaterializationCache {
    entries: RefCell<FxHashMap<ShareableId, Entry>>,
    stats: Cell<CacheStats>,

    /// Live entries left by the last sweep
    swept_live: Cell<usize>,
}

impl MaterializationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lookup(&self, id: ShareableId) -> Option<NativeValue> {
        let found = self.entries.borrow().get(&id).and_then(Entry::upgrade);
        let hit = found.is_some();
        self.bump(|stats| {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        });
        found
    }

    pub(crate) fn insert(&self, id: ShareableId, value: &NativeValue) {
        let entry = match value {
            NativeValue::Object(view) => {
                self.bump(|stats| stats.views_built += 1);
                Entry::View(Rc::downgrade(view))
            }
            NativeValue::Function(func) => {
                self.bump(|stats| stats.functions_bound += 1);
                Entry::Function(Rc::downgrade(func))
            }
            _ => return,
        };
        let len = {
            let mut entries = self.entries.borrow_mut();
            entries.insert(id, entry);
            entries.len()
        };
        if len > SWEEP_FLOOR.max(2 * self.swept_live.get()) {
            self.collect();
        }
    }

    /// Activity counters so far.
    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().values().filter(|e| e.is_alive()).count()
    }

    /// Whether no entry is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove dead entries. Returns how many were removed.
    pub fn collect(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_alive());
        let removed = before - entries.len();
        self.swept_live.set(entries.len());
        if removed > 0 {
            debug!(removed, "collected dead materializations");
        }
        removed
    }

    fn bump(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}
