//! Mutable cells and the registry that preserves their identity
//!
//! A cell is the only mutable storage reachable from a [`Shareable`]. Every
//! shareable node that references a given [`CellKey`] holds a handle to the
//! same [`MutableCell`], so a write made through one runtime is seen by
//! reads in every other runtime.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{const_mutex, Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::{Result, ShareError};
use crate::value::Shareable;

/// Serializes checked writes so two concurrent writes cannot close a cycle
/// that neither of them sees on its own.
static WRITE_GATE: Mutex<()> = const_mutex(());

/// Entry count below which new registrations never trigger a purge.
const PURGE_FLOOR: usize = 32;

/// Stable identity token of a mutable source value.
///
/// Supplied by the origin runtime binding; equal keys denote the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(pub u64);

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// A single shared storage location.
pub struct MutableCell {
    key: CellKey,
    value: RwLock<Arc<Shareable>>,
    version: AtomicU64,
}

impl MutableCell {
    fn new(key: CellKey) -> Self {
        Self {
            key,
            value: RwLock::new(Shareable::undefined()),
            version: AtomicU64::new(0),
        }
    }
}

/// A reference-counted handle to a [`MutableCell`].
///
/// Handles are `Send + Sync`; cloning a handle never copies the cell.
#[derive(Clone)]
pub struct CellHandle(Arc<MutableCell>);

impl CellHandle {
    /// The identity key of the cell.
    pub fn key(&self) -> CellKey {
        self.0.key
    }

    /// Read the cell's current value.
    ///
    /// Never observes a partially written value; a read ordered after a
    /// completed [`write`](Self::write) sees that write.
    pub fn read(&self) -> Arc<Shareable> {
        self.0.value.read().clone()
    }

    /// Replace the cell's value.
    ///
    /// # Errors
    ///
    /// Returns `Cyclic` if `value` reaches this cell, which would make the
    /// shared representation self-referential.
    pub fn write(&self, value: Arc<Shareable>) -> Result<()> {
        let _gate = WRITE_GATE.lock();
        if value.reaches_cell(self.0.key) {
            return Err(ShareError::Cyclic {
                path: format!("<{}>", self.0.key),
            });
        }
        self.store(value);
        Ok(())
    }

    /// Unchecked replacement used by the conversion walk, which already
    /// guarantees acyclic contents.
    pub(crate) fn store(&self, value: Arc<Shareable>) {
        *self.0.value.write() = value;
        self.0.version.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of writes the cell has received.
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Acquire)
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &CellHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutable(<{}> v{})", self.0.key, self.version())
    }
}

/// Registry mapping cell keys to live cells.
///
/// Holds only weak references: a cell lives exactly as long as some
/// shareable value or handle refers to it. Entries of freed cells are
/// purged when a new registration finds the map at twice the live count of
/// the previous purge.
#[derive(Default)]
pub struct CellRegistry {
    cells: DashMap<CellKey, Weak<MutableCell>>,
    purged_live: AtomicUsize,
}

impl CellRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the live cell for `key`, creating an `undefined` one if needed.
    ///
    /// Idempotent while the cell is alive: every call returns a handle to
    /// the same storage.
    pub fn get_or_create(&self, key: CellKey) -> CellHandle {
        self.acquire(key).0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// the cell was created by this call.
    ///
    /// Racing callers are serialized by the map's shard lock, so exactly one
    /// of them creates the cell.
    pub(crate) fn acquire(&self, key: CellKey) -> (CellHandle, bool) {
        let cell = {
            let mut entry = self.cells.entry(key).or_insert_with(Weak::new);
            if let Some(cell) = entry.upgrade() {
                return (CellHandle(cell), false);
            }
            let cell = Arc::new(MutableCell::new(key));
            *entry = Arc::downgrade(&cell);
            cell
        };
        trace!(%key, "created cell");

        // The entry guard is released; purging takes every shard lock
        let purged_live = self.purged_live.load(Ordering::Relaxed);
        if self.cells.len() > PURGE_FLOOR.max(2 * purged_live) {
            self.purge();
        }
        (CellHandle(cell), true)
    }

    /// Get the live cell for `key`, if any.
    pub fn lookup(&self, key: CellKey) -> Option<CellHandle> {
        self.cells.get(&key)?.upgrade().map(CellHandle)
    }

    /// Read through a handle.
    pub fn read(&self, cell: &CellHandle) -> Arc<Shareable> {
        cell.read()
    }

    /// Write through a handle (see [`CellHandle::write`]).
    pub fn write(&self, cell: &CellHandle, value: Arc<Shareable>) -> Result<()> {
        cell.write(value)
    }

    /// Whether a live cell is registered under `key`.
    pub fn contains(&self, key: CellKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Whether no live cell is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose cell has been freed. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, cell| cell.strong_count() > 0);
        let remaining = self.cells.len();
        self.purged_live.store(remaining, Ordering::Relaxed);
        let removed = before.saturating_sub(remaining);
        if removed > 0 {
            debug!(removed, "purged dead cells");
        }
        removed
    }

    /// Undo the registrations of an aborted conversion.
    ///
    /// The caller must have dropped every other reference it held to these
    /// cells. An entry survives only if some other party acquired the cell
    /// in the meantime.
    pub(crate) fn rollback(&self, created: Vec<CellHandle>) {
        let weak: Vec<(CellKey, Weak<MutableCell>)> = created
            .iter()
            .map(|cell| (cell.key(), Arc::downgrade(&cell.0)))
            .collect();
        drop(created);

        for (key, cell) in weak {
            let removed = self.cells.remove_if(&key, |_, entry| {
                entry.ptr_eq(&cell) && entry.strong_count() == 0
            });
            if removed.is_some() {
                trace!(%key, "rolled back cell");
            }
        }
    }
}

impl fmt::Debug for CellRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRegistry")
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = CellRegistry::new();
        let a = registry.get_or_create(CellKey(1));
        let b = registry.get_or_create(CellKey(1));
        assert!(a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_acquire_reports_creation() {
        let registry = CellRegistry::new();
        let (first, created) = registry.acquire(CellKey(7));
        assert!(created);
        let (second, created) = registry.acquire(CellKey(7));
        assert!(!created);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn test_new_cell_holds_undefined() {
        let registry = CellRegistry::new();
        let cell = registry.get_or_create(CellKey(2));
        assert!(cell.read().as_primitive().is_some());
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn test_cell_dies_with_last_handle() {
        let registry = CellRegistry::new();
        let cell = registry.get_or_create(CellKey(3));
        assert!(registry.contains(CellKey(3)));
        drop(cell);
        assert!(!registry.contains(CellKey(3)));
        assert_eq!(registry.purge(), 1);
        assert_eq!(registry.purge(), 0);
    }

    #[test]
    fn test_registration_purges_freed_cells() {
        let registry = CellRegistry::new();
        let kept = registry.get_or_create(CellKey(1_000_000));
        for n in 0..1000 {
            drop(registry.get_or_create(CellKey(n)));
        }
        assert!(registry.cells.len() <= PURGE_FLOOR);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(kept.key()));
    }

    #[test]
    fn test_rollback_removes_unshared_cells() {
        let registry = CellRegistry::new();
        let (cell, _) = registry.acquire(CellKey(4));
        registry.rollback(vec![cell]);
        assert!(registry.is_empty());
        assert_eq!(registry.cells.len(), 0);
    }

    #[test]
    fn test_rollback_keeps_cells_acquired_elsewhere() {
        let registry = CellRegistry::new();
        let (cell, _) = registry.acquire(CellKey(5));
        let other = registry.get_or_create(CellKey(5));
        registry.rollback(vec![cell]);
        assert!(registry.contains(CellKey(5)));
        drop(other);
    }

    #[test]
    fn test_write_bumps_version() {
        let registry = CellRegistry::new();
        let cell = registry.get_or_create(CellKey(6));
        registry.write(&cell, Shareable::number(1.0)).unwrap();
        registry.write(&cell, Shareable::number(2.0)).unwrap();
        assert_eq!(cell.version(), 2);
        assert_eq!(registry.read(&cell).as_number(), Some(2.0));
    }

    #[test]
    fn test_write_rejects_self_reference() {
        let registry = CellRegistry::new();
        let cell = registry.get_or_create(CellKey(8));
        let loop_value = Shareable::object([("me", Shareable::mutable(cell.clone()))]);
        let err = cell.write(loop_value).unwrap_err();
        assert!(matches!(err, ShareError::Cyclic { .. }));
        assert_eq!(cell.version(), 0);
    }
}
