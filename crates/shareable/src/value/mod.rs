//! Thread-agnostic value representation

mod display;
mod function;
mod impls;

pub use function::{FunctionKind, FunctionPayload, FunctionRef};

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::context::RuntimeId;
use crate::registry::{CellHandle, CellKey};

static NEXT_SHAREABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Shareable`].
///
/// Ids are never reused, so they can key per-runtime caches without
/// holding the value alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShareableId(NonZeroU64);

impl ShareableId {
    fn next() -> Self {
        let raw = NEXT_SHAREABLE_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
}

/// An immediate JS value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// IEEE-754 double
    Number(f64),
    /// Immutable string, shared rather than copied
    String(Arc<str>),
}

/// The variant tag of a [`Shareable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareableTag {
    /// Number, string, boolean, null or undefined
    Primitive,
    /// Array
    Sequence,
    /// Plain object
    Map,
    /// Function reference
    Function,
    /// Reference to a mutable cell
    Mutable,
}

/// The payload of a [`Shareable`].
pub enum ShareableKind {
    /// Inline immediate value
    Primitive(Primitive),

    /// Ordered sequence of children
    Array(Vec<Arc<Shareable>>),

    /// Key-value map; keys are unique and keep source order
    Object(IndexMap<String, Arc<Shareable>>),

    /// Opaque function reference plus its converted closure (if any)
    Function {
        /// Binding-layer payload
        func: FunctionRef,
        /// Captured variables, converted as a map
        closure: Option<Arc<Shareable>>,
    },

    /// Shared mutable cell; the value lives in the cell, not in this node
    Mutable(CellHandle),
}

/// The intermediate representation of one converted value.
///
/// A `Shareable` is immutable once constructed and is `Send + Sync`, so an
/// `Arc<Shareable>` can be handed to any number of runtimes. Children are
/// `Arc`-shared: the same child may appear under several parents. The only
/// mutable state reachable from a `Shareable` lives behind the locks of the
/// cells it references.
pub struct Shareable {
    id: ShareableId,
    kind: ShareableKind,
    affinity: Option<RuntimeId>,
}

impl Shareable {
    pub(crate) fn new(kind: ShareableKind, affinity: Option<RuntimeId>) -> Arc<Self> {
        Arc::new(Self {
            id: ShareableId::next(),
            kind,
            affinity,
        })
    }

    /// Process-unique identity of this node.
    pub fn id(&self) -> ShareableId {
        self.id
    }

    /// The node's payload.
    pub fn kind(&self) -> &ShareableKind {
        &self.kind
    }

    /// The runtime this node is pinned to, if any.
    pub fn affinity(&self) -> Option<RuntimeId> {
        self.affinity
    }

    /// The node's variant tag.
    pub fn tag(&self) -> ShareableTag {
        match &self.kind {
            ShareableKind::Primitive(_) => ShareableTag::Primitive,
            ShareableKind::Array(_) => ShareableTag::Sequence,
            ShareableKind::Object(_) => ShareableTag::Map,
            ShareableKind::Function { .. } => ShareableTag::Function,
            ShareableKind::Mutable(_) => ShareableTag::Mutable,
        }
    }

    /// Every cell reachable from this value, each reported once.
    ///
    /// Walks containers, function closures and the current contents of the
    /// cells themselves.
    pub fn mutables(&self) -> Vec<CellHandle> {
        let mut found = Vec::new();
        let mut seen_cells = FxHashSet::default();
        let mut visited = FxHashSet::default();
        self.collect_mutables(&mut found, &mut seen_cells, &mut visited);
        found
    }

    /// Whether the cell identified by `key` is reachable from this value.
    pub fn reaches_cell(&self, key: CellKey) -> bool {
        self.mutables().iter().any(|cell| cell.key() == key)
    }

    fn collect_mutables(
        &self,
        found: &mut Vec<CellHandle>,
        seen_cells: &mut FxHashSet<CellKey>,
        visited: &mut FxHashSet<ShareableId>,
    ) {
        if !visited.insert(self.id) {
            return;
        }
        match &self.kind {
            ShareableKind::Primitive(_) => {}
            ShareableKind::Array(items) => {
                for item in items {
                    item.collect_mutables(found, seen_cells, visited);
                }
            }
            ShareableKind::Object(fields) => {
                for child in fields.values() {
                    child.collect_mutables(found, seen_cells, visited);
                }
            }
            ShareableKind::Function { closure, .. } => {
                if let Some(closure) = closure {
                    closure.collect_mutables(found, seen_cells, visited);
                }
            }
            ShareableKind::Mutable(cell) => {
                if seen_cells.insert(cell.key()) {
                    found.push(cell.clone());
                    cell.read().collect_mutables(found, seen_cells, visited);
                }
            }
        }
    }
}
