//! Conversion of origin-runtime values into shareable values
//!
//! A conversion walks the source graph once. Arrays, objects and functions
//! reached twice without a cycle are converted once and shared by both
//! parents. Reaching a value that is still on the walk's stack is a cycle
//! and aborts the conversion. Mutable sources are hoisted into the
//! [`CellRegistry`]; if the walk fails, cells it created are rolled back.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span, trace, warn};

use crate::config::ShareConfig;
use crate::context::{RuntimeContext, RuntimeId};
use crate::error::{Result, ShareError};
use crate::host::{HostKind, HostValue, ObjectId};
use crate::registry::{CellHandle, CellKey, CellRegistry};
use crate::value::{FunctionKind, Shareable, ShareableKind};

/// Convert `value` into a shareable value.
///
/// `pinned` tags every non-primitive node with the origin runtime so that it
/// can only be materialized there. Host functions are always pinned.
pub(crate) fn convert<V: HostValue>(
    value: &V,
    origin: &RuntimeContext,
    registry: &CellRegistry,
    config: &ShareConfig,
    pinned: bool,
) -> Result<Arc<Shareable>> {
    let _span = debug_span!("convert", origin = %origin, pinned).entered();
    let mut walk = Walk::new(origin, registry, config, pinned);

    match walk.visit(value, 0) {
        Ok(root) => {
            debug!(
                nodes = walk.converted,
                new_cells = walk.created.len(),
                "conversion finished"
            );
            Ok(root)
        }
        Err(err) => {
            warn!(error = %err, "conversion aborted");
            walk.abort();
            Err(err)
        }
    }
}

/// State of one conversion walk.
struct Walk<'a> {
    origin: &'a RuntimeContext,
    registry: &'a CellRegistry,
    config: &'a ShareConfig,

    /// Affinity applied to container and function nodes
    affinity: Option<RuntimeId>,

    /// Heap values currently on the walk's stack
    in_progress: FxHashSet<ObjectId>,

    /// Heap values already converted by this walk
    finished: FxHashMap<ObjectId, Arc<Shareable>>,

    /// Cells whose contents are currently being converted
    open_cells: FxHashSet<CellKey>,

    /// Cell nodes already produced by this walk
    cell_nodes: FxHashMap<CellKey, Arc<Shareable>>,

    /// Cells this walk registered (rolled back on failure)
    created: Vec<CellHandle>,

    /// Key path from the root, for error messages
    path: Vec<String>,

    /// Number of nodes built
    converted: usize,
}

impl<'a> Walk<'a> {
    fn new(
        origin: &'a RuntimeContext,
        registry: &'a CellRegistry,
        config: &'a ShareConfig,
        pinned: bool,
    ) -> Self {
        Self {
            origin,
            registry,
            config,
            affinity: pinned.then(|| origin.id()),
            in_progress: FxHashSet::default(),
            finished: FxHashMap::default(),
            open_cells: FxHashSet::default(),
            cell_nodes: FxHashMap::default(),
            created: Vec::new(),
            path: Vec::new(),
            converted: 0,
        }
    }

    fn visit<V: HostValue>(&mut self, value: &V, depth: usize) -> Result<Arc<Shareable>> {
        if depth > self.config.max_depth {
            return Err(ShareError::DepthExceeded {
                depth,
                max: self.config.max_depth,
            });
        }

        match value.classify() {
            HostKind::Primitive(p) => Ok(self.node(ShareableKind::Primitive(p), None)),

            HostKind::Array { id, elements } => {
                if let Some(done) = self.finished.get(&id) {
                    return Ok(done.clone());
                }
                self.enter(id)?;
                let mut items = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    items.push(self.visit_child(index.to_string(), element, depth)?);
                }
                self.in_progress.remove(&id);
                let node = self.node(ShareableKind::Array(items), self.affinity);
                self.finished.insert(id, node.clone());
                Ok(node)
            }

            HostKind::Object { id, fields } => {
                if let Some(done) = self.finished.get(&id) {
                    return Ok(done.clone());
                }
                self.enter(id)?;
                let map = self.visit_fields(fields, depth)?;
                self.in_progress.remove(&id);
                let node = self.node(ShareableKind::Object(map), self.affinity);
                self.finished.insert(id, node.clone());
                Ok(node)
            }

            HostKind::Function { id, func, closure } => {
                if let Some(done) = self.finished.get(&id) {
                    return Ok(done.clone());
                }
                self.enter(id)?;
                let closure = if closure.is_empty() {
                    None
                } else {
                    let map = self.visit_fields(closure, depth)?;
                    Some(self.node(ShareableKind::Object(map), self.affinity))
                };
                self.in_progress.remove(&id);
                let affinity = match func.kind() {
                    FunctionKind::Worklet => self.affinity,
                    FunctionKind::Host => Some(self.origin.id()),
                };
                let node = self.node(ShareableKind::Function { func, closure }, affinity);
                self.finished.insert(id, node.clone());
                Ok(node)
            }

            HostKind::Mutable { key, contents } => self.visit_cell(key, &contents, depth),

            HostKind::Unsupported(what) => Err(ShareError::Unsupported(format!(
                "cannot share {} at `{}`",
                what,
                self.path_string()
            ))),
        }
    }

    fn visit_child<V: HostValue>(
        &mut self,
        segment: String,
        value: &V,
        depth: usize,
    ) -> Result<Arc<Shareable>> {
        self.path.push(segment);
        let result = self.visit(value, depth + 1);
        self.path.pop();
        result
    }

    fn visit_fields<V: HostValue>(
        &mut self,
        fields: Vec<(String, V)>,
        depth: usize,
    ) -> Result<IndexMap<String, Arc<Shareable>>> {
        let mut map = IndexMap::with_capacity(fields.len());
        for (key, field) in fields {
            let child = self.visit_child(key.clone(), &field, depth)?;
            map.insert(key, child);
        }
        Ok(map)
    }

    fn visit_cell<V: HostValue>(
        &mut self,
        key: CellKey,
        contents: &V,
        depth: usize,
    ) -> Result<Arc<Shareable>> {
        if self.open_cells.contains(&key) {
            return Err(self.cycle());
        }
        if let Some(done) = self.cell_nodes.get(&key) {
            return Ok(done.clone());
        }

        let (cell, created) = self.registry.acquire(key);
        if created {
            self.created.push(cell.clone());
            self.open_cells.insert(key);
            let inner = self.visit_child(format!("<{}>", key), contents, depth);
            self.open_cells.remove(&key);
            cell.store(inner?);
        }

        let node = self.node(ShareableKind::Mutable(cell), self.affinity);
        self.cell_nodes.insert(key, node.clone());
        Ok(node)
    }

    fn enter(&mut self, id: ObjectId) -> Result<()> {
        if self.in_progress.insert(id) {
            Ok(())
        } else {
            Err(self.cycle())
        }
    }

    fn node(&mut self, kind: ShareableKind, affinity: Option<RuntimeId>) -> Arc<Shareable> {
        self.converted += 1;
        let node = Shareable::new(kind, affinity);
        if self.config.trace {
            trace!(path = %self.path_string(), node = ?node, "converted");
        }
        node
    }

    fn cycle(&self) -> ShareError {
        ShareError::Cyclic {
            path: self.path_string(),
        }
    }

    fn path_string(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }

    /// Drop everything built so far, then unregister the cells this walk
    /// created.
    fn abort(self) {
        let Walk {
            registry,
            finished,
            cell_nodes,
            created,
            ..
        } = self;
        drop(finished);
        drop(cell_nodes);
        registry.rollback(created);
    }
}
