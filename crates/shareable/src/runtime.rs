//! A runtime attached to an exchange

use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::binding::{BoundFunction, FunctionBinder};
use crate::cache::MaterializationCache;
use crate::context::{RuntimeContext, RuntimeId};
use crate::convert;
use crate::error::{type_name, Result, ShareError};
use crate::exchange::Exchange;
use crate::frozen::{FrozenView, NativeValue};
use crate::host::HostValue;
use crate::value::{Shareable, ShareableKind};

/// One execution context's side of the exchange.
///
/// A `Runtime` owns the materialization cache for its context and is neither
/// `Send` nor `Sync`: create it on the thread that runs the context. Values
/// cross between runtimes only as `Arc<Shareable>`.
///
/// # Example
///
/// ```
/// use shareable::host::js::JsValue;
/// use shareable::Exchange;
///
/// let exchange = Exchange::new();
/// let ui = exchange.runtime("UI");
/// let worklet = exchange.runtime("Worklet-1");
///
/// let counter = JsValue::mutable(JsValue::from(0.0));
/// let state = JsValue::object_from([("count", counter)]);
/// let shared = ui.share(&state).unwrap();
///
/// let view = worklet.materialize(&shared).unwrap();
/// let view = view.as_object().unwrap();
/// view.set(&worklet, "count", shareable::Shareable::number(1.0)).unwrap();
///
/// let seen_by_ui = ui.materialize(&shared).unwrap();
/// let count = seen_by_ui.as_object().unwrap().get(&ui, "count").unwrap();
/// assert_eq!(count.and_then(|c| c.as_number()), Some(1.0));
/// ```
pub struct Runtime {
    context: RuntimeContext,
    exchange: Exchange,
    cache: MaterializationCache,
    binder: Box<dyn FunctionBinder>,
}

impl Runtime {
    pub(crate) fn new(
        exchange: Exchange,
        context: RuntimeContext,
        binder: Box<dyn FunctionBinder>,
    ) -> Self {
        Self {
            context,
            exchange,
            cache: MaterializationCache::new(),
            binder,
        }
    }

    /// The identity of this runtime.
    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Shorthand for `self.context().id()`.
    pub fn id(&self) -> RuntimeId {
        self.context.id()
    }

    /// The exchange this runtime is attached to.
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// The materialization cache of this runtime.
    pub fn cache(&self) -> &MaterializationCache {
        &self.cache
    }

    /// Convert a value of this runtime into a shareable value.
    pub fn share<V: HostValue>(&self, value: &V) -> Result<Arc<Shareable>> {
        self.exchange.convert(value, &self.context)
    }

    /// Convert a value that may only ever be materialized by this runtime.
    pub fn share_pinned<V: HostValue>(&self, value: &V) -> Result<Arc<Shareable>> {
        convert::convert(
            value,
            &self.context,
            self.exchange.registry(),
            self.exchange.config(),
            true,
        )
    }

    /// Materialize a shareable value in this runtime.
    ///
    /// Primitives come back by value. Arrays and objects come back as a
    /// [`FrozenView`]; while that view is alive, materializing the same value
    /// again returns the same view. Cell references resolve to the cell's
    /// current contents.
    ///
    /// # Errors
    ///
    /// `CrossThreadAccess` if the value is pinned to another runtime,
    /// `Unsupported` if a function cannot be bound here.
    pub fn materialize(&self, value: &Arc<Shareable>) -> Result<NativeValue> {
        if let Some(owner) = value.affinity() {
            self.check_access(owner)?;
        }

        match value.kind() {
            ShareableKind::Primitive(p) => Ok(NativeValue::from(p)),

            ShareableKind::Mutable(cell) => self.materialize(&cell.read()),

            ShareableKind::Array(_) | ShareableKind::Object(_) => {
                if let Some(hit) = self.cache.lookup(value.id()) {
                    return Ok(hit);
                }
                let view = NativeValue::Object(Rc::new(FrozenView::new(value.clone(), self.id())));
                self.cache.insert(value.id(), &view);
                trace!(
                    runtime = %self.context,
                    kind = type_name(value),
                    len = value.len(),
                    "built frozen view"
                );
                Ok(view)
            }

            ShareableKind::Function { func, closure } => {
                if let Some(hit) = self.cache.lookup(value.id()) {
                    return Ok(hit);
                }
                let bound = self.binder.bind(&self.context, func)?;
                let closure = closure
                    .as_ref()
                    .map(|closure| self.materialize(closure))
                    .transpose()?;
                let func = NativeValue::Function(Rc::new(BoundFunction::new(
                    bound,
                    closure,
                    self.id(),
                )));
                self.cache.insert(value.id(), &func);
                trace!(runtime = %self.context, "bound function");
                Ok(func)
            }
        }
    }

    /// Drop cache entries whose materialization is no longer referenced.
    pub fn collect_garbage(&self) -> usize {
        self.cache.collect()
    }

    pub(crate) fn check_access(&self, owner: RuntimeId) -> Result<()> {
        if owner == self.id() {
            Ok(())
        } else {
            Err(ShareError::CrossThreadAccess {
                owner,
                accessor: self.id(),
            })
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("context", &self.context)
            .field("cache", &self.cache.stats())
            .finish()
    }
}
