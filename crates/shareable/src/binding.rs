//! Function binding in target runtimes

use std::fmt;

use rustc_hash::FxHashSet;

use crate::context::{RuntimeContext, RuntimeId};
use crate::error::{Result, ShareError};
use crate::frozen::NativeValue;
use crate::value::FunctionRef;

/// Decides whether, and as what, a function reference can be bound in a
/// target runtime.
///
/// Implemented by the embedding's function-binding layer. The returned
/// reference is what script code in the target runtime will call; a binder
/// may substitute a runtime-local payload.
pub trait FunctionBinder {
    /// Bind `func` for `target`.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the function cannot run in `target`.
    fn bind(&self, target: &RuntimeContext, func: &FunctionRef) -> Result<FunctionRef>;
}

/// Binder that checks a function's required capability against the set the
/// runtime declares, and passes the reference through unchanged.
#[derive(Debug, Clone, Default)]
pub struct CapabilityBinder {
    capabilities: FxHashSet<String>,
}

impl CapabilityBinder {
    /// A binder for a runtime with no optional capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a capability (builder pattern).
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Whether a capability has been declared.
    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

impl FunctionBinder for CapabilityBinder {
    fn bind(&self, target: &RuntimeContext, func: &FunctionRef) -> Result<FunctionRef> {
        match func.requires() {
            Some(capability) if !self.has(capability) => Err(ShareError::Unsupported(format!(
                "function `{}` requires capability `{}`, which {} does not provide",
                func.name(),
                capability,
                target
            ))),
            _ => Ok(func.clone()),
        }
    }
}

/// A function materialized in one runtime.
pub struct BoundFunction {
    func: FunctionRef,
    closure: Option<NativeValue>,
    owner: RuntimeId,
}

impl BoundFunction {
    pub(crate) fn new(func: FunctionRef, closure: Option<NativeValue>, owner: RuntimeId) -> Self {
        Self {
            func,
            closure,
            owner,
        }
    }

    /// The reference returned by the binder
    pub fn func(&self) -> &FunctionRef {
        &self.func
    }

    /// The captured variables, as a frozen view in the owning runtime
    pub fn closure(&self) -> Option<&NativeValue> {
        self.closure.as_ref()
    }

    /// The runtime this function was bound in
    pub fn owner(&self) -> RuntimeId {
        self.owner
    }
}

impl fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundFunction({:?} in {})", self.func, self.owner)
    }
}
