//! Function references carried through the exchange

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type alias for the opaque binding-layer payload
pub type FunctionPayload = Arc<dyn Any + Send + Sync>;

/// How a function may travel between runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Self-contained worklet; can be re-bound in any runtime
    Worklet,

    /// Ordinary function tied to the heap of its origin runtime
    Host,
}

/// An opaque reference to a function.
///
/// This crate never interprets the payload; it is handed back to the
/// function-binding layer of whichever runtime materializes the reference.
#[derive(Clone)]
pub struct FunctionRef {
    name: Arc<str>,
    kind: FunctionKind,
    requires: Option<Arc<str>>,
    payload: Option<FunctionPayload>,
}

impl FunctionRef {
    /// Reference a worklet function.
    pub fn worklet(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, FunctionKind::Worklet)
    }

    /// Reference a function that can only run on its origin runtime.
    pub fn host(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, FunctionKind::Host)
    }

    fn new(name: impl Into<Arc<str>>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            requires: None,
            payload: None,
        }
    }

    /// Require a runtime capability for binding (builder pattern).
    pub fn requiring(mut self, capability: impl Into<Arc<str>>) -> Self {
        self.requires = Some(capability.into());
        self
    }

    /// Attach a binding-layer payload (builder pattern).
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Function name (for display/debugging)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the function is a worklet or a host function
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Capability a runtime must declare to bind this function
    pub fn requires(&self) -> Option<&str> {
        self.requires.as_deref()
    }

    /// Downcast the payload.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Whether two references share one payload allocation (or both lack one
    /// and agree on name and kind).
    pub fn same_target(&self, other: &FunctionRef) -> bool {
        match (&self.payload, &other.payload) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => self.name == other.name && self.kind == other.kind,
            _ => false,
        }
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Worklet => write!(f, "Worklet({})", self.name),
            FunctionKind::Host => write!(f, "HostFn({})", self.name),
        }
    }
}
