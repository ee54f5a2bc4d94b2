//! Runtime identity

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identifier of one runtime.
///
/// Frozen views and pinned values record the id of the runtime they belong
/// to; every access compares it against the caller's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(NonZeroU64);

impl RuntimeId {
    fn next() -> Self {
        let raw = NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// The raw numeric value (for logging only).
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime#{}", self.0)
    }
}

/// Identity of one execution context as supplied by the embedding scheduler.
///
/// Cheap to clone. Two contexts are equal only if they were cloned from the
/// same [`RuntimeContext::new`] call; names are for diagnostics and need not
/// be unique.
#[derive(Clone)]
pub struct RuntimeContext {
    id: RuntimeId,
    name: Arc<str>,
}

impl RuntimeContext {
    /// Create a context with a fresh identity.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: RuntimeId::next(),
            name: name.into(),
        }
    }

    /// The typed identity of this context.
    pub fn id(&self) -> RuntimeId {
        self.id
    }

    /// The diagnostic name given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for RuntimeContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RuntimeContext {}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeContext({} {:?})", self.id, self.name)
    }
}

impl fmt::Display for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_have_distinct_ids() {
        let ui = RuntimeContext::new("UI");
        let worklet = RuntimeContext::new("UI");
        assert_ne!(ui, worklet);
        assert_ne!(ui.id(), worklet.id());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let ui = RuntimeContext::new("UI");
        let copy = ui.clone();
        assert_eq!(ui, copy);
        assert_eq!(copy.name(), "UI");
    }

    #[test]
    fn test_display_includes_name_and_id() {
        let ctx = RuntimeContext::new("Worklet-1");
        let shown = ctx.to_string();
        assert!(shown.starts_with("Worklet-1 (runtime#"));
    }
}
