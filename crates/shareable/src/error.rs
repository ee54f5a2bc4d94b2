//! Error types for conversion, cell access and materialization

use thiserror::Error;

use crate::context::RuntimeId;
use crate::value::{Shareable, ShareableKind};

/// Main error type for shareable value operations.
///
/// Every error is local to the call that produced it: a failed conversion
/// or materialization never invalidates other values or cells.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The source graph refers back to a value that is still being converted
    #[error("Cyclic value: `{path}` refers to a value that is still being converted")]
    Cyclic {
        /// Key path (from the conversion root) where the cycle closed
        path: String,
    },

    /// The value cannot be represented, or cannot be bound in the target runtime
    #[error("Unsupported value: {0}")]
    Unsupported(String),

    /// A runtime-bound object was used from a different runtime
    #[error("Cross-thread access: value owned by {owner} accessed from {accessor}")]
    CrossThreadAccess {
        /// Runtime the value or view belongs to
        owner: RuntimeId,
        /// Runtime that attempted the access
        accessor: RuntimeId,
    },

    /// Conversion went deeper than the configured limit
    #[error("Depth limit exceeded: depth {depth} exceeds maximum {max}")]
    DepthExceeded {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Write to a field that is not backed by a mutable cell
    #[error("Cannot assign to `{key}`: field is frozen")]
    ImmutableField {
        /// Field name
        key: String,
    },

    /// Write to a field that does not exist
    #[error("Cannot assign to `{key}`: no such field")]
    UnknownField {
        /// Field name
        key: String,
    },
}

/// Result type alias for shareable value operations
pub type Result<T> = std::result::Result<T, ShareError>;

/// Get a human-readable name for a shareable value's kind.
pub fn type_name(value: &Shareable) -> &'static str {
    match value.kind() {
        ShareableKind::Primitive(p) => p.type_name(),
        ShareableKind::Array(_) => "array",
        ShareableKind::Object(_) => "object",
        ShareableKind::Function { .. } => "function",
        ShareableKind::Mutable(_) => "mutable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CellKey, CellRegistry};
    use crate::value::FunctionRef;

    #[test]
    fn test_type_names() {
        let registry = CellRegistry::new();
        assert_eq!(type_name(&Shareable::number(1.0)), "number");
        assert_eq!(type_name(&Shareable::string("s")), "string");
        assert_eq!(type_name(&Shareable::array(vec![])), "array");
        assert_eq!(type_name(&Shareable::function(FunctionRef::worklet("f"))), "function");
        assert_eq!(
            type_name(&Shareable::mutable(registry.get_or_create(CellKey(1)))),
            "mutable"
        );
    }

    #[test]
    fn test_cross_thread_message_names_both_runtimes() {
        let owner = crate::context::RuntimeContext::new("UI").id();
        let accessor = crate::context::RuntimeContext::new("Worklet-1").id();
        let msg = ShareError::CrossThreadAccess { owner, accessor }.to_string();
        assert!(msg.contains(&owner.to_string()));
        assert!(msg.contains(&accessor.to_string()));
    }
}
