//! Origin runtime binding
//!
//! The conversion engine never touches a runtime's heap directly. It asks
//! each source value to [`classify`](HostValue::classify) itself and walks
//! the answer.

pub mod js;

use crate::registry::CellKey;
use crate::value::{FunctionRef, Primitive};

/// Identity of a heap value inside its origin runtime.
///
/// Must stay stable and unique for as long as the value is alive; used to
/// detect cycles and to share nodes reached more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// What a source value is, as reported by the origin runtime.
pub enum HostKind<V> {
    /// Number, string, boolean, null or undefined
    Primitive(Primitive),

    /// Array with its elements in order
    Array {
        /// Heap identity of the array
        id: ObjectId,
        /// Elements
        elements: Vec<V>,
    },

    /// Plain object with its own enumerable fields
    Object {
        /// Heap identity of the object
        id: ObjectId,
        /// Fields in enumeration order
        fields: Vec<(String, V)>,
    },

    /// Function together with the variables it captures
    Function {
        /// Heap identity of the function
        id: ObjectId,
        /// Binding-layer reference
        func: FunctionRef,
        /// Captured variables (empty for plain functions)
        closure: Vec<(String, V)>,
    },

    /// Value explicitly marked as shared mutable storage
    Mutable {
        /// Stable identity token of the source
        key: CellKey,
        /// Current contents
        contents: V,
    },

    /// Anything else (symbols, host objects, engine internals, ...)
    Unsupported(&'static str),
}

/// A value of an origin runtime that can be converted into a
/// [`Shareable`](crate::Shareable).
pub trait HostValue: Sized {
    /// Report the kind of this value and its immediate children.
    fn classify(&self) -> HostKind<Self>;
}
