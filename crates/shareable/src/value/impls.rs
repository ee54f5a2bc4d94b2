//! Shareable constructors, predicates, extractors and From traits

use std::sync::Arc;

use indexmap::IndexMap;

use super::*;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Shareable {
    /// Create `undefined`
    pub fn undefined() -> Arc<Self> {
        Self::primitive(Primitive::Undefined)
    }

    /// Create `null`
    pub fn null() -> Arc<Self> {
        Self::primitive(Primitive::Null)
    }

    /// Create a boolean
    pub fn bool(b: bool) -> Arc<Self> {
        Self::primitive(Primitive::Bool(b))
    }

    /// Create a number
    pub fn number(n: f64) -> Arc<Self> {
        Self::primitive(Primitive::Number(n))
    }

    /// Create a string
    pub fn string(s: impl Into<Arc<str>>) -> Arc<Self> {
        Self::primitive(Primitive::String(s.into()))
    }

    /// Create a primitive node
    pub fn primitive(p: Primitive) -> Arc<Self> {
        Self::new(ShareableKind::Primitive(p), None)
    }

    /// Create an array from already-shareable items
    pub fn array(items: Vec<Arc<Shareable>>) -> Arc<Self> {
        Self::new(ShareableKind::Array(items), None)
    }

    /// Create an object from already-shareable fields.
    ///
    /// Later duplicates of a key replace earlier ones, keeping the first
    /// position.
    pub fn object<K: Into<String>>(
        fields: impl IntoIterator<Item = (K, Arc<Shareable>)>,
    ) -> Arc<Self> {
        let fields: IndexMap<String, Arc<Shareable>> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(ShareableKind::Object(fields), None)
    }

    /// Create a reference to an existing cell
    pub fn mutable(cell: CellHandle) -> Arc<Self> {
        Self::new(ShareableKind::Mutable(cell), None)
    }

    /// Create a function reference without a closure
    pub fn function(func: FunctionRef) -> Arc<Self> {
        Self::new(
            ShareableKind::Function {
                func,
                closure: None,
            },
            None,
        )
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════
    /// Check if value is a primitive
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ShareableKind::Primitive(_))
    }

    /// Check if value is an array or object (materializes to a frozen view)
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            ShareableKind::Array(_) | ShareableKind::Object(_)
        )
    }

    /// Check if value is a cell reference
    pub fn is_mutable(&self) -> bool {
        matches!(self.kind, ShareableKind::Mutable(_))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors (return Option for safe access)
    // ═══════════════════════════════════════════════════════════════════
    /// Extract the primitive payload
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match &self.kind {
            ShareableKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Extract a number
    pub fn as_number(&self) -> Option<f64> {
        match self.as_primitive()? {
            Primitive::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self.as_primitive()? {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract the referenced cell
    pub fn as_cell(&self) -> Option<&CellHandle> {
        match &self.kind {
            ShareableKind::Mutable(cell) => Some(cell),
            _ => None,
        }
    }

    /// Look up a field of an object
    pub fn get(&self, key: &str) -> Option<&Arc<Shareable>> {
        match &self.kind {
            ShareableKind::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Look up an element of an array
    pub fn get_index(&self, index: usize) -> Option<&Arc<Shareable>> {
        match &self.kind {
            ShareableKind::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of fields or elements (zero for everything else)
    pub fn len(&self) -> usize {
        match &self.kind {
            ShareableKind::Array(items) => items.len(),
            ShareableKind::Object(fields) => fields.len(),
            _ => 0,
        }
    }

    /// Whether [`len`](Self::len) is zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names of an object in source order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let fields = match &self.kind {
            ShareableKind::Object(fields) => Some(fields),
            _ => None,
        };
        fields.into_iter().flat_map(|f| f.keys().map(String::as_str))
    }
}

impl Primitive {
    /// Get the JS `typeof`-style name of this primitive
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Undefined => "undefined",
            Primitive::Null => "null",
            Primitive::Bool(_) => "boolean",
            Primitive::Number(_) => "number",
            Primitive::String(_) => "string",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Primitive::Bool(b)
    }
}

impl From<f64> for Primitive {
    fn from(n: f64) -> Self {
        Primitive::Number(n)
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Primitive::String(Arc::from(s))
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Primitive::String(Arc::from(s))
    }
}
