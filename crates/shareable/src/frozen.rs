//! Frozen views: per-runtime objects backed by shareable values
//!
//! A [`FrozenView`] is what script code in a target runtime sees in place of
//! an array or object produced elsewhere. Fields are materialized on first
//! access and then kept on the view, except fields backed by a mutable
//! cell, which are re-read from the cell every time.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::binding::BoundFunction;
use crate::context::RuntimeId;
use crate::error::{Result, ShareError};
use crate::registry::CellHandle;
use crate::runtime::Runtime;
use crate::value::{Primitive, Shareable, ShareableKind};

/// A value as seen by script code in one runtime.
#[derive(Clone)]
pub enum NativeValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String (shared with the shareable value, not copied)
    String(Arc<str>),
    /// Array or object
    Object(Rc<FrozenView>),
    /// Function bound in this runtime
    Function(Rc<BoundFunction>),
}

impl NativeValue {
    /// Check if value is `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, NativeValue::Undefined)
    }

    /// Check if value is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            NativeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract a frozen view
    pub fn as_object(&self) -> Option<&Rc<FrozenView>> {
        match self {
            NativeValue::Object(view) => Some(view),
            _ => None,
        }
    }

    /// Extract a bound function
    pub fn as_function(&self) -> Option<&Rc<BoundFunction>> {
        match self {
            NativeValue::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Get the JS `typeof`-style name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Undefined => "undefined",
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "boolean",
            NativeValue::Number(_) => "number",
            NativeValue::String(_) => "string",
            NativeValue::Object(_) => "object",
            NativeValue::Function(_) => "function",
        }
    }
}

impl From<&Primitive> for NativeValue {
    fn from(p: &Primitive) -> Self {
        match p {
            Primitive::Undefined => NativeValue::Undefined,
            Primitive::Null => NativeValue::Null,
            Primitive::Bool(b) => NativeValue::Bool(*b),
            Primitive::Number(n) => NativeValue::Number(*n),
            Primitive::String(s) => NativeValue::String(s.clone()),
        }
    }
}

/// Primitives compare by value; objects and functions by identity.
impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Undefined, NativeValue::Undefined) => true,
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
            (NativeValue::Number(a), NativeValue::Number(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Object(a), NativeValue::Object(b)) => Rc::ptr_eq(a, b),
            (NativeValue::Function(a), NativeValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Undefined => write!(f, "undefined"),
            NativeValue::Null => write!(f, "null"),
            NativeValue::Bool(b) => write!(f, "{}", b),
            NativeValue::Number(n) => write!(f, "{}", n),
            NativeValue::String(s) => write!(f, "{:?}", s.as_ref()),
            NativeValue::Object(view) => write!(f, "{:?}", view),
            NativeValue::Function(func) => write!(f, "{:?}", func),
        }
    }
}

/// A read-mostly object exposed to one runtime.
///
/// Views are `Rc`-based and cannot leave the thread that created them. Every
/// accessor additionally takes the calling [`Runtime`] and fails with
/// `CrossThreadAccess` unless it is the runtime the view was built for.
pub struct FrozenView {
    source: Arc<Shareable>,
    owner: RuntimeId,
    slots: Box<[OnceCell<NativeValue>]>,
}

impl FrozenView {
    pub(crate) fn new(source: Arc<Shareable>, owner: RuntimeId) -> Self {
        let slots = (0..source.len()).map(|_| OnceCell::new()).collect();
        Self {
            source,
            owner,
            slots,
        }
    }

    /// The shareable value backing this view.
    pub fn source(&self) -> &Arc<Shareable> {
        &self.source
    }

    /// The runtime this view was materialized for.
    pub fn owner(&self) -> RuntimeId {
        self.owner
    }

    /// Whether the view presents an array.
    pub fn is_array(&self) -> bool {
        matches!(self.source.kind(), ShareableKind::Array(_))
    }

    /// Number of fields or elements.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the view has no fields.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of fields materialized and kept on the view so far.
    pub fn cached_fields(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// Field names in order (element indices for arrays).
    pub fn keys(&self, rt: &Runtime) -> Result<Vec<String>> {
        self.guard(rt)?;
        Ok(match self.source.kind() {
            ShareableKind::Object(fields) => fields.keys().cloned().collect(),
            _ => (0..self.len()).map(|i| i.to_string()).collect(),
        })
    }

    /// Read a property. Array elements are addressed by their decimal index.
    ///
    /// Returns `Ok(None)` if there is no such property.
    ///
    /// # Errors
    ///
    /// `CrossThreadAccess` if `rt` does not own this view; otherwise any
    /// error from materializing the field.
    pub fn get(&self, rt: &Runtime, key: &str) -> Result<Option<NativeValue>> {
        self.guard(rt)?;
        match self.position(key) {
            Some(index) => self.slot(rt, index).map(Some),
            None => Ok(None),
        }
    }

    /// Read a property by position (field order for objects).
    pub fn get_index(&self, rt: &Runtime, index: usize) -> Result<Option<NativeValue>> {
        self.guard(rt)?;
        if index < self.len() {
            self.slot(rt, index).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The live cell behind a property, if the property is cell-backed.
    pub fn cell(&self, rt: &Runtime, key: &str) -> Result<Option<CellHandle>> {
        self.guard(rt)?;
        Ok(self
            .position(key)
            .and_then(|index| self.child(index))
            .and_then(|child| child.as_cell())
            .cloned())
    }

    /// Assign a property. Only cell-backed properties accept writes; the
    /// write goes to the shared cell and is visible from every runtime.
    ///
    /// # Errors
    ///
    /// `UnknownField` for missing properties, `ImmutableField` for
    /// properties not backed by a cell, `Cyclic` if `value` reaches the
    /// cell itself.
    pub fn set(&self, rt: &Runtime, key: &str, value: Arc<Shareable>) -> Result<()> {
        self.guard(rt)?;
        let child = self
            .position(key)
            .and_then(|index| self.child(index))
            .ok_or_else(|| ShareError::UnknownField {
                key: key.to_string(),
            })?;
        let cell = child.as_cell().ok_or_else(|| ShareError::ImmutableField {
            key: key.to_string(),
        })?;
        cell.write(value)
    }

    /// Materialize every property one level deep into an ordered map.
    pub fn shallow_clone(&self, rt: &Runtime) -> Result<IndexMap<String, NativeValue>> {
        let keys = self.keys(rt)?;
        let mut out = IndexMap::with_capacity(keys.len());
        for (index, key) in keys.into_iter().enumerate() {
            out.insert(key, self.slot(rt, index)?);
        }
        Ok(out)
    }

    fn guard(&self, rt: &Runtime) -> Result<()> {
        rt.check_access(self.owner)
    }

    fn position(&self, key: &str) -> Option<usize> {
        match self.source.kind() {
            ShareableKind::Object(fields) => fields.get_index_of(key),
            _ => array_index(key).filter(|index| *index < self.len()),
        }
    }

    fn child(&self, index: usize) -> Option<&Arc<Shareable>> {
        match self.source.kind() {
            ShareableKind::Object(fields) => fields.get_index(index).map(|(_, v)| v),
            ShareableKind::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn slot(&self, rt: &Runtime, index: usize) -> Result<NativeValue> {
        let (Some(child), Some(slot)) = (self.child(index), self.slots.get(index)) else {
            return Ok(NativeValue::Undefined);
        };

        // Cell contents may change between reads
        if child.is_mutable() {
            return rt.materialize(child);
        }

        if let Some(value) = slot.get() {
            return Ok(value.clone());
        }
        let value = rt.materialize(child)?;
        Ok(slot.get_or_init(|| value).clone())
    }
}

/// Parse a canonical array index: `"0"` or digits without a leading zero
/// or sign.
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

impl fmt::Debug for FrozenView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_array() { "array" } else { "object" };
        write!(
            f,
            "FrozenView({} of {}, {}/{} cached, owner {})",
            kind,
            self.len(),
            self.cached_fields(),
            self.len(),
            self.owner
        )
    }
}
