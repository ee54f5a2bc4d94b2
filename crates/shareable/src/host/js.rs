//! A minimal single-threaded JS value model
//!
//! `JsValue` mirrors how an engine heap looks from the outside: objects are
//! reference-counted, interior-mutable and confined to one thread (`Rc`,
//! `RefCell`). It is the reference [`HostValue`] implementation and lets the
//! exchange be driven without a real engine.
//!
//! ```
//! use shareable::host::js::JsValue;
//! use shareable::Exchange;
//!
//! let exchange = Exchange::new();
//! let ui = exchange.runtime("UI");
//!
//! let point = JsValue::object_from([("x", JsValue::from(1.0)), ("y", JsValue::from(2.0))]);
//! let shared = ui.share(&point).unwrap();
//! assert_eq!(shared.len(), 2);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::{HostKind, HostValue, ObjectId};
use crate::registry::CellKey;
use crate::value::{FunctionRef, Primitive};

static NEXT_CELL_KEY: AtomicU64 = AtomicU64::new(1);

/// A JS value living in one runtime.
#[derive(Clone)]
pub enum JsValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(Rc<str>),
    /// Array
    Array(Rc<RefCell<Vec<JsValue>>>),
    /// Plain object
    Object(Rc<RefCell<IndexMap<String, JsValue>>>),
    /// Function with captured variables
    Function(Rc<JsFunction>),
    /// Mutable box shared by reference across runtimes
    Mutable(Rc<JsMutable>),
    /// Symbol (cannot be shared)
    Symbol(Rc<str>),
}

/// A function object.
pub struct JsFunction {
    func: FunctionRef,
    closure: RefCell<IndexMap<String, JsValue>>,
}

/// A mutable box with a stable identity key.
pub struct JsMutable {
    key: CellKey,
    value: RefCell<JsValue>,
}

impl JsValue {
    /// Create a string
    pub fn string(s: &str) -> Self {
        JsValue::String(Rc::from(s))
    }

    /// Create an array
    pub fn array(items: Vec<JsValue>) -> Self {
        JsValue::Array(Rc::new(RefCell::new(items)))
    }

    /// Create an empty object
    pub fn object() -> Self {
        JsValue::Object(Rc::new(RefCell::new(IndexMap::new())))
    }

    /// Create an object from fields
    pub fn object_from<K: Into<String>>(fields: impl IntoIterator<Item = (K, JsValue)>) -> Self {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        JsValue::Object(Rc::new(RefCell::new(fields)))
    }

    /// Create a function
    pub fn function(func: FunctionRef) -> Self {
        JsValue::Function(Rc::new(JsFunction {
            func,
            closure: RefCell::new(IndexMap::new()),
        }))
    }

    /// Create a mutable box with a fresh identity key
    pub fn mutable(value: JsValue) -> Self {
        let key = CellKey(NEXT_CELL_KEY.fetch_add(1, Ordering::Relaxed));
        JsValue::Mutable(Rc::new(JsMutable {
            key,
            value: RefCell::new(value),
        }))
    }

    /// Create a symbol
    pub fn symbol(description: &str) -> Self {
        JsValue::Symbol(Rc::from(description))
    }

    /// Set an object field, or capture a variable into a function's closure.
    ///
    /// Returns `false` for values that have no fields.
    pub fn set(&self, key: impl Into<String>, value: JsValue) -> bool {
        match self {
            JsValue::Object(fields) => {
                fields.borrow_mut().insert(key.into(), value);
                true
            }
            JsValue::Function(f) => {
                f.closure.borrow_mut().insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append to an array. Returns `false` for non-arrays.
    pub fn push(&self, value: JsValue) -> bool {
        match self {
            JsValue::Array(items) => {
                items.borrow_mut().push(value);
                true
            }
            _ => false,
        }
    }

    /// Read an object field
    pub fn get(&self, key: &str) -> Option<JsValue> {
        match self {
            JsValue::Object(fields) => fields.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Replace the contents of a mutable box. Returns `false` otherwise.
    pub fn assign(&self, value: JsValue) -> bool {
        match self {
            JsValue::Mutable(m) => {
                *m.value.borrow_mut() = value;
                true
            }
            _ => false,
        }
    }

    /// The identity key of a mutable box
    pub fn cell_key(&self) -> Option<CellKey> {
        match self {
            JsValue::Mutable(m) => Some(m.key),
            _ => None,
        }
    }
}

fn id_of<T>(rc: &Rc<T>) -> ObjectId {
    ObjectId(Rc::as_ptr(rc) as *const () as usize as u64)
}

impl HostValue for JsValue {
    fn classify(&self) -> HostKind<Self> {
        match self {
            JsValue::Undefined => HostKind::Primitive(Primitive::Undefined),
            JsValue::Null => HostKind::Primitive(Primitive::Null),
            JsValue::Bool(b) => HostKind::Primitive(Primitive::Bool(*b)),
            JsValue::Number(n) => HostKind::Primitive(Primitive::Number(*n)),
            JsValue::String(s) => HostKind::Primitive(Primitive::from(&**s)),
            JsValue::Array(items) => HostKind::Array {
                id: id_of(items),
                elements: items.borrow().clone(),
            },
            JsValue::Object(fields) => HostKind::Object {
                id: id_of(fields),
                fields: fields
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            JsValue::Function(f) => HostKind::Function {
                id: id_of(f),
                func: f.func.clone(),
                closure: f
                    .closure
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            JsValue::Mutable(m) => HostKind::Mutable {
                key: m.key,
                contents: m.value.borrow().clone(),
            },
            JsValue::Symbol(_) => HostKind::Unsupported("symbol"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Bool(b)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::string(s)
    }
}
