//! # Shareable
//!
//! Thread-agnostic values exchanged between co-resident JavaScript runtimes.
//!
//! A value produced in one runtime is converted once into an immutable,
//! reference-counted [`Shareable`] tree. Any other runtime can then
//! materialize it as a [`FrozenView`]: a lazily populated, runtime-local
//! object. Values explicitly marked mutable are hoisted into shared cells,
//! so a write made through one runtime's view is seen by all the others.
//!
//! ## Architecture
//!
//! - **Conversion**: walk an origin value ([`HostValue`]) into a [`Shareable`]
//!   DAG, rejecting cycles
//! - **Cell registry**: one [`MutableCell`](registry::MutableCell) per source
//!   identity, shared by reference
//! - **Materialization**: per-[`Runtime`] identity cache of frozen views
//! - **Frozen views**: field access with `get(key)`, cell-backed writes with
//!   `set(key, value)`
//!
//! ```
//! use shareable::host::js::JsValue;
//! use shareable::Exchange;
//!
//! let exchange = Exchange::new();
//! let ui = exchange.runtime("UI");
//! let worklet = exchange.runtime("Worklet-1");
//!
//! let config = JsValue::object_from([("duration", JsValue::from(300.0))]);
//! let shared = ui.share(&config).unwrap();
//!
//! let view = worklet.materialize(&shared).unwrap();
//! let duration = view.as_object().unwrap().get(&worklet, "duration").unwrap();
//! assert_eq!(duration.and_then(|d| d.as_number()), Some(300.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod cache;
pub mod config;
pub mod context;
mod convert;
pub mod error;
pub mod exchange;
pub mod frozen;
pub mod host;
pub mod registry;
pub mod runtime;
pub mod value;

// Re-export main types
pub use binding::{BoundFunction, CapabilityBinder, FunctionBinder};
pub use cache::{CacheStats, MaterializationCache};
pub use config::ShareConfig;
pub use context::{RuntimeContext, RuntimeId};
pub use error::{Result, ShareError};
pub use exchange::Exchange;
pub use frozen::{FrozenView, NativeValue};
pub use host::{HostKind, HostValue, ObjectId};
pub use registry::{CellHandle, CellKey, CellRegistry};
pub use runtime::Runtime;
pub use value::{
    FunctionKind, FunctionRef, Primitive, Shareable, ShareableId, ShareableKind, ShareableTag,
};

/// Shareable version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
