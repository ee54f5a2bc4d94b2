//! The hub shared by every runtime of one embedding

use std::sync::Arc;

use crate::binding::{CapabilityBinder, FunctionBinder};
use crate::config::ShareConfig;
use crate::context::RuntimeContext;
use crate::convert;
use crate::error::Result;
use crate::host::HostValue;
use crate::registry::CellRegistry;
use crate::runtime::Runtime;
use crate::value::Shareable;

/// Owns the cell registry and configuration shared by a set of runtimes.
///
/// Cheap to clone and `Send + Sync`: hand a clone to each runtime thread and
/// attach a [`Runtime`] there.
#[derive(Clone, Default)]
pub struct Exchange {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    registry: CellRegistry,
    config: ShareConfig,
}

impl Exchange {
    /// Create an exchange with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exchange with a custom configuration.
    pub fn with_config(config: ShareConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                registry: CellRegistry::new(),
                config,
            }),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ShareConfig {
        &self.inner.config
    }

    /// The registry of mutable cells.
    pub fn registry(&self) -> &CellRegistry {
        &self.inner.registry
    }

    /// Convert a value produced by `origin` into a shareable value.
    ///
    /// # Errors
    ///
    /// `Cyclic`, `Unsupported` or `DepthExceeded`; on failure every cell
    /// registered by this call is rolled back.
    pub fn convert<V: HostValue>(&self, value: &V, origin: &RuntimeContext) -> Result<Arc<Shareable>> {
        convert::convert(value, origin, self.registry(), self.config(), false)
    }

    /// Attach a new runtime with a fresh context and no optional capabilities.
    pub fn runtime(&self, name: &str) -> Runtime {
        self.attach(RuntimeContext::new(name))
    }

    /// Attach a runtime for an existing context.
    pub fn attach(&self, context: RuntimeContext) -> Runtime {
        self.attach_with_binder(context, CapabilityBinder::new())
    }

    /// Attach a runtime whose functions are bound by `binder`.
    pub fn attach_with_binder(
        &self,
        context: RuntimeContext,
        binder: impl FunctionBinder + 'static,
    ) -> Runtime {
        tracing::debug!(runtime = %context, "attached runtime");
        Runtime::new(self.clone(), context, Box::new(binder))
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("config", self.config())
            .field("registry", self.registry())
            .finish()
    }
}
