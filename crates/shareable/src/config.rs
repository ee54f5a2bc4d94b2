//! Conversion configuration

/// Configuration shared by every runtime attached to one
/// [`Exchange`](crate::Exchange).
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Maximum nesting depth accepted by the conversion walk
    pub max_depth: usize,

    /// Whether to emit a trace event for every converted node
    pub trace: bool,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            trace: false,
        }
    }
}

impl ShareConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with a custom depth limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Enable per-node tracing (builder pattern).
    pub fn traced(mut self) -> Self {
        self.trace = true;
        self
    }
}
