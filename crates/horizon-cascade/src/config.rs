//! Engine configuration.

/// Default number of memoized resolutions kept per view.
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// Configuration for a [`CascadeGraph`](crate::graph::CascadeGraph) and the
/// views created on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeConfig {
    /// Maximum memoized resolutions per view. Half are evicted when full.
    pub memo_capacity: usize,
    /// Verify on every chain walk that each dependency handle is live.
    ///
    /// A dangling handle is a programming error; with checks enabled it
    /// panics at the walk that finds it instead of being skipped.
    pub liveness_checks: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            liveness_checks: cfg!(debug_assertions),
        }
    }
}

impl CascadeConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> CascadeConfigBuilder {
        CascadeConfigBuilder::default()
    }
}

/// Builder for [`CascadeConfig`].
#[derive(Debug, Default)]
pub struct CascadeConfigBuilder {
    config: CascadeConfig,
}

impl CascadeConfigBuilder {
    /// Set the per-view memo capacity. Zero disables memoization.
    pub fn memo_capacity(mut self, capacity: usize) -> Self {
        self.config.memo_capacity = capacity;
        self
    }

    /// Enable or disable dependency liveness checks.
    pub fn liveness_checks(mut self, enabled: bool) -> Self {
        self.config.liveness_checks = enabled;
        self
    }

    /// Finish building.
    pub fn build(self) -> CascadeConfig {
        self.config
    }
}
