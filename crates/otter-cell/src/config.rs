//! Runtime configuration and builder

use crate::runtime::Runtime;

/// Configuration for a reactive [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Name recorded on the propagation tracing span
    pub name: String,
    /// Maximum recomputations in one pass before it is abandoned.
    ///
    /// Guards against computations that write cells they depend on.
    pub max_recomputations_per_pass: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "otter-cell".to_string(),
            max_recomputations_per_pass: 100_000,
        }
    }
}

/// Builder for a reactive runtime
///
/// # Example
///
/// ```
/// use otter_cell::RuntimeBuilder;
///
/// let rt = RuntimeBuilder::new()
///     .name("ui")
///     .max_recomputations_per_pass(10_000)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the runtime name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the per-pass recomputation limit
    pub fn max_recomputations_per_pass(mut self, limit: usize) -> Self {
        self.config.max_recomputations_per_pass = limit;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the runtime
    pub fn build(self) -> Runtime {
        Runtime::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let rt = RuntimeBuilder::new()
            .name("ui")
            .max_recomputations_per_pass(64)
            .build();

        assert_eq!(rt.config().name, "ui");
        assert_eq!(rt.config().max_recomputations_per_pass, 64);
    }

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_recomputations_per_pass, 100_000);
        assert_eq!(config.name, "otter-cell");
    }
}
