//! Engine configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use derive_builder::Builder;

/// Configuration shared by the execution engines.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of partition tasks running at once.
    #[builder(default = "default_parallelism()")]
    pub parallelism: usize,

    /// Maximum number of concurrent workflow executions.
    #[builder(default = "10")]
    pub max_concurrent_runs: usize,

    /// Timeout for a whole workflow execution.
    ///
    /// Time spent waiting behind `max_concurrent_runs` counts against it.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    /// Returns a builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.parallelism == Some(0) {
            return Err("parallelism must be at least 1".into());
        }
        if self.max_concurrent_runs == Some(0) {
            return Err("max_concurrent_runs must be at least 1".into());
        }
        if self.timeout.flatten().is_some_and(|timeout| timeout.is_zero()) {
            return Err("timeout must be greater than zero".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            max_concurrent_runs: 10,
            timeout: None,
        }
    }
}

/// Number of CPUs available to the process.
pub(crate) fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = EngineConfig::builder().parallelism(4usize).build().unwrap();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_concurrent_runs, 10);
        assert_eq!(config.timeout, None);

        let config = EngineConfig::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.parallelism >= 1);
    }

    #[test]
    fn builder_rejects_zero_limits() {
        assert!(EngineConfig::builder().parallelism(0usize).build().is_err());
        assert!(
            EngineConfig::builder()
                .max_concurrent_runs(0usize)
                .build()
                .is_err()
        );
        assert!(
            EngineConfig::builder()
                .timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }
}
