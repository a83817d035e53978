//! Dispatch configuration

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default result channel byte budget
pub const DEFAULT_BUFFER_SIZE: usize = 65535;

/// Settings for a dispatch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Largest serialized result a unit may send back, in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Upper bound on units executing at once; `None` runs every host at once
    ///
    /// Unbounded fan-out opens one connection per host simultaneously, which
    /// can exhaust file descriptors or overwhelm a jump host on large
    /// inventories.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_concurrency: None,
        }
    }
}

impl DispatchConfig {
    /// Set the result channel byte budget
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Bound the number of concurrently executing units
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Check the settings are usable
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` for a zero or oversized buffer, or a
    /// zero concurrency limit.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.buffer_size == 0 {
            return Err(CoreError::ConfigError(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if u32::try_from(self.buffer_size).is_err() {
            return Err(CoreError::ConfigError(format!(
                "buffer_size {} exceeds {}",
                self.buffer_size,
                u32::MAX
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(CoreError::ConfigError(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
