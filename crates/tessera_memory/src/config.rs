//! # Memory Configuration
//!
//! Budget and default allocator sizes, loaded once at startup from TOML.
//!
//! ```toml
//! application_budget = 536870912
//!
//! [pool]
//! default_chunks_per_block = 8
//!
//! [stack]
//! frame_scratch_size = 4194304
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::stack::MAX_STACK_SIZE;
use crate::units::mib;

/// Top-level memory configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Advisory ceiling in bytes. Never enforced by the allocators.
    pub application_budget: usize,
    /// Pool allocator defaults.
    pub pool: PoolConfig,
    /// Stack allocator defaults.
    pub stack: StackConfig,
}

/// Pool allocator defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots reserved per block; also the growth granularity.
    pub default_chunks_per_block: usize,
}

/// Stack allocator defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Size in bytes of a per-frame scratch stack.
    pub frame_scratch_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            application_budget: mib(512),
            pool: PoolConfig::default(),
            stack: StackConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_chunks_per_block: 8,
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            frame_scratch_size: mib(4),
        }
    }
}

impl MemoryConfig {
    /// Parses and validates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] if the TOML is malformed or a
    /// value is out of range.
    pub fn from_toml_str(source: &str) -> MemoryResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| MemoryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] if the file cannot be read or
    /// its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::InvalidConfig(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] for a zero chunk count or a
    /// scratch size outside `(0, 1 GiB)`.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.pool.default_chunks_per_block == 0 {
            return Err(MemoryError::InvalidConfig(
                "pool.default_chunks_per_block must be greater than zero".to_string(),
            ));
        }

        let scratch = self.stack.frame_scratch_size;
        if scratch == 0 || scratch >= MAX_STACK_SIZE {
            return Err(MemoryError::InvalidConfig(format!(
                "stack.frame_scratch_size {scratch} must be greater than 0 and less than 1 GiB"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::gib;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = MemoryConfig::from_toml_str("").unwrap();
        assert_eq!(config, MemoryConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = MemoryConfig::from_toml_str(
            r"
            application_budget = 1048576

            [pool]
            default_chunks_per_block = 50
            ",
        )
        .unwrap();

        assert_eq!(config.application_budget, mib(1));
        assert_eq!(config.pool.default_chunks_per_block, 50);
        assert_eq!(config.stack, StackConfig::default());
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let result = MemoryConfig::from_toml_str("[pool]\ndefault_chunks_per_block = 0\n");
        assert!(matches!(result, Err(MemoryError::InvalidConfig(_))));
    }

    #[test]
    fn test_scratch_size_bounds() {
        let mut config = MemoryConfig::default();
        config.stack.frame_scratch_size = gib(1);
        assert!(config.validate().is_err());

        config.stack.frame_scratch_size = 0;
        assert!(config.validate().is_err());

        config.stack.frame_scratch_size = gib(1) - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let result = MemoryConfig::from_toml_str("application_budget = \"lots\"");
        assert!(matches!(result, Err(MemoryError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = MemoryConfig::from_file("/nonexistent/tessera/memory.toml");
        assert!(matches!(result, Err(MemoryError::InvalidConfig(_))));
    }
}
