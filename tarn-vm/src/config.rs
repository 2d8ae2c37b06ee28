// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime limits for a VM instance.
//!
//! Limits can be set in code or loaded from TOML:
//!
//! ```toml
//! stack_size = 4096
//! max_frames = 256
//! max_allocs = 100000
//! ```

use serde::{Deserialize, Serialize};

/// Default operand stack capacity.
pub const DEFAULT_STACK_SIZE: usize = 2048;

/// Default frame stack capacity.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Errors loading a [`VmConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse VM config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },
}

/// Resource limits enforced while a VM runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Operand stack capacity in values.
    pub stack_size: usize,
    /// Maximum frame stack depth, the root frame included.
    pub max_frames: usize,
    /// Maximum number of heap allocations for one run; `None` is unlimited.
    pub max_allocs: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            max_allocs: None,
        }
    }
}

impl VmConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: VmConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_max_allocs(mut self, max_allocs: Option<u64>) -> Self {
        self.max_allocs = max_allocs;
        self
    }

    /// Out-of-band calls need room for the root frame and the callee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size < 1 {
            return Err(ConfigError::TooSmall {
                field: "stack_size",
                min: 1,
                value: self.stack_size,
            });
        }
        if self.max_frames < 2 {
            return Err(ConfigError::TooSmall {
                field: "max_frames",
                min: 2,
                value: self.max_frames,
            });
        }
        Ok(())
    }
}
