use serde::{Deserialize, Serialize};

/// Environment variable overriding the nvidia-smi executable.
pub const BINARY_ENV: &str = "NVIDIA_SMI_BIN";

pub const DEFAULT_BINARY: &str = "nvidia-smi";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmiConfig {
    pub binary: String,
}

impl SmiConfig {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(BINARY_ENV) {
            Ok(binary) if !binary.trim().is_empty() => Self::new(binary.trim()),
            _ => Self::default(),
        }
    }
}

impl Default for SmiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}
