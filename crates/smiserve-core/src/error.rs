use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmiError {
    #[error("{binary} not found - is the NVIDIA driver installed?")]
    NotFound { binary: String },

    #[error("Failed to execute nvidia-smi: {0}")]
    ExecutionFailed(#[from] std::io::Error),

    #[error("nvidia-smi exited with {status}: {stderr}")]
    NonZeroExit { status: ExitStatus, stderr: String },

    #[error("nvidia-smi returned no output")]
    EmptyOutput,
}

impl SmiError {
    /// True when the tool itself could not be started, as opposed to a query it rejected.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SmiError::NotFound { .. } | SmiError::ExecutionFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, SmiError>;
