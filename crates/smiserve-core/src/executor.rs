use std::io::ErrorKind;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::config::SmiConfig;
use crate::error::{Result, SmiError};

/// Output format shared by every query so one parser handles them all.
pub const OUTPUT_FORMAT: &str = "--format=csv,noheader,nounits";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Gpu,
    ComputeApps,
}

impl QueryKind {
    pub fn selector(&self) -> &'static str {
        match self {
            QueryKind::Gpu => "--query-gpu",
            QueryKind::ComputeApps => "--query-compute-apps",
        }
    }
}

/// Runs one query against the GPU tool and returns its raw CSV output.
///
/// Calls block until the tool exits; there is no timeout here; the caller owns any deadline.
pub trait SmiExecutor: Send + Sync {
    fn query(&self, kind: QueryKind, fields: &[&str]) -> Result<String>;
}

impl<E: SmiExecutor + ?Sized> SmiExecutor for Box<E> {
    fn query(&self, kind: QueryKind, fields: &[&str]) -> Result<String> {
        (**self).query(kind, fields)
    }
}

impl<E: SmiExecutor + ?Sized> SmiExecutor for Arc<E> {
    fn query(&self, kind: QueryKind, fields: &[&str]) -> Result<String> {
        (**self).query(kind, fields)
    }
}

pub fn query_args(kind: QueryKind, fields: &[&str]) -> [String; 2] {
    [
        format!("{}={}", kind.selector(), fields.join(",")),
        OUTPUT_FORMAT.to_string(),
    ]
}

/// Executor backed by the real `nvidia-smi` binary.
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    binary: String,
}

impl NvidiaSmi {
    pub fn new(config: &SmiConfig) -> Self {
        Self {
            binary: config.binary.clone(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl SmiExecutor for NvidiaSmi {
    #[instrument(skip(self, columns), fields(binary = %self.binary, columns = columns.len()))]
    fn query(&self, kind: QueryKind, columns: &[&str]) -> Result<String> {
        let output = match Command::new(&self.binary)
            .args(query_args(kind, columns))
            .output()
        {
            Ok(out) => out,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("{} not found", self.binary);
                return Err(SmiError::NotFound {
                    binary: self.binary.clone(),
                });
            }
            Err(e) => {
                error!("{} execution failed: {}", self.binary, e);
                return Err(SmiError::ExecutionFailed(e));
            }
        };

        if !output.status.success() {
            return Err(SmiError::NonZeroExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(SmiError::EmptyOutput);
        }

        debug!(bytes = stdout.len(), "nvidia-smi query succeeded");
        Ok(stdout)
    }
}
