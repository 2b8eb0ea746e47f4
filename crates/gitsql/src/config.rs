use crate::error::{GitsqlError, Result};
use crate::git::uri::DEFAULT_REVISION;

/// Rows emitted per pull unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Revision used when neither the identifier nor the call names one.
    pub default_revision: String,
    pub batch_size: usize,
    /// Default truncation for blob reads. `None` reads whole blobs.
    pub max_bytes: Option<u64>,
}

impl Config {
    pub fn new(default_revision: impl Into<String>, batch_size: usize, max_bytes: Option<u64>) -> Result<Self> {
        let default_revision = default_revision.into();
        if default_revision.trim().is_empty() {
            return Err(GitsqlError::Config(
                "default revision must not be empty".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(GitsqlError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }
        if max_bytes == Some(0) {
            return Err(GitsqlError::Config(
                "max bytes must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            default_revision,
            batch_size,
            max_bytes,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_revision: DEFAULT_REVISION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_bytes: None,
        }
    }
}
