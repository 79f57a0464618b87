//! File I/O for task descriptors.

use super::TaskDescriptor;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use std::path::Path;

impl TaskDescriptor {
    /// Load and validate a task descriptor file.
    pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "failed to read task descriptor '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content, config)
    }
}
