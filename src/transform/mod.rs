//! The ordered transform chain applied to every matched source file.
//!
//! Each stage has the same contract: bytes in, bytes out, or a
//! [`StageError`]. The fixed production chain is preprocess (style language
//! to plain CSS), minify, then vendor-prefix; stages are trait objects so
//! pipelines can be exercised with stubs in tests.

pub mod css;
pub mod preprocess;

use std::path::Path;
use thiserror::Error;

pub use css::{default_browsers, MinifyStage, PrefixStage};
pub use preprocess::PreprocessStage;

use crate::config::TransformConfig;

/// Failure of one transform stage on one file.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StageError {
    /// Failure description, typically including the offending file
    pub message: String,
}

impl StageError {
    /// Create a stage error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// One step of the transform chain.
pub trait Stage: Send + Sync {
    /// Stage name used in outcome reports (e.g. `minify`).
    fn name(&self) -> &'static str;

    /// Transform the contents of one file.
    ///
    /// `source` is the originating path, for diagnostics only; stages must
    /// not read from or write to the filesystem.
    fn apply(&self, input: &[u8], source: &Path) -> Result<Vec<u8>, StageError>;
}

/// The ordered list of stages applied to each file of a unit.
pub struct TransformChain {
    stages: Vec<Box<dyn Stage>>,
}

impl TransformChain {
    /// Create a chain from an explicit stage list.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Build the production chain from the transform configuration:
    /// preprocess, minify, vendor-prefix.
    pub fn from_config(config: &TransformConfig) -> Self {
        let browsers = css::browsers_from_config(&config.targets);
        Self::new(vec![
            Box::new(PreprocessStage::from_command(config.preprocess.clone())),
            Box::new(MinifyStage::new()),
            Box::new(PrefixStage::new(browsers)),
        ])
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// On failure, returns the failing stage's name with the error.
    pub fn apply(&self, input: Vec<u8>, source: &Path) -> Result<Vec<u8>, (&'static str, StageError)> {
        let mut current = input;
        for stage in &self.stages {
            current = stage.apply(&current, source).map_err(|e| (stage.name(), e))?;
        }
        Ok(current)
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
