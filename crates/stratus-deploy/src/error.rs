//! Stage-tagged pipeline errors.

use stratus_common::error::StratusError;
use thiserror::Error;

use crate::pipeline::Stage;

/// A pipeline failure, tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub source: StratusError,
}

impl PipelineError {
    /// Wraps an error with its stage.
    pub const fn new(stage: Stage, source: StratusError) -> Self {
        Self { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_stage_and_cause() {
        let err = PipelineError::new(Stage::RetrieveSecrets, StratusError::tool("aws", "access denied"));
        assert_eq!(err.to_string(), "retrieve-secrets failed: aws failed: access denied");
    }
}
