//! Error taxonomy for the perfusion CIFTI pipeline.
//!
//! Every error aborts the run: there is no retry and no cleanup of
//! partially written outputs. A re-run overwrites stale files.

use crate::pipeline::StageKind;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required parameter is missing or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An external stage could not be started (missing script, bad
    /// permissions, broken scripts path).
    #[error("{stage} stage failed to launch '{}': {source}", program.display())]
    StageLaunch {
        stage: StageKind,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external stage ran but exited unsuccessfully.
    #[error("{stage} stage failed: {status}")]
    StageExecution { stage: StageKind, status: ExitStatus },

    /// Directory creation or another filesystem operation failed.
    #[error("filesystem operation failed at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// The stage this error originated from, if any.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::StageLaunch { stage, .. }
            | PipelineError::StageExecution { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = PipelineError::Configuration("subject_id must not be empty".to_string());
        assert!(err.to_string().contains("subject_id"));
        assert!(err.stage().is_none());
    }

    #[test]
    fn test_stage_launch_error_names_stage() {
        let err = PipelineError::StageLaunch {
            stage: StageKind::SurfaceProjection,
            program: PathBuf::from("/scripts/VolumeToSurfaceMapping.sh"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("surface projection"));
        assert!(msg.contains("VolumeToSurfaceMapping.sh"));
        assert_eq!(err.stage(), Some(StageKind::SurfaceProjection));
    }
}
