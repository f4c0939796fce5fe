//! Uniform execution seam for external stages.
//!
//! Every collaborator is run through [`StageRunner`], so the
//! abort-on-first-failure policy lives in one place and the orchestrator
//! can be exercised in tests without spawning processes.

use crate::error::PipelineError;
use crate::pipeline::StageInvocation;
use std::process::Command;

/// Executes a marshalled stage invocation.
pub trait StageRunner {
    /// Run the stage to completion. A non-zero exit or a failure to
    /// launch aborts the pipeline.
    fn run(&self, invocation: &StageInvocation) -> Result<(), PipelineError>;
}

/// Runs stages as blocking child processes, inheriting stdout/stderr so
/// collaborator diagnostics reach the caller's terminal.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl StageRunner for ProcessRunner {
    fn run(&self, invocation: &StageInvocation) -> Result<(), PipelineError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|source| PipelineError::StageLaunch {
                stage: invocation.stage,
                program: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::StageExecution {
                stage: invocation.stage,
                status,
            })
        }
    }
}
