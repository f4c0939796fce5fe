//! Sequential orchestration of the five external stages.
//!
//! The orchestrator owns the run lifecycle for one subject: validate the
//! configuration, create the output directories, then drive the stages
//! strictly in order, aborting on the first failure. All inter-stage
//! communication is through the derived file tree; nothing is retried
//! and nothing is cleaned up on failure, so re-runs simply overwrite.

use crate::config::Config;
use crate::error::PipelineError;
use crate::paths::DerivedPaths;
use crate::pipeline::{stage_invocations, ProcessRunner, StageInvocation, StageRunner};
use std::fmt;
use std::path::Path;

/// Pipeline for a single subject.
pub struct Pipeline<R = ProcessRunner> {
    config: Config,
    paths: DerivedPaths,
    runner: R,
}

impl Pipeline<ProcessRunner> {
    /// Create a pipeline that runs stages as child processes.
    pub fn new(config: Config) -> Self {
        Pipeline::with_runner(config, ProcessRunner)
    }
}

impl<R: StageRunner> Pipeline<R> {
    /// Create a pipeline with a custom stage runner.
    pub fn with_runner(config: Config, runner: R) -> Self {
        let paths = DerivedPaths::resolve(&config);
        Pipeline {
            config,
            paths,
            runner,
        }
    }

    /// The derived directory layout for this subject.
    pub fn paths(&self) -> &DerivedPaths {
        &self.paths
    }

    /// The stage invocations this pipeline will execute, in order.
    pub fn invocations(&self) -> Vec<StageInvocation> {
        stage_invocations(&self.config, &self.paths)
    }

    /// Create the OutputtoCIFTI directories. Idempotent: an existing
    /// tree is left untouched.
    pub fn bootstrap(&self) -> Result<(), PipelineError> {
        for dir in [self.paths.atlas_cifti_dir(), self.paths.t1w_cifti_dir()] {
            create_dir_tree(&dir)?;
        }
        Ok(())
    }

    /// Run the full pipeline: bootstrap, then every stage in order.
    ///
    /// Stops at the first failing stage; outputs of completed stages are
    /// left in place.
    pub fn run(&self) -> Result<PipelineStats, PipelineError> {
        self.config.validate()?;
        self.bootstrap()?;

        let invocations = self.invocations();
        let total_stages = invocations.len();
        let mut stats = PipelineStats {
            total_stages,
            ..PipelineStats::default()
        };

        for invocation in invocations {
            tracing::info!(
                "Subject {}: running {} stage",
                self.config.subject_id,
                invocation.stage
            );
            tracing::debug!("{}", invocation);

            self.runner.run(&invocation)?;
            stats.stages_completed += 1;
        }

        tracing::info!(
            "Subject {}: dense scalar written to {}",
            self.config.subject_id,
            self.paths.dense_scalar_output().display()
        );

        Ok(stats)
    }
}

fn create_dir_tree(dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })
}

/// Summary of a completed (or aborted) run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Stages that ran to completion.
    pub stages_completed: usize,

    /// Stages scheduled for the run.
    pub total_stages: usize,
}

impl PipelineStats {
    pub fn is_complete(&self) -> bool {
        self.stages_completed == self.total_stages
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed {} of {} stages",
            self.stages_completed, self.total_stages
        )
    }
}
