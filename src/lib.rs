//! Perfusion CIFTI processing pipeline.
//!
//! Coordinates the transformation of a subject's ASL perfusion volume
//! from native space into standard surface and subcortical grayordinate
//! representations, ending in a combined dense scalar file.
//!
//! # Architecture
//!
//! - **Config**: immutable per-subject parameter bundle
//! - **Paths**: the derived directory layout shared by all stages
//! - **Pipeline**: sequential invocation of the five external stages
//!   (projection, smoothing, standardization, subcortical, assembly)
//!
//! The heavy lifting (ribbon mapping, smoothing kernels, resampling,
//! CIFTI assembly) lives in external collaborator scripts; this crate
//! owns stage ordering, argument marshalling, and the path contract
//! between stages.
//!
//! # Usage
//!
//! ```no_run
//! use perfusion_cifti::{run_pipeline, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_yaml(&std::fs::read_to_string("subject.yaml")?)?;
//!     run_pipeline(config)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod paths;
pub mod pipeline;

pub use config::{Config, PartialVolumeCorrection};
pub use error::PipelineError;
pub use paths::DerivedPaths;
pub use pipeline::{
    Pipeline, PipelineStats, ProcessRunner, StageInvocation, StageKind, StageRunner,
};

/// Run the full pipeline for one subject.
///
/// Fail-fast: the first stage failure aborts the run and propagates
/// unmodified. Outputs already written stay on disk; a re-run overwrites
/// them.
pub fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    config.validate()?;

    tracing::info!(
        "Processing subject {} ({} -> grayordinates)",
        config.subject_id,
        config.variable_name
    );

    let pipeline = Pipeline::new(config);
    tracing::info!(
        "Writing CIFTI outputs under {}",
        pipeline.paths().atlas_cifti_dir().display()
    );

    let stats = pipeline.run()?;
    tracing::info!("Pipeline complete: {}", stats);
    Ok(stats)
}
