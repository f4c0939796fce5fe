//! Stage sequencing and external process invocation.

mod orchestrator;
mod runner;
mod stages;

pub use orchestrator::{Pipeline, PipelineStats};
pub use runner::{ProcessRunner, StageRunner};
pub use stages::{stage_invocations, StageInvocation, StageKind};
