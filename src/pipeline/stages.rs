//! External stage definitions and argument marshalling.
//!
//! The pipeline drives five external collaborators, strictly in order:
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌─────────────┐   ┌─────────────┐   ┌───────────┐
//! │  Surface   │──▶│  Surface  │──▶│ Volumetric  │──▶│ Subcortical │──▶│   Dense   │
//! │ Projection │   │ Smoothing │   │ Standardize │   │ Processing  │   │  Scalar   │
//! └────────────┘   └───────────┘   └─────────────┘   └─────────────┘   └───────────┘
//! ```
//!
//! Each stage is a script (or FSL tool) invoked with a positional,
//! order-sensitive argument list built from the configuration and the
//! derived paths. Argument order is part of the interface contract with
//! the collaborator scripts and must not be reordered.

use crate::config::Config;
use crate::paths::DerivedPaths;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// The five external stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    SurfaceProjection,
    SurfaceSmoothing,
    VolumeStandardization,
    SubcorticalProcessing,
    DenseScalarAssembly,
}

impl StageKind {
    /// All stages in their fixed execution order.
    pub const ALL: [StageKind; 5] = [
        StageKind::SurfaceProjection,
        StageKind::SurfaceSmoothing,
        StageKind::VolumeStandardization,
        StageKind::SubcorticalProcessing,
        StageKind::DenseScalarAssembly,
    ];

    /// Collaborator script name under the scripts directory.
    pub fn script_name(self) -> &'static str {
        match self {
            StageKind::SurfaceProjection => "VolumeToSurfaceMapping.sh",
            StageKind::SurfaceSmoothing => "SurfaceSmoothing.sh",
            StageKind::VolumeStandardization => "VolumeToStandardSpace.sh",
            StageKind::SubcorticalProcessing => "SubcorticalProcessing.sh",
            StageKind::DenseScalarAssembly => "CreateDenseScalar.sh",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::SurfaceProjection => "surface projection",
            StageKind::SurfaceSmoothing => "surface smoothing",
            StageKind::VolumeStandardization => "volume standardization",
            StageKind::SubcorticalProcessing => "subcortical processing",
            StageKind::DenseScalarAssembly => "dense scalar assembly",
        };
        f.write_str(name)
    }
}

/// A fully marshalled external stage call: which stage, which program,
/// and its positional arguments.
#[derive(Debug, Clone)]
pub struct StageInvocation {
    pub stage: StageKind,
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl StageInvocation {
    fn new(stage: StageKind, program: PathBuf) -> Self {
        StageInvocation {
            stage,
            program,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for StageInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the five stage invocations in execution order.
///
/// Pure argument marshalling: no filesystem access, so a dry run can
/// print the exact commands a real run would execute.
pub fn stage_invocations(config: &Config, paths: &DerivedPaths) -> Vec<StageInvocation> {
    vec![
        surface_projection(config, paths),
        surface_smoothing(config, paths),
        volume_standardization(config, paths),
        subcortical_processing(config, paths),
        dense_scalar_assembly(config, paths),
    ]
}

fn script(config: &Config, stage: StageKind) -> PathBuf {
    config.scripts_path.join(stage.script_name())
}

/// Map the native-space variable onto the subject and downsampled
/// surfaces, writing into both OutputtoCIFTI directories.
fn surface_projection(config: &Config, paths: &DerivedPaths) -> StageInvocation {
    StageInvocation::new(
        StageKind::SurfaceProjection,
        script(config, StageKind::SurfaceProjection),
    )
    .arg(&config.subject_id)
    .arg(&paths.initial_asl_results)
    .arg(&config.variable_name)
    .arg(&config.variable_variance_name)
    .arg(paths.atlas_cifti_dir())
    .arg(paths.t1w_cifti_dir())
    .arg(paths.t1w_native_surfaces())
    .arg(paths.atlas_native_surfaces())
    .arg(config.low_res_mesh.to_string())
    .arg(&config.registration_name)
    .arg(&paths.downsample_folder)
    .arg(&config.workbench_dir)
}

/// Smooth the projected atlas-space metric in place.
fn surface_smoothing(config: &Config, paths: &DerivedPaths) -> StageInvocation {
    StageInvocation::new(
        StageKind::SurfaceSmoothing,
        script(config, StageKind::SurfaceSmoothing),
    )
    .arg(&config.subject_id)
    .arg(paths.cortical_metric())
    .arg(&paths.downsample_folder)
    .arg(config.low_res_mesh.to_string())
    .arg(config.smoothing_fwhm_mm.to_string())
    .arg(&config.workbench_dir)
}

/// Warp the native-space variable into standard space with the
/// precomputed nonlinear transform. Reads only raw inputs, so it has no
/// dependency on the surface branch.
fn volume_standardization(config: &Config, paths: &DerivedPaths) -> StageInvocation {
    StageInvocation::new(
        StageKind::VolumeStandardization,
        script(config, StageKind::VolumeStandardization),
    )
    .arg(paths.standard_transform())
    .arg(paths.source_volume())
    .arg(paths.t1w_reference_volume())
    .arg(&config.template_volume)
    .arg(paths.resampling_grid())
    .arg(paths.standardized_volume())
}

/// Extract and resample subcortical structures into grayordinate space.
fn subcortical_processing(config: &Config, paths: &DerivedPaths) -> StageInvocation {
    StageInvocation::new(
        StageKind::SubcorticalProcessing,
        script(config, StageKind::SubcorticalProcessing),
    )
    .arg(&paths.initial_asl_results)
    .arg(&config.variable_name)
    .arg(&paths.atlas_space)
    .arg(paths.atlas_cifti_dir())
    .arg(config.final_resolution_mm.to_string())
    .arg(config.smoothing_fwhm_mm.to_string())
    .arg(config.grayordinate_resolution_mm.to_string())
    .arg(&paths.roi_folder)
    .arg(&config.workbench_dir)
}

/// Combine the smoothed cortical metric and the subcortical grayordinate
/// data into the final dense scalar file.
fn dense_scalar_assembly(config: &Config, paths: &DerivedPaths) -> StageInvocation {
    StageInvocation::new(
        StageKind::DenseScalarAssembly,
        script(config, StageKind::DenseScalarAssembly),
    )
    .arg(&config.subject_id)
    .arg(paths.cortical_metric())
    .arg(&paths.roi_folder)
    .arg(config.low_res_mesh.to_string())
    .arg(config.grayordinate_resolution_mm.to_string())
    .arg(config.smoothing_fwhm_mm.to_string())
    .arg(paths.dense_scalar_output())
    .arg(&paths.downsample_folder)
    .arg(&config.workbench_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use std::ffi::OsString;

    fn invocations() -> Vec<StageInvocation> {
        let config = test_config();
        let paths = DerivedPaths::resolve(&config);
        stage_invocations(&config, &paths)
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let stages: Vec<StageKind> = invocations().iter().map(|i| i.stage).collect();
        assert_eq!(stages, StageKind::ALL);
    }

    #[test]
    fn test_scripts_resolve_under_scripts_path() {
        for invocation in invocations() {
            assert!(invocation.program.starts_with("/opt/hcp/scripts"));
        }
    }

    #[test]
    fn test_surface_projection_arguments() {
        let invocation = invocations().remove(0);
        assert_eq!(invocation.args.len(), 12);
        assert_eq!(invocation.args[0], OsString::from("HCA001"));
        assert_eq!(invocation.args[2], OsString::from("perfusion_calib"));
        assert_eq!(invocation.args[3], OsString::from("perfusion_var_calib"));
        assert_eq!(invocation.args[8], OsString::from("32"));
        assert_eq!(invocation.args[9], OsString::from("MSMSulc"));
        assert_eq!(
            invocation.args[11],
            OsString::from("/opt/workbench/bin"),
            "workbench dir is always the final argument"
        );
    }

    #[test]
    fn test_volume_standardization_arguments() {
        let invocation = invocations().remove(2);
        assert_eq!(invocation.stage, StageKind::VolumeStandardization);
        // transform, source, reference, template, grid, final output
        assert_eq!(invocation.args.len(), 6);
        let rendered = invocation.to_string();
        assert!(rendered.contains("acpc_dc2standard.nii.gz"));
        assert!(rendered.contains("perfusion_calib.nii.gz"));
        assert!(rendered.contains("MNI152_T1_2mm.nii.gz"));
        assert!(rendered.contains("perfusion_calib_MNI.nii.gz"));
    }

    #[test]
    fn test_smoothing_receives_fwhm() {
        let invocation = invocations().remove(1);
        assert_eq!(invocation.args[4], OsString::from("2"));
    }

    #[test]
    fn test_assembly_writes_atlas_output() {
        let invocation = invocations().remove(4);
        assert!(invocation
            .to_string()
            .contains("OutputtoCIFTI/perfusion_calib_Atlas"));
    }

    #[test]
    fn test_display_includes_program() {
        let invocation = invocations().remove(0);
        assert!(invocation
            .to_string()
            .starts_with("/opt/hcp/scripts/VolumeToSurfaceMapping.sh"));
    }
}
