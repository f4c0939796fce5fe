//! Derived directory and file layout for a single subject.
//!
//! The naming scheme below is the data contract between pipeline stages
//! and with downstream consumers: everything is a deterministic string
//! derivation from the configuration, computed once and never mutated.
//! No I/O happens here; directory creation is the orchestrator's job.

use crate::config::Config;
use serde::Serialize;
use std::path::PathBuf;

/// All working directories and key file paths for one subject.
///
/// `resolve` is a pure function of [`Config`]: two configs that differ
/// only in non-path fields (smoothing width, resolutions) yield
/// identical derived paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedPaths {
    /// Root of the structural preprocessing outputs:
    /// `<root>/<subject>/<subject>_V1_MR/resources/Structural_preproc/files/<subject>_V1_MR`.
    pub structural_preproc: PathBuf,

    /// `MNINonLinear` folder under the structural preproc root.
    pub atlas_space: PathBuf,

    /// `T1w` folder under the structural preproc root.
    pub t1w: PathBuf,

    /// Native-space ASL working tree: `<root>/<subject>/<output_subdir>/ASLT1w`.
    pub asl_t1w: PathBuf,

    /// T1w-space results folder.
    pub t1w_results: PathBuf,

    /// Oxford ASL native-space results feeding every stage. Carries a
    /// `pvcorr` suffix when partial volume correction is enabled.
    pub initial_asl_results: PathBuf,

    /// Atlas-space results folder: `<root>/<subject>/<output_subdir>/ASLMNI/Results`.
    pub atlas_results: PathBuf,

    /// Downsampled-surface folder, e.g. `fsaverage_LR32k`.
    pub downsample_folder: PathBuf,

    /// Subcortical ROI masks folder.
    pub roi_folder: PathBuf,

    /// Base name of the combined dense scalar output, `<variable>_Atlas`.
    pub dense_scalar_name: String,

    variable_name: String,
}

impl DerivedPaths {
    /// Compute the full layout from a configuration.
    pub fn resolve(config: &Config) -> Self {
        let subject = &config.subject_id;
        let session = format!("{subject}_V1_MR");

        let structural_preproc = config
            .root_path
            .join(subject)
            .join(&session)
            .join("resources/Structural_preproc/files")
            .join(&session);
        let atlas_space = structural_preproc.join("MNINonLinear");
        let t1w = structural_preproc.join("T1w");

        let subject_output = config.root_path.join(subject).join(&config.output_subdir);
        let asl_t1w = subject_output.join("ASLT1w");
        let t1w_results = asl_t1w.join("Results");

        let mut initial_asl_results = asl_t1w.join("TIs/OxfordASL/native_space");
        if config.partial_volume_correction.is_corrected() {
            initial_asl_results.push("pvcorr");
        }

        let atlas_results = subject_output.join("ASLMNI").join("Results");
        let downsample_folder =
            atlas_space.join(format!("fsaverage_LR{}k", config.low_res_mesh));
        let roi_folder = atlas_space.join("ROIs");

        DerivedPaths {
            structural_preproc,
            atlas_space,
            t1w,
            asl_t1w,
            t1w_results,
            initial_asl_results,
            atlas_results,
            downsample_folder,
            roi_folder,
            dense_scalar_name: format!("{}_Atlas", config.variable_name),
            variable_name: config.variable_name.clone(),
        }
    }

    /// Atlas-space `OutputtoCIFTI` directory, created at bootstrap.
    pub fn atlas_cifti_dir(&self) -> PathBuf {
        self.atlas_results.join("OutputtoCIFTI")
    }

    /// T1w-space `OutputtoCIFTI` directory, created at bootstrap.
    pub fn t1w_cifti_dir(&self) -> PathBuf {
        self.t1w_results.join("OutputtoCIFTI")
    }

    /// Native-mesh surfaces in T1w space.
    pub fn t1w_native_surfaces(&self) -> PathBuf {
        self.t1w.join("Native")
    }

    /// Native-mesh surfaces in atlas space.
    pub fn atlas_native_surfaces(&self) -> PathBuf {
        self.atlas_space.join("Native")
    }

    /// Nonlinear acpc-to-standard warp produced by structural preprocessing.
    pub fn standard_transform(&self) -> PathBuf {
        self.atlas_space.join("xfms/acpc_dc2standard.nii.gz")
    }

    /// Native T1w reference volume for the volumetric standardizer.
    pub fn t1w_reference_volume(&self) -> PathBuf {
        self.t1w.join("T1w_acpc_dc_restore.nii.gz")
    }

    /// Native-space source volume for the processed variable.
    pub fn source_volume(&self) -> PathBuf {
        self.initial_asl_results
            .join(format!("{}.nii.gz", self.variable_name))
    }

    /// Cortical metric handed to the smoother and assembler. External
    /// stages append their own extensions to this base path.
    pub fn cortical_metric(&self) -> PathBuf {
        self.atlas_cifti_dir().join(&self.variable_name)
    }

    /// Intermediate resampling grid written during standardization.
    pub fn resampling_grid(&self) -> PathBuf {
        self.atlas_cifti_dir().join("asl_grid_mni.nii.gz")
    }

    /// Final standardized volume, `<variable>_MNI.nii.gz`.
    pub fn standardized_volume(&self) -> PathBuf {
        self.atlas_cifti_dir()
            .join(format!("{}_MNI.nii.gz", self.variable_name))
    }

    /// Combined dense scalar output path.
    pub fn dense_scalar_output(&self) -> PathBuf {
        self.atlas_cifti_dir().join(&self.dense_scalar_name)
    }
}
