//! Configuration for the perfusion CIFTI pipeline.
//!
//! A [`Config`] is built once per subject from caller-supplied arguments
//! and never mutated afterwards. Everything downstream (derived paths,
//! stage argument lists) is a pure function of this value.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether perfusion estimates have been corrected for partial volume
/// effects. Selects which Oxford ASL results folder feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialVolumeCorrection {
    /// Use the plain `native_space` results.
    Disabled,
    /// Use the `native_space/pvcorr` results.
    Corrected,
}

impl PartialVolumeCorrection {
    pub fn is_corrected(self) -> bool {
        matches!(self, PartialVolumeCorrection::Corrected)
    }
}

impl From<bool> for PartialVolumeCorrection {
    fn from(enabled: bool) -> Self {
        if enabled {
            PartialVolumeCorrection::Corrected
        } else {
            PartialVolumeCorrection::Disabled
        }
    }
}

/// Immutable per-subject configuration.
///
/// Field order follows the positional invocation surface: subject
/// location, the variable to process, surface/volume resolutions, and
/// the locations of the external stage scripts and Workbench binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the study tree containing per-subject directories.
    pub root_path: PathBuf,

    /// Subject identifier, e.g. "HCA6002236".
    pub subject_id: String,

    /// Name of the volumetric variable to process, e.g. "perfusion_calib".
    pub variable_name: String,

    /// Name of the matching variance variable. Opaque pass-through to the
    /// surface projector; may be empty.
    #[serde(default)]
    pub variable_variance_name: String,

    /// Low-resolution mesh size in thousands of vertices, e.g. 32 for the
    /// fsaverage_LR32k surfaces.
    pub low_res_mesh: u32,

    /// Final volumetric resolution in millimetres.
    pub final_resolution_mm: f64,

    /// Surface smoothing kernel FWHM in millimetres.
    pub smoothing_fwhm_mm: f64,

    /// Grayordinate resolution in millimetres, e.g. 2.0.
    pub grayordinate_resolution_mm: f64,

    /// Surface registration name, e.g. "MSMSulc".
    pub registration_name: String,

    /// Directory containing the external stage scripts.
    pub scripts_path: PathBuf,

    /// Directory containing the Connectome Workbench binaries.
    pub workbench_dir: PathBuf,

    /// Partial volume correction variant to consume.
    pub partial_volume_correction: PartialVolumeCorrection,

    /// Per-subject output subdirectory, e.g. "ASL".
    pub output_subdir: String,

    /// Standard-space template volume used by the volumetric
    /// standardizer. Defaults to the MNI152 2mm template under $FSLDIR.
    #[serde(default = "default_template_volume")]
    pub template_volume: PathBuf,
}

/// MNI152 2mm template shipped with FSL. Falls back to the conventional
/// install prefix when FSLDIR is unset.
pub fn default_template_volume() -> PathBuf {
    std::env::var_os("FSLDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local/fsl"))
        .join("data/standard/MNI152_T1_2mm.nii.gz")
}

impl Config {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    ///
    /// Catches empty identifiers and non-positive resolutions up front;
    /// missing files on disk are still discovered by the first stage that
    /// dereferences them.
    pub fn validate(&self) -> Result<(), PipelineError> {
        fn required(value: &str, name: &str) -> Result<(), PipelineError> {
            if value.trim().is_empty() {
                Err(PipelineError::Configuration(format!(
                    "{name} must not be empty"
                )))
            } else {
                Ok(())
            }
        }

        required(&self.subject_id, "subject_id")?;
        required(&self.variable_name, "variable_name")?;
        required(&self.registration_name, "registration_name")?;
        required(&self.output_subdir, "output_subdir")?;

        for (path, name) in [
            (&self.root_path, "root_path"),
            (&self.scripts_path, "scripts_path"),
            (&self.workbench_dir, "workbench_dir"),
            (&self.template_volume, "template_volume"),
        ] {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "{name} must not be empty"
                )));
            }
        }

        if self.low_res_mesh == 0 {
            return Err(PipelineError::Configuration(
                "low_res_mesh must be > 0".to_string(),
            ));
        }

        for (value, name) in [
            (self.final_resolution_mm, "final_resolution_mm"),
            (self.smoothing_fwhm_mm, "smoothing_fwhm_mm"),
            (self.grayordinate_resolution_mm, "grayordinate_resolution_mm"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::Configuration(format!(
                    "{name} must be a positive number"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        root_path: PathBuf::from("/data"),
        subject_id: "HCA001".to_string(),
        variable_name: "perfusion_calib".to_string(),
        variable_variance_name: "perfusion_var_calib".to_string(),
        low_res_mesh: 32,
        final_resolution_mm: 2.5,
        smoothing_fwhm_mm: 2.0,
        grayordinate_resolution_mm: 2.0,
        registration_name: "MSMSulc".to_string(),
        scripts_path: PathBuf::from("/opt/hcp/scripts"),
        workbench_dir: PathBuf::from("/opt/workbench/bin"),
        partial_volume_correction: PartialVolumeCorrection::Disabled,
        output_subdir: "ASL".to_string(),
        template_volume: PathBuf::from("/usr/local/fsl/data/standard/MNI152_T1_2mm.nii.gz"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_empty_subject_id_rejected() {
        let mut config = test_config();
        config.subject_id = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("subject_id"));
    }

    #[test]
    fn test_zero_mesh_rejected() {
        let mut config = test_config();
        config.low_res_mesh = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_fwhm_rejected() {
        let mut config = test_config();
        config.smoothing_fwhm_mm = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("smoothing_fwhm_mm"));
    }

    #[test]
    fn test_empty_variance_name_allowed() {
        let mut config = test_config();
        config.variable_variance_name = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = test_config();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_pvcorr_serde_representation() {
        let yaml = Config {
            partial_volume_correction: PartialVolumeCorrection::Corrected,
            ..test_config()
        }
        .to_yaml()
        .unwrap();
        assert!(yaml.contains("partial_volume_correction: corrected"));
    }

    #[test]
    fn test_pvcorr_from_bool() {
        assert_eq!(
            PartialVolumeCorrection::from(true),
            PartialVolumeCorrection::Corrected
        );
        assert_eq!(
            PartialVolumeCorrection::from(false),
            PartialVolumeCorrection::Disabled
        );
        assert!(!PartialVolumeCorrection::Disabled.is_corrected());
    }
}
