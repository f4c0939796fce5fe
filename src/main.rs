//! Perfusion CIFTI Pipeline CLI
//!
//! Per-subject driver mapping ASL perfusion results onto standard
//! grayordinates. Parameters are positional and order-sensitive to stay
//! interoperable with existing batch callers.

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use perfusion_cifti::{run_pipeline, Config, PartialVolumeCorrection, Pipeline};

#[derive(Parser)]
#[command(name = "perfusion-cifti")]
#[command(about = "Map ASL perfusion results onto standard grayordinates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one subject
    Run(SubjectArgs),

    /// Print the derived paths and stage commands without executing
    Plan {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Positional per-subject parameters, in the order batch callers pass
/// them.
#[derive(Args)]
struct SubjectArgs {
    /// Root of the study tree
    root_path: PathBuf,

    /// Subject identifier
    subject_id: String,

    /// Volumetric variable to process, e.g. perfusion_calib
    variable_name: String,

    /// Matching variance variable (may be an empty string)
    variable_variance_name: String,

    /// Low-res mesh size in thousands of vertices, e.g. 32
    low_res_mesh: u32,

    /// Final volumetric resolution in mm
    final_resolution_mm: f64,

    /// Surface smoothing FWHM in mm
    smoothing_fwhm_mm: f64,

    /// Grayordinate resolution in mm
    grayordinate_resolution_mm: f64,

    /// Surface registration name, e.g. MSMSulc
    registration_name: String,

    /// Directory containing the stage scripts
    scripts_path: PathBuf,

    /// Directory containing the Workbench binaries
    workbench_dir: PathBuf,

    /// Consume partial-volume-corrected results (true/false)
    #[arg(value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    partial_volume_correction: bool,

    /// Per-subject output subdirectory, e.g. ASL
    output_subdir: String,

    /// Standard-space template volume (default: MNI152 2mm under $FSLDIR)
    #[arg(long)]
    template: Option<PathBuf>,
}

impl SubjectArgs {
    fn into_config(self) -> Config {
        Config {
            root_path: self.root_path,
            subject_id: self.subject_id,
            variable_name: self.variable_name,
            variable_variance_name: self.variable_variance_name,
            low_res_mesh: self.low_res_mesh,
            final_resolution_mm: self.final_resolution_mm,
            smoothing_fwhm_mm: self.smoothing_fwhm_mm,
            grayordinate_resolution_mm: self.grayordinate_resolution_mm,
            registration_name: self.registration_name,
            scripts_path: self.scripts_path,
            workbench_dir: self.workbench_dir,
            partial_volume_correction: PartialVolumeCorrection::from(
                self.partial_volume_correction,
            ),
            output_subdir: self.output_subdir,
            template_volume: self
                .template
                .unwrap_or_else(perfusion_cifti::config::default_template_volume),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(subject) => {
            run_pipeline(subject.into_config())?;
        }

        Commands::Plan { subject, json } => {
            plan_command(subject.into_config(), json)?;
        }
    }

    Ok(())
}

fn plan_command(config: Config, json: bool) -> Result<()> {
    config.validate()?;
    let pipeline = Pipeline::new(config.clone());

    if json {
        let plan = serde_json::json!({
            "config": config,
            "paths": pipeline.paths(),
            "stages": pipeline
                .invocations()
                .iter()
                .map(|invocation| invocation.to_string())
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("# Configuration\n{}", config.to_yaml()?);
    println!("# Derived paths\n{}", serde_yaml::to_string(pipeline.paths())?);
    println!("# Stage commands");
    for invocation in pipeline.invocations() {
        println!("[{}] {}", invocation.stage, invocation);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONALS: [&str; 13] = [
        "/data",
        "HCA001",
        "perfusion_calib",
        "perfusion_var_calib",
        "32",
        "2.5",
        "2",
        "2",
        "MSMSulc",
        "/opt/hcp/scripts",
        "/opt/workbench/bin",
        "false",
        "ASL",
    ];

    fn with_subcommand(sub: &str) -> Vec<String> {
        let mut argv = vec!["perfusion-cifti".to_string(), sub.to_string()];
        argv.extend(POSITIONALS.iter().map(|s| s.to_string()));
        argv
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from(with_subcommand("run")).unwrap();
        let Commands::Run(subject) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = subject.into_config();
        assert_eq!(config.subject_id, "HCA001");
        assert_eq!(config.low_res_mesh, 32);
        assert_eq!(
            config.partial_volume_correction,
            PartialVolumeCorrection::Disabled
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_parse_plan_json() {
        let mut argv = with_subcommand("plan");
        argv.push("--json".to_string());
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(matches!(cli.command, Commands::Plan { json: true, .. }));
    }

    #[test]
    fn test_cli_parse_pvcorr_true() {
        let mut argv = with_subcommand("run");
        argv[13] = "true".to_string();

        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Run(subject) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(
            subject.into_config().partial_volume_correction,
            PartialVolumeCorrection::Corrected
        );
    }

    #[test]
    fn test_cli_rejects_bad_pvcorr_value() {
        let mut argv = with_subcommand("run");
        argv[13] = "maybe".to_string();
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_cli_rejects_missing_positionals() {
        assert!(Cli::try_parse_from(["perfusion-cifti", "run", "/data"]).is_err());
    }

    #[test]
    fn test_template_override() {
        let mut argv = with_subcommand("run");
        argv.push("--template".to_string());
        argv.push("/templates/MNI152_T1_2mm.nii.gz".to_string());

        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Run(subject) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(
            subject.into_config().template_volume,
            PathBuf::from("/templates/MNI152_T1_2mm.nii.gz")
        );
    }
}
