// SYNOID Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_kinematics::batch::{augment_directory, extract_directory, filter_directory};
use synoid_kinematics::extraction::estimator::CommandPoseEstimator;
use synoid_kinematics::extraction::probe::probe_directory;
use synoid_kinematics::{BatchReport, CoordinateSpace, PipelineConfig};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "synoid-kinematics")]
#[command(about = "SYNOID Kinematics: pose landmarks, motion features, outlier filtering")]
#[command(long_about = None)]
struct Cli {
    /// JSON pipeline config (falls back to $KINEMATICS_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Process independent files on a worker pool
    #[arg(long, global = true)]
    parallel: bool,

    /// Exit non-zero when any file in the batch failed
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract per-frame pose landmarks from every video in a directory
    Extract {
        /// Directory of videos
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for landmark CSVs
        #[arg(short, long)]
        output: PathBuf,

        /// Pose estimator command (spoken to over stdin/stdout)
        #[arg(short, long)]
        estimator: String,

        /// Per-frame decode timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Per-frame estimator response timeout in seconds
        #[arg(long)]
        estimator_timeout: Option<u64>,
    },

    /// Add derived points and joint-pair features to landmark CSVs
    Augment {
        /// Directory of landmark CSVs
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for feature CSVs
        #[arg(short, long)]
        output: PathBuf,

        /// Coordinate space of the output tables
        #[arg(long, value_enum)]
        space: Option<SpaceArg>,

        /// Keep one row per second of video
        #[arg(long)]
        downsample: bool,

        /// Drop frames where no body was detected
        #[arg(long)]
        drop_undetected: bool,

        /// Frame rate used for velocity and downsampling
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Remove outlier rows from feature CSVs with an isolation forest
    Filter {
        /// Directory of feature CSVs (searched recursively)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for filtered CSVs
        #[arg(short, long)]
        output: PathBuf,

        /// Expected fraction of outlier rows, in (0, 0.5]
        #[arg(short, long)]
        contamination: Option<f64>,

        /// Seed for reproducible labels
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Report frame size and rate of every video in a directory
    Probe {
        /// Directory of videos
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SpaceArg {
    Rel,
    Abs,
    Both,
}

impl SpaceArg {
    fn spaces(self) -> Vec<CoordinateSpace> {
        match self {
            SpaceArg::Rel => vec![CoordinateSpace::Relative],
            SpaceArg::Abs => vec![CoordinateSpace::Absolute],
            SpaceArg::Both => vec![CoordinateSpace::Relative, CoordinateSpace::Absolute],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("--- SYNOID KINEMATICS v{} ---", synoid_kinematics::VERSION);

    let cli = Cli::parse();
    let mut config = PipelineConfig::resolve(cli.config.as_deref())?;
    if cli.parallel {
        config.parallel = true;
    }

    let report = match cli.command {
        Commands::Extract {
            input,
            output,
            estimator,
            timeout,
            estimator_timeout,
        } => {
            if let Some(secs) = timeout {
                config.decode_timeout_secs = secs;
            }
            if let Some(secs) = estimator_timeout {
                config.estimator_timeout_secs = secs;
            }
            config.validate()?;
            let response_timeout = Duration::from_secs(config.estimator_timeout_secs);
            extract_directory(
                &input,
                &output,
                || CommandPoseEstimator::spawn(&estimator, response_timeout),
                &config,
            )
            .await?
        }
        Commands::Augment {
            input,
            output,
            space,
            downsample,
            drop_undetected,
            fps,
        } => {
            config.downsample |= downsample;
            config.drop_undetected |= drop_undetected;
            if fps.is_some() {
                config.fps_override = fps;
            }
            config.validate()?;
            let spaces = match space {
                Some(space) => space.spaces(),
                None => vec![config.coordinate_space],
            };
            augment_directory(&input, &output, &spaces, &config)?
        }
        Commands::Filter {
            input,
            output,
            contamination,
            seed,
        } => {
            if let Some(c) = contamination {
                config.contamination = c;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            config.validate()?;
            filter_directory(&input, &output, &config)?
        }
        Commands::Probe { input } => {
            let report = probe_directory(&input).await?;
            for (path, v) in &report.videos {
                println!("{}\t{}x{}\t{:.3} fps", path.display(), v.width, v.height, v.fps);
            }
            for (path, e) in &report.failures {
                println!("{}\tFAILED\t{}", path.display(), e);
            }
            if !report.uniform_size() {
                warn!("[PROBE] Videos differ in frame size; absolute coordinates will not match");
            }
            if cli.strict && !report.failures.is_empty() {
                std::process::exit(1);
            }
            return Ok(());
        }
    };

    summarize(&report);
    if cli.strict && report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn summarize(report: &BatchReport) {
    for failure in &report.failed {
        warn!(
            "[BATCH] {} [{}]: {}",
            failure.path.display(),
            failure.kind,
            failure.message
        );
    }
    info!(
        "[BATCH] {}: {} file(s) done, {} failed in {:.2}s",
        report.stage,
        report.processed.len(),
        report.failed.len(),
        report.elapsed.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augment_args() {
        let cli = Cli::try_parse_from([
            "synoid-kinematics",
            "--parallel",
            "augment",
            "-i",
            "landmarks",
            "-o",
            "features",
            "--space",
            "both",
            "--downsample",
            "--fps",
            "25",
        ])
        .unwrap();
        assert!(cli.parallel);
        assert!(!cli.strict);
        match cli.command {
            Commands::Augment { space, downsample, fps, drop_undetected, .. } => {
                assert_eq!(space, Some(SpaceArg::Both));
                assert_eq!(space.unwrap().spaces().len(), 2);
                assert!(downsample);
                assert!(!drop_undetected);
                assert_eq!(fps, Some(25.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_filter_args_with_global_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "synoid-kinematics",
            "filter",
            "--input",
            "features",
            "--output",
            "filtered",
            "--seed",
            "42",
            "--strict",
        ])
        .unwrap();
        assert!(cli.strict);
        match cli.command {
            Commands::Filter { seed, contamination, .. } => {
                assert_eq!(seed, Some(42));
                assert_eq!(contamination, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extract_requires_estimator() {
        let args = ["synoid-kinematics", "extract", "-i", "v", "-o", "l"];
        assert!(Cli::try_parse_from(args).is_err());

        let cli = Cli::try_parse_from([
            "synoid-kinematics",
            "extract",
            "-i",
            "v",
            "-o",
            "l",
            "-e",
            "python3 pose.py",
            "--estimator-timeout",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract { estimator, estimator_timeout, timeout, .. } => {
                assert_eq!(estimator, "python3 pose.py");
                assert_eq!(estimator_timeout, Some(5));
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
