// SYNOID Kinematics - Batch Runners
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Directory-level drivers for the three stages. One bad file never aborts a
// batch: its error is logged, recorded in the report and the next file runs.

use crate::config::{CoordinateSpace, PipelineConfig};
use crate::error::{error_kind, PipelineError};
use crate::extraction::estimator::PoseEstimator;
use crate::extraction::extract_landmarks;
use crate::extraction::probe::is_video;
use crate::kinematics::augment::{augment_file, is_augmented_output};
use crate::outliers::filter::filter_file;
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};
use walkdir::WalkDir;

/// A file the batch could not process.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub path: PathBuf,
    /// `PipelineError::kind` of the cause, or "other".
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub stage: &'static str,
    /// Input file -> files written for it.
    pub processed: Vec<(PathBuf, Vec<PathBuf>)>,
    pub failed: Vec<BatchFailure>,
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    fn record(&mut self, input: PathBuf, outcome: Result<Vec<PathBuf>>) {
        match outcome {
            Ok(outputs) => self.processed.push((input, outputs)),
            Err(e) => {
                error!("[BATCH] {} failed for {:?}: {:#}", self.stage, input, e);
                self.failed.push(BatchFailure {
                    kind: error_kind(&e),
                    message: format!("{e:#}"),
                    path: input,
                });
            }
        }
    }

    fn finish(mut self, started: Instant) -> Self {
        self.elapsed = started.elapsed();
        info!(
            "[BATCH] {} finished in {:.2}s: {} processed, {} failed",
            self.stage,
            self.elapsed.as_secs_f64(),
            self.processed.len(),
            self.failed.len()
        );
        self
    }
}

fn require_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory not found: {}", dir.display()),
        )));
    }
    Ok(())
}

/// Files under `dir` matching `keep`, sorted. Only the top level unless
/// `recursive`.
pub(crate) fn list_files(
    dir: &Path,
    recursive: bool,
    keep: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| keep(p))
        .collect();
    files.sort();
    files
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Run `job` over every input, on a rayon pool when `config.parallel`.
/// Report order always follows input order.
fn run_files<F>(
    inputs: Vec<PathBuf>,
    config: &PipelineConfig,
    report: &mut BatchReport,
    job: F,
) -> Result<()>
where
    F: Fn(&Path) -> Result<Vec<PathBuf>> + Sync,
{
    if config.parallel && inputs.len() > 1 {
        let workers = config.worker_count();
        info!("[BATCH] {} fanning out over {} workers", report.stage, workers);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
        let outcomes: Vec<Result<Vec<PathBuf>>> =
            pool.install(|| inputs.par_iter().map(|p| job(p)).collect());
        for (input, outcome) in inputs.into_iter().zip(outcomes) {
            report.record(input, outcome);
        }
    } else {
        for input in inputs {
            let outcome = job(&input);
            report.record(input, outcome);
        }
    }
    Ok(())
}

/// Extract landmarks from every video in `input_dir` into
/// `{output_dir}/{stem}.csv`. Videos are processed one at a time, each with
/// a fresh estimator from `make_estimator`.
pub async fn extract_directory<F, E>(
    input_dir: &Path,
    output_dir: &Path,
    mut make_estimator: F,
    config: &PipelineConfig,
) -> Result<BatchReport>
where
    F: FnMut() -> Result<E, PipelineError>,
    E: PoseEstimator,
{
    require_dir(input_dir)?;
    let started = Instant::now();
    let mut report = BatchReport::new("extract");

    let videos = list_files(input_dir, false, is_video);
    info!("[EXTRACT] Found {} video(s) in {:?}", videos.len(), input_dir);

    for video in videos {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let output = output_dir.join(format!("{stem}.csv"));

        let outcome = match make_estimator() {
            Ok(mut estimator) => extract_landmarks(&video, &output, &mut estimator, config)
                .await
                .map(|summary| vec![summary.output]),
            Err(e) => Err(e.into()),
        };
        report.record(video, outcome);
    }
    Ok(report.finish(started))
}

/// Augment every landmark CSV directly inside `input_dir`.
pub fn augment_directory(
    input_dir: &Path,
    output_dir: &Path,
    spaces: &[CoordinateSpace],
    config: &PipelineConfig,
) -> Result<BatchReport> {
    require_dir(input_dir)?;
    let started = Instant::now();
    let mut report = BatchReport::new("augment");

    let inputs = list_files(input_dir, false, |p| is_csv(p) && !is_augmented_output(p));
    info!("[AUGMENT] Found {} landmark file(s) in {:?}", inputs.len(), input_dir);

    run_files(inputs, config, &mut report, |input| {
        augment_file(input, output_dir, spaces, config)
    })?;
    Ok(report.finish(started))
}

/// Filter every feature CSV under `input_dir`, mirroring relative paths
/// into `output_dir`.
pub fn filter_directory(
    input_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<BatchReport> {
    require_dir(input_dir)?;
    let started = Instant::now();
    let mut report = BatchReport::new("filter");

    // Skip our own outputs when the output directory sits inside the input.
    let nested_output = output_dir != input_dir && output_dir.starts_with(input_dir);
    let inputs = list_files(input_dir, true, |p| {
        is_csv(p) && !(nested_output && p.starts_with(output_dir))
    });
    info!("[FILTER] Found {} feature file(s) in {:?}", inputs.len(), input_dir);

    run_files(inputs, config, &mut report, |input| {
        let relative = input.strip_prefix(input_dir).unwrap_or(input);
        let output = output_dir.join(relative);
        filter_file(input, &output, config).map(|_| vec![output])
    })?;
    Ok(report.finish(started))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_files_depth_and_order() {
        let dir = std::env::temp_dir().join("synoid_test_batch_list");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.csv", "a.csv", "notes.txt", "nested/c.csv"] {
            std::fs::write(dir.join(name), "x\n1\n").unwrap();
        }

        let flat = list_files(&dir, false, is_csv);
        assert_eq!(flat, vec![dir.join("a.csv"), dir.join("b.csv")]);

        let deep = list_files(&dir, true, is_csv);
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.join("nested/c.csv")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_input_dir_is_fatal() {
        let missing = Path::new("/definitely/not/a/dir");
        let rel = [CoordinateSpace::Relative];
        let config = PipelineConfig::default();
        let err = augment_directory(missing, missing, &rel, &config).unwrap_err();
        assert_eq!(error_kind(&err), "io");
    }

    #[test]
    fn test_report_records_failure_kind() {
        let mut report = BatchReport::new("filter");
        report.record("ok.csv".into(), Ok(vec!["out/ok.csv".into()]));
        report.record(
            "bad.csv".into(),
            Err(anyhow::Error::new(PipelineError::ModelFit("table has no rows".into()))),
        );
        assert!(report.has_failures());
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.failed[0].kind, "model_fit");
        assert_eq!(report.failed[0].path, PathBuf::from("bad.csv"));
    }
}
