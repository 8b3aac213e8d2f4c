// SYNOID Kinematics - Landmark Extraction
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Video -> landmark table. Every decoded frame yields exactly one record,
// with empty landmark cells when the estimator finds no body.

pub mod decoder;
pub mod estimator;
pub mod probe;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::kinematics::landmarks::{frames_to_table, LandmarkFrame};
use crate::table::FrameTable;
use anyhow::{Context, Result};
use decoder::FfmpegDecoder;
use estimator::PoseEstimator;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Accumulates per-frame estimator output in decode order.
#[derive(Debug, Default)]
pub struct LandmarkRecorder {
    frames: Vec<LandmarkFrame>,
    detected: usize,
}

impl LandmarkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the estimator on the next frame and record the result.
    pub fn record<E: PoseEstimator + ?Sized>(
        &mut self,
        image: &RgbImage,
        estimator: &mut E,
    ) -> Result<(), PipelineError> {
        let frame = self.frames.len();
        let pose = estimator.estimate(image)?;
        if pose.is_some() {
            self.detected += 1;
        } else {
            debug!("[EXTRACT] No pose in frame {}", frame);
        }
        self.frames.push(LandmarkFrame { frame, pose });
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames.len()
    }

    pub fn detected(&self) -> usize {
        self.detected
    }

    pub fn into_table(self, fps: f64) -> Result<FrameTable, PipelineError> {
        frames_to_table(&self.frames, fps)
    }
}

/// Outcome of extracting one video.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSummary {
    pub frames: usize,
    pub detected: usize,
    pub fps: f64,
    pub output: PathBuf,
}

/// Extract landmarks from `video` into `output_csv`.
///
/// The video is probed before anything is written, so a video that cannot be
/// opened leaves no landmarks file behind.
pub async fn extract_landmarks<E: PoseEstimator + ?Sized>(
    video: &Path,
    output_csv: &Path,
    estimator: &mut E,
    config: &PipelineConfig,
) -> Result<ExtractionSummary> {
    let info = probe::probe_video(video)
        .await
        .with_context(|| format!("Opening {}", video.display()))?;
    info!(
        "[EXTRACT] {:?}: {}x{} @ {:.3} fps",
        video, info.width, info.height, info.fps
    );

    let timeout = Duration::from_secs(config.decode_timeout_secs);
    let mut decoder = FfmpegDecoder::open(video, info, timeout)?;
    let mut recorder = LandmarkRecorder::new();

    while let Some(image) = decoder.next_frame().await? {
        recorder
            .record(&image, estimator)
            .with_context(|| format!("Frame {} of {}", recorder.frames(), video.display()))?;
    }
    decoder.finish().await?;

    if recorder.frames() == 0 {
        let msg = format!("no frames decoded from {}", video.display());
        return Err(PipelineError::Video(msg).into());
    }

    let frames = recorder.frames();
    let detected = recorder.detected();
    let table = recorder.into_table(info.fps)?;
    table.write_csv(output_csv)?;

    info!(
        "[EXTRACT] Wrote {:?} ({} frames, {} with pose)",
        output_csv, frames, detected
    );
    Ok(ExtractionSummary {
        frames,
        detected,
        fps: info.fps,
        output: output_csv.to_path_buf(),
    })
}
