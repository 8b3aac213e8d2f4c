// SYNOID Kinematics - Video Probe
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// ffprobe wrappers: frame size and frame rate of a video, and a check that a
// directory of videos shares one frame size (absolute coordinates assume it).

use crate::batch::list_files;
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Video container extensions picked up by directory scans.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "avi", "webm"];

/// Stream properties of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoInfo {
    /// Bytes of one decoded rgb24 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parse an ffprobe frame rate, either "num/den" (e.g. "30000/1001") or a
/// plain number.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    let fps = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Parse one `width,height,r_frame_rate` line from ffprobe.
pub fn parse_probe_output(stdout: &str) -> Option<VideoInfo> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut parts = line.split(',');
    let width: u32 = parts.next()?.trim().parse().ok()?;
    let height: u32 = parts.next()?.trim().parse().ok()?;
    let fps = parse_frame_rate(parts.next()?)?;
    (width > 0 && height > 0).then_some(VideoInfo { width, height, fps })
}

/// Probe a video with ffprobe. Fails when the file is missing, unreadable
/// or has no video stream.
pub async fn probe_video(path: &Path) -> Result<VideoInfo, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("video not found: {}", path.display()),
        )));
    }

    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new("ffprobe")
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .output(),
    )
    .await
    .map_err(|_| PipelineError::Video(format!("ffprobe timed out on {}", path.display())))?
    .map_err(|e| PipelineError::Video(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(PipelineError::Video(format!(
            "cannot open {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        PipelineError::Video(format!("no decodable video stream in {}", path.display()))
    })
}

/// Probe results for every video in a directory.
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub videos: Vec<(PathBuf, VideoInfo)>,
    pub failures: Vec<(PathBuf, String)>,
}

impl ProbeReport {
    /// True when every probed video has the same frame size.
    pub fn uniform_size(&self) -> bool {
        match self.videos.first() {
            Some((_, first)) => self
                .videos
                .iter()
                .all(|(_, v)| (v.width, v.height) == (first.width, first.height)),
            None => true,
        }
    }
}

/// Probe all videos directly inside `dir`, sorted by path.
pub async fn probe_directory(dir: &Path) -> Result<ProbeReport, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("video directory not found: {}", dir.display()),
        )));
    }
    let paths = list_files(dir, false, is_video);

    let mut report = ProbeReport::default();
    for path in paths {
        match probe_video(&path).await {
            Ok(info) => {
                info!(
                    "[PROBE] {:?}: {}x{} @ {:.3} fps",
                    path, info.width, info.height, info.fps
                );
                report.videos.push((path, info));
            }
            Err(e) => {
                warn!("[PROBE] {:?}: {}", path, e);
                report.failures.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}
