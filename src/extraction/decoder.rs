// SYNOID Kinematics - Video Decoder
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Streams decoded frames out of ffmpeg as raw rgb24, one frame at a time in
// decode order. Every read is bounded by a timeout so a hung decoder fails
// the file instead of stalling the batch.

use crate::error::PipelineError;
use crate::extraction::probe::VideoInfo;
use image::RgbImage;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

pub struct FfmpegDecoder {
    child: Child,
    stdout: ChildStdout,
    info: VideoInfo,
    timeout: Duration,
    decoded: usize,
}

/// ffmpeg arguments for raw rgb24 output at exactly the probed frame size.
/// Autorotation would otherwise swap width and height for videos carrying a
/// rotation tag, and every frame read would be misaligned.
fn decode_args(path: &Path, info: &VideoInfo) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.push("-s".into());
    args.push(format!("{}x{}", info.width, info.height).into());
    for arg in ["-f", "rawvideo", "-pix_fmt", "rgb24", "-"] {
        args.push(arg.into());
    }
    args
}

impl FfmpegDecoder {
    pub fn open(path: &Path, info: VideoInfo, timeout: Duration) -> Result<Self, PipelineError> {
        let mut child = Command::new("ffmpeg")
            .kill_on_drop(true)
            .args(decode_args(path, &info))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PipelineError::Video(format!("failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Video("ffmpeg stdout unavailable".into()))?;

        Ok(Self {
            child,
            stdout,
            info,
            timeout,
            decoded: 0,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Next frame, or `None` at the end of the stream.
    pub async fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        let mut buf = vec![0u8; self.info.frame_bytes()];
        let mut filled = 0;
        while filled < buf.len() {
            let n = tokio::time::timeout(self.timeout, self.stdout.read(&mut buf[filled..]))
                .await
                .map_err(|_| {
                    PipelineError::Video(format!(
                        "decoder stalled for {:?} at frame {}",
                        self.timeout, self.decoded
                    ))
                })??;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(PipelineError::Video(format!(
                    "truncated frame {} ({filled} of {} bytes)",
                    self.decoded,
                    buf.len()
                )));
            }
            filled += n;
        }

        self.decoded += 1;
        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| PipelineError::Video("frame buffer size mismatch".into()))
    }

    /// Wait for ffmpeg to exit and surface a failed decode.
    pub async fn finish(mut self) -> Result<usize, PipelineError> {
        let status = tokio::time::timeout(self.timeout, self.child.wait())
            .await
            .map_err(|_| PipelineError::Video("ffmpeg did not exit".into()))??;
        if !status.success() {
            return Err(PipelineError::Video(format!(
                "ffmpeg exited with {status} after {} frames",
                self.decoded
            )));
        }
        Ok(self.decoded)
    }
}
