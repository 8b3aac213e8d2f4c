// SYNOID Kinematics - Pose Estimator Bridge
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The pose model itself lives outside this crate. `CommandPoseEstimator`
// keeps one estimator process alive for a whole video and talks to it over
// stdin/stdout:
//
//   request:  "{width} {height}\n" followed by width*height*3 rgb24 bytes
//   response: one JSON line, `null` or 33 `[x, y, z]` triples
//
// Any pretrained single-frame model (e.g. a MediaPipe wrapper script) can
// sit behind that protocol.

use crate::error::PipelineError;
use crate::kinematics::geometry::Point3;
use crate::kinematics::landmarks::{Pose, LANDMARK_COUNT};
use image::RgbImage;
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Single-frame body pose estimation.
pub trait PoseEstimator {
    /// Landmarks for one frame, or `None` when no body is detected.
    fn estimate(&mut self, frame: &RgbImage) -> Result<Option<Pose>, PipelineError>;
}

/// Parse one response line of the estimator protocol.
pub fn parse_response(line: &str) -> Result<Option<Pose>, PipelineError> {
    let parsed: Option<Vec<[f64; 3]>> = serde_json::from_str(line.trim())
        .map_err(|e| PipelineError::Estimator(format!("malformed response: {e}")))?;

    let Some(points) = parsed else {
        return Ok(None);
    };
    if points.len() != LANDMARK_COUNT {
        return Err(PipelineError::Estimator(format!(
            "expected {LANDMARK_COUNT} landmarks, got {}",
            points.len()
        )));
    }
    let mut pose: Pose = [Point3::default(); LANDMARK_COUNT];
    for (slot, [x, y, z]) in pose.iter_mut().zip(points) {
        *slot = Point3::new(x, y, z);
    }
    Ok(Some(pose))
}

/// One frame on its way to the estimator process.
struct Request {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// External estimator process speaking the line protocol above.
///
/// Pipe I/O runs on a dedicated thread so every response wait is bounded by
/// `timeout`. A timed-out estimator is killed and fails every later frame.
pub struct CommandPoseEstimator {
    program: String,
    child: Child,
    requests: SyncSender<Request>,
    responses: Receiver<io::Result<String>>,
    timeout: Duration,
    timed_out: bool,
}

impl CommandPoseEstimator {
    /// Spawn the estimator. `command` is split on whitespace into program
    /// and arguments.
    pub fn spawn(command: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| PipelineError::Estimator("empty estimator command".into()))?
            .to_string();

        let mut child = Command::new(&program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PipelineError::Estimator(format!("failed to start '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::Estimator("estimator stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Estimator("estimator stdout unavailable".into()))?;

        let (requests, request_rx) = sync_channel::<Request>(1);
        let (response_tx, responses) = sync_channel(1);
        thread::spawn(move || pump(stdin, BufReader::new(stdout), request_rx, response_tx));

        info!("[EXTRACT] Pose estimator started: {}", command);
        Ok(Self {
            program,
            child,
            requests,
            responses,
            timeout,
            timed_out: false,
        })
    }
}

/// Pipe worker: one request line plus pixels in, one response line out.
/// Exits when the estimator side closes or the owner goes away.
fn pump(
    mut stdin: ChildStdin,
    mut stdout: BufReader<ChildStdout>,
    requests: Receiver<Request>,
    responses: SyncSender<io::Result<String>>,
) {
    for req in requests {
        let result = writeln!(stdin, "{} {}", req.width, req.height)
            .and_then(|_| stdin.write_all(&req.pixels))
            .and_then(|_| stdin.flush())
            .and_then(|_| {
                let mut line = String::new();
                stdout.read_line(&mut line).map(|_| line)
            });
        let failed = result.is_err();
        if responses.send(result).is_err() || failed {
            break;
        }
    }
}

impl PoseEstimator for CommandPoseEstimator {
    fn estimate(&mut self, frame: &RgbImage) -> Result<Option<Pose>, PipelineError> {
        if self.timed_out {
            return Err(PipelineError::Estimator(format!(
                "'{}' was stopped after a timeout",
                self.program
            )));
        }
        let request = Request {
            width: frame.width(),
            height: frame.height(),
            pixels: frame.as_raw().clone(),
        };
        if self.requests.send(request).is_err() {
            return Err(PipelineError::Estimator(format!(
                "'{}' is no longer running",
                self.program
            )));
        }

        match self.responses.recv_timeout(self.timeout) {
            Ok(Ok(line)) if line.is_empty() => Err(PipelineError::Estimator(format!(
                "'{}' closed its output",
                self.program
            ))),
            Ok(Ok(line)) => parse_response(&line),
            Ok(Err(e)) => Err(PipelineError::Estimator(format!(
                "'{}' pipe failed: {e}",
                self.program
            ))),
            Err(RecvTimeoutError::Timeout) => {
                // A late answer must never be paired with the next frame.
                self.timed_out = true;
                let _ = self.child.kill();
                Err(PipelineError::Estimator(format!(
                    "'{}' gave no response within {:?}",
                    self.program, self.timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Estimator(format!(
                "'{}' closed its output",
                self.program
            ))),
        }
    }
}

impl Drop for CommandPoseEstimator {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("[EXTRACT] Estimator already exited: {}", e);
        }
        let _ = self.child.wait();
    }
}
