//! Detector running as a long-lived child process.
//!
//! The child reads one JSON request per line on stdin,
//! `{"frame": "/path/to/frame.png"}`, and answers with one JSON line on
//! stdout, `{"detections": [{"class_id": 14, "confidence": 0.91,
//! "bbox": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}}]}`. The model is loaded
//! once when the child starts.

use crate::capture::CommandTemplate;
use crate::detection::{Detection, Frame};
use crate::inference::Detector;
use crate::prelude::{PipelineError, PipelineResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use tempfile::TempDir;

#[derive(Serialize)]
struct DetectRequest<'a> {
    frame: &'a Path,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    error: Option<String>,
}

/// A running child and its pipes.
struct Running {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Running {
    fn spawn(command: &CommandTemplate) -> PipelineResult<Self> {
        let mut child = command
            .command(&[])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| {
                PipelineError::DetectorFailed(format!("spawning {}: {}", command.program, err))
            })?;

        match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => {
                info!(
                    "detector sidecar {} started (pid {})",
                    command.program,
                    child.id()
                );
                Ok(Self {
                    child,
                    stdin,
                    stdout: BufReader::new(stdout),
                })
            }
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                Err(PipelineError::DetectorFailed(
                    "detector pipes unavailable".into(),
                ))
            }
        }
    }

    fn exchange(&mut self, request: &str) -> PipelineResult<DetectResponse> {
        writeln!(self.stdin, "{}", request)
            .and_then(|_| self.stdin.flush())
            .map_err(|err| PipelineError::DetectorFailed(format!("writing request: {}", err)))?;

        // Anything that is not a JSON object is chatter from the model
        // runtime, not an answer.
        loop {
            let mut line = String::new();
            let read = self.stdout.read_line(&mut line).map_err(|err| {
                PipelineError::DetectorFailed(format!("reading response: {}", err))
            })?;
            if read == 0 {
                return Err(PipelineError::DetectorFailed(
                    "detector closed its output".into(),
                ));
            }
            let line = line.trim();
            if !line.starts_with('{') {
                if !line.is_empty() {
                    debug!("detector output: {}", line);
                }
                continue;
            }
            return serde_json::from_str(line).map_err(|err| {
                PipelineError::DetectorFailed(format!("malformed response {:?}: {}", line, err))
            });
        }
    }

    fn stop(mut self) {
        drop(self.stdin);
        match self.child.try_wait() {
            Ok(Some(status)) => info!("detector sidecar already exited: {}", status),
            _ => {
                if let Err(err) = self.child.kill() {
                    warn!("stopping detector sidecar: {}", err);
                }
                let _ = self.child.wait();
                info!("detector sidecar stopped");
            }
        }
    }
}

/// Keeps one detector child alive across frames. When the child breaks the
/// protocol it is reaped, and the next request starts a fresh one from the
/// same command.
pub struct SidecarDetector {
    command: CommandTemplate,
    running: Option<Running>,
    stopped: bool,
    scratch: TempDir,
}

impl SidecarDetector {
    pub fn spawn(command: &CommandTemplate) -> PipelineResult<Self> {
        let running = Running::spawn(command)?;
        let scratch = tempfile::Builder::new()
            .prefix("aviguard-detect")
            .tempdir()
            .map_err(|err| PipelineError::DetectorFailed(format!("scratch dir: {}", err)))?;

        Ok(Self {
            command: command.clone(),
            running: Some(running),
            stopped: false,
            scratch,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn frame_path(&self, frame: &Frame) -> PipelineResult<PathBuf> {
        if let Some(source) = &frame.source {
            return Ok(source.clone());
        }
        let path = self.scratch.path().join("frame.png");
        frame.image.save(&path).map_err(|err| {
            PipelineError::DetectorFailed(format!("staging frame for detector: {}", err))
        })?;
        Ok(path)
    }

    fn running(&mut self) -> PipelineResult<&mut Running> {
        if self.stopped {
            return Err(PipelineError::DetectorFailed(
                "detector already stopped".into(),
            ));
        }
        if self.running.is_none() {
            self.running = Some(Running::spawn(&self.command)?);
        }
        self.running
            .as_mut()
            .ok_or_else(|| PipelineError::DetectorFailed("detector unavailable".into()))
    }
}

impl Detector for SidecarDetector {
    fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<Detection>> {
        let path = self.frame_path(frame)?;
        let request = serde_json::to_string(&DetectRequest { frame: &path })
            .map_err(|err| PipelineError::DetectorFailed(err.to_string()))?;

        let exchanged = self
            .running()
            .and_then(|running| running.exchange(&request));
        let response = match exchanged {
            Ok(response) => response,
            Err(err) => {
                if let Some(running) = self.running.take() {
                    running.stop();
                }
                return Err(err);
            }
        };
        if let Some(error) = response.error {
            return Err(PipelineError::DetectorFailed(error));
        }
        debug!(
            "{} detection(s) for {}",
            response.detections.len(),
            path.display()
        );
        Ok(response.detections)
    }

    fn restart_if_stopped(&mut self) -> PipelineResult<bool> {
        if self.stopped || self.running.is_some() {
            return Ok(false);
        }
        self.running()?;
        Ok(true)
    }

    fn shutdown(&mut self) {
        self.stopped = true;
        if let Some(running) = self.running.take() {
            running.stop();
        }
    }
}

impl Drop for SidecarDetector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::detection::RgbImage;

    fn shell(script: &str) -> CommandTemplate {
        CommandTemplate::new("sh", &["-c", script])
    }

    #[test]
    fn sidecar_round_trips_one_request_per_frame() {
        let script = r#"while read line; do echo '{"detections":[{"class_id":14,"confidence":0.75}]}'; done"#;
        let mut detector = SidecarDetector::spawn(&shell(script)).unwrap();
        let frame = Frame::in_memory(RgbImage::new(2, 2));

        for _ in 0..2 {
            let detections = detector.detect(&frame).unwrap();
            assert_eq!(detections, vec![Detection::new(14, 0.75)]);
        }
        detector.shutdown();
    }

    #[test]
    fn sidecar_that_exits_reports_detector_failure() {
        let mut detector = SidecarDetector::spawn(&shell("exit 0")).unwrap();
        let frame = Frame::in_memory(RgbImage::new(2, 2));
        let err = detector.detect(&frame).unwrap_err();
        assert_eq!(err.kind(), "DetectorFailed");
    }

    #[test]
    fn sidecar_error_field_is_surfaced() {
        let script = r#"read line; echo '{"error":"model not loaded"}'"#;
        let mut detector = SidecarDetector::spawn(&shell(script)).unwrap();
        let frame = Frame::in_memory(RgbImage::new(2, 2));
        let err = detector.detect(&frame).unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
        assert!(detector.is_running());
    }

    #[test]
    fn chatter_before_a_response_keeps_answers_paired() {
        let script = r#"read line; echo 'loading model'; echo '{"detections":[{"class_id":14,"confidence":0.1}]}'
read line; echo ''; echo 'speed: 12ms inference'; echo '{"detections":[{"class_id":14,"confidence":0.2}]}'
while read line; do :; done"#;
        let mut detector = SidecarDetector::spawn(&shell(script)).unwrap();
        let frame = Frame::in_memory(RgbImage::new(2, 2));

        assert_eq!(detector.detect(&frame).unwrap(), vec![Detection::new(14, 0.1)]);
        assert_eq!(detector.detect(&frame).unwrap(), vec![Detection::new(14, 0.2)]);
        detector.shutdown();
    }

    #[test]
    fn exited_sidecar_is_respawned_on_the_next_request() {
        let script = r#"read line; echo '{"detections":[{"class_id":14,"confidence":0.5}]}'"#;
        let mut detector = SidecarDetector::spawn(&shell(script)).unwrap();
        let frame = Frame::in_memory(RgbImage::new(2, 2));

        assert_eq!(detector.detect(&frame).unwrap().len(), 1);
        assert_eq!(detector.detect(&frame).unwrap_err().kind(), "DetectorFailed");
        assert!(!detector.is_running());

        assert!(detector.restart_if_stopped().unwrap());
        assert_eq!(detector.detect(&frame).unwrap().len(), 1);

        // Lazy respawn without an explicit restart.
        assert!(detector.detect(&frame).is_err());
        assert_eq!(detector.detect(&frame).unwrap().len(), 1);
    }

    #[test]
    fn shutdown_is_final() {
        let script = r#"while read line; do echo '{"detections":[]}'; done"#;
        let mut detector = SidecarDetector::spawn(&shell(script)).unwrap();
        detector.shutdown();
        assert!(!detector.restart_if_stopped().unwrap());
        let frame = Frame::in_memory(RgbImage::new(2, 2));
        assert_eq!(detector.detect(&frame).unwrap_err().kind(), "DetectorFailed");
    }
}
