use aviguardcore::capture::{CaptureSettings, CommandTemplate};
use aviguardcore::upload::{HttpSettings, RetryPolicy};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub device_id: String,
    pub threshold: usize,
    pub target_class: u32,
    pub segment_seconds: f64,
    pub pulse_seconds: f64,
    pub cycle_pause_seconds: f64,
    pub capture_retry_pause_seconds: f64,
    pub alarm_pin: u8,
    pub videos_dir: PathBuf,
    pub output_dir: PathBuf,
    pub persist_frames: bool,
    pub retain_segments: bool,
    pub decoder_program: String,
    pub detector: CommandTemplate,
    pub capture: CaptureSettings,
    pub upload: UploadConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    pub max_attempts: u32,
    pub backoff_seconds: f64,
    pub timeout_seconds: f64,
    pub max_redirects: usize,
    pub success_status: u16,
    pub retryable_statuses: Vec<u16>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            device_id: "2".into(),
            threshold: 10,
            target_class: 14,
            segment_seconds: 5.0,
            pulse_seconds: 2.0,
            cycle_pause_seconds: 1.0,
            capture_retry_pause_seconds: 1.0,
            alarm_pin: 17,
            videos_dir: PathBuf::from("videos"),
            output_dir: PathBuf::from("output"),
            persist_frames: true,
            retain_segments: true,
            decoder_program: "ffmpeg".into(),
            detector: CommandTemplate::new("aviguard-detector", &["--model", "yolo11n.pt"]),
            capture: CaptureSettings::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        let policy = RetryPolicy::default();
        Self {
            endpoint: http.endpoint,
            max_attempts: policy.max_attempts,
            backoff_seconds: policy.backoff.as_secs_f64(),
            timeout_seconds: http.timeout.as_secs_f64(),
            max_redirects: http.max_redirects,
            success_status: policy.success_status,
            retryable_statuses: policy.retryable_statuses,
        }
    }
}

/// Negative or non-finite values collapse to zero; `validate` rejects them first.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl StationConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading station config {}", path_ref.display()))?;
        let config: StationConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing station config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let durations = [
            ("segment_seconds", self.segment_seconds),
            ("pulse_seconds", self.pulse_seconds),
            ("cycle_pause_seconds", self.cycle_pause_seconds),
            ("capture_retry_pause_seconds", self.capture_retry_pause_seconds),
            ("upload.backoff_seconds", self.upload.backoff_seconds),
            ("upload.timeout_seconds", self.upload.timeout_seconds),
        ];
        for (name, value) in durations {
            ensure!(
                Duration::try_from_secs_f64(value).is_ok(),
                "{} must be a finite, non-negative number of seconds (got {})",
                name,
                value
            );
        }
        ensure!(self.segment_seconds > 0.0, "segment_seconds must be positive");
        ensure!(
            self.upload.timeout_seconds > 0.0,
            "upload.timeout_seconds must be positive"
        );
        ensure!(self.upload.max_attempts >= 1, "upload.max_attempts must be at least 1");
        ensure!(!self.device_id.is_empty(), "device_id must not be empty");
        Ok(())
    }

    pub fn segment_duration(&self) -> Duration {
        seconds(self.segment_seconds)
    }

    pub fn pulse_duration(&self) -> Duration {
        seconds(self.pulse_seconds)
    }

    pub fn cycle_pause(&self) -> Duration {
        seconds(self.cycle_pause_seconds)
    }

    pub fn capture_retry_pause(&self) -> Duration {
        seconds(self.capture_retry_pause_seconds)
    }
}

impl UploadConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: seconds(self.backoff_seconds),
            success_status: self.success_status,
            retryable_statuses: self.retryable_statuses.clone(),
        }
    }

    pub fn to_http_settings(&self) -> HttpSettings {
        HttpSettings {
            endpoint: self.endpoint.clone(),
            timeout: seconds(self.timeout_seconds),
            max_redirects: self.max_redirects,
            ..HttpSettings::default()
        }
    }
}
