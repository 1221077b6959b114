use crate::detection::{VideoSegment, STAMP_FORMAT};
use crate::prelude::{PipelineError, PipelineResult};
use crate::telemetry::{CycleLog, CycleStage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Camera capability: records raw video and optionally converts it to a
/// playable container.
pub trait CaptureDevice {
    fn raw_extension(&self) -> &str;

    fn start_capture(&mut self, duration: Duration, output: &Path) -> PipelineResult<()>;

    /// Extension after conversion, `None` when raw captures are playable.
    fn remux_extension(&self) -> Option<&str> {
        None
    }

    fn remux(&mut self, _input: &Path, _output: &Path) -> PipelineResult<()> {
        Ok(())
    }
}

/// Produces one timestamped segment per call under `videos_dir`.
pub struct SegmentRecorder {
    device: Box<dyn CaptureDevice>,
    videos_dir: PathBuf,
}

impl SegmentRecorder {
    pub fn new(device: Box<dyn CaptureDevice>, videos_dir: PathBuf) -> Self {
        Self { device, videos_dir }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// The segment is named after the cycle start. On failure nothing the
    /// call wrote is left in `videos_dir`.
    pub fn record(&mut self, duration: Duration, log: &CycleLog) -> PipelineResult<VideoSegment> {
        let created_at = log.started();
        let stem = format!("detection_{}", created_at.format(STAMP_FORMAT));
        let raw = self
            .videos_dir
            .join(format!("{}.{}", stem, self.device.raw_extension()));

        if let Err(err) = self
            .device
            .start_capture(duration, &raw)
            .and_then(|_| ensure_non_empty(&raw))
        {
            discard(log, &raw);
            return Err(err);
        }

        let remux_extension = self.device.remux_extension().map(str::to_owned);
        let path = match remux_extension {
            Some(extension) => {
                let remuxed = self.videos_dir.join(format!("{}.{}", stem, extension));
                if remuxed == raw {
                    raw
                } else {
                    let converted = self
                        .device
                        .remux(&raw, &remuxed)
                        .and_then(|_| ensure_non_empty(&remuxed));
                    discard(log, &raw);
                    if let Err(err) = converted {
                        discard(log, &remuxed);
                        return Err(err);
                    }
                    remuxed
                }
            }
            None => raw,
        };

        log.info(
            CycleStage::Recording,
            &format!("recorded {} ({:?})", path.display(), duration),
        );
        Ok(VideoSegment {
            path,
            duration,
            created_at,
        })
    }
}

/// Removes a capture file if it exists.
fn discard(log: &CycleLog, path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => log.warn(
            CycleStage::Recording,
            &format!("could not remove {}: {}", path.display(), err),
        ),
    }
}

fn ensure_non_empty(path: &Path) -> PipelineResult<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(()),
        Ok(_) => Err(PipelineError::CaptureFailed(format!(
            "{} is empty",
            path.display()
        ))),
        Err(err) => Err(PipelineError::CaptureFailed(format!(
            "{} was not produced: {}",
            path.display(),
            err
        ))),
    }
}
