use crate::workflow::config::StationConfig;
use anyhow::Context;
use aviguardcore::capture::{CommandCapture, FfmpegDecoder, FrameDecoder, SegmentRecorder};
use aviguardcore::hardware::{AlarmSignaler, DigitalOutput, LoggingOutput};
use aviguardcore::inference::{Detector, SidecarDetector};
use aviguardcore::processing::FrameDirectory;
use aviguardcore::upload::{EvidenceUploader, HttpTransport, ThreadSleeper};
use log::info;
use std::fs;

/// Long-lived handles shared by every cycle. Built once at start-up and
/// torn down once at exit.
pub struct StationContext {
    pub config: StationConfig,
    pub recorder: SegmentRecorder,
    pub decoder: Box<dyn FrameDecoder>,
    pub detector: Box<dyn Detector>,
    pub signaler: AlarmSignaler,
    pub uploader: EvidenceUploader,
    pub artifacts: FrameDirectory,
}

impl StationContext {
    pub fn init(config: StationConfig, mock_alarm: bool) -> anyhow::Result<Self> {
        for dir in [&config.videos_dir, &config.output_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }

        let output = open_alarm_output(config.alarm_pin, mock_alarm)?;
        let signaler = AlarmSignaler::new(output).context("driving alarm output low")?;
        let detector = SidecarDetector::spawn(&config.detector)
            .with_context(|| format!("starting detector {}", config.detector.program))?;

        let recorder = SegmentRecorder::new(
            Box::new(CommandCapture::new(config.capture.clone())),
            config.videos_dir.clone(),
        );
        let decoder = FfmpegDecoder::new(config.decoder_program.clone());
        let uploader = EvidenceUploader::new(
            Box::new(HttpTransport::new(config.upload.to_http_settings())),
            config.upload.to_retry_policy(),
            Box::new(ThreadSleeper),
        );
        let artifacts = FrameDirectory::new(config.output_dir.clone());

        info!(
            "station {} ready: threshold {} on class {}, alarm pin {}, endpoint {}",
            config.device_id,
            config.threshold,
            config.target_class,
            signaler.pin(),
            config.upload.endpoint
        );

        Ok(Self {
            config,
            recorder,
            decoder: Box::new(decoder),
            detector: Box::new(detector),
            signaler,
            uploader,
            artifacts,
        })
    }

    /// Releases the alarm pin and stops the detector.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.detector.shutdown();
        self.signaler
            .release()
            .context("releasing alarm output")?;
        info!("station {} shut down", self.config.device_id);
        Ok(())
    }
}

#[cfg(feature = "rpi")]
fn open_alarm_output(pin: u8, mock: bool) -> anyhow::Result<Box<dyn DigitalOutput>> {
    use aviguardcore::hardware::GpioOutput;

    if mock {
        return Ok(Box::new(LoggingOutput::new(pin)));
    }
    let output =
        GpioOutput::acquire(pin).with_context(|| format!("acquiring alarm pin {}", pin))?;
    Ok(Box::new(output))
}

#[cfg(not(feature = "rpi"))]
fn open_alarm_output(pin: u8, mock: bool) -> anyhow::Result<Box<dyn DigitalOutput>> {
    if !mock {
        log::warn!(
            "built without the rpi feature; alarm pin {} is simulated",
            pin
        );
    }
    Ok(Box::new(LoggingOutput::new(pin)))
}
