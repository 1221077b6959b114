use crate::shutdown::ShutdownFlag;
use crate::workflow::context::StationContext;
use aviguardcore::detection::{DetectionSummary, VideoSegment};
use aviguardcore::processing::{evaluate, ArtifactSink, DetectionAggregator, NoArtifacts};
use aviguardcore::telemetry::{CycleLog, CycleStage, MetricsRecorder, MetricsSnapshot};
use aviguardcore::upload::UploadMetadata;
use aviguardcore::{PipelineError, PipelineResult};
use std::fs;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped {
        stage: CycleStage,
        kind: &'static str,
    },
    Quiet {
        best_count: usize,
    },
    Alerted {
        best_count: usize,
        uploaded: bool,
    },
}

/// Runs record → detect → decide → alert → upload cycles, one at a time,
/// until shutdown is requested.
pub struct Supervisor {
    context: StationContext,
    aggregator: DetectionAggregator,
    metrics: MetricsRecorder,
    metadata: UploadMetadata,
}

impl Supervisor {
    pub fn new(context: StationContext) -> Self {
        let aggregator = DetectionAggregator::new(context.config.target_class);
        let metadata = UploadMetadata {
            system_id: context.config.device_id.clone(),
        };
        Self {
            context,
            aggregator,
            metrics: MetricsRecorder::new(),
            metadata,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn into_context(self) -> StationContext {
        self.context
    }

    /// The shutdown flag is only consulted between cycles.
    pub fn run(&mut self, shutdown: &ShutdownFlag, once: bool) {
        while !shutdown.requested() {
            let outcome = self.run_cycle();
            if once || shutdown.requested() {
                break;
            }
            let pause = match outcome {
                CycleOutcome::Skipped {
                    stage: CycleStage::Recording,
                    ..
                } => self.context.config.capture_retry_pause(),
                _ => self.context.config.cycle_pause(),
            };
            thread::sleep(pause);
        }
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        let log = CycleLog::starting_now();
        self.metrics.record_cycle();

        let outcome = self.cycle(&log);
        match &outcome {
            CycleOutcome::Skipped { .. } => self.metrics.record_skipped(),
            CycleOutcome::Quiet { .. } => {}
            CycleOutcome::Alerted { uploaded, .. } => {
                self.metrics.record_alert();
                self.metrics.record_upload(*uploaded);
            }
        }
        log.info(CycleStage::Idle, &format!("cycle finished: {:?}", outcome));
        outcome
    }

    fn cycle(&mut self, log: &CycleLog) -> CycleOutcome {
        let duration = self.context.config.segment_duration();
        log.info(CycleStage::Recording, &format!("recording {:?}", duration));
        let segment = match self.context.recorder.record(duration, log) {
            Ok(segment) => segment,
            Err(err) => return skipped(log, CycleStage::Recording, &err),
        };

        let outcome = self.process_segment(log, &segment);

        if !self.context.config.retain_segments {
            if let Err(err) = fs::remove_file(&segment.path) {
                log.warn(
                    CycleStage::Idle,
                    &format!("could not delete {}: {}", segment.path.display(), err),
                );
            }
        }
        outcome
    }

    fn process_segment(&mut self, log: &CycleLog, segment: &VideoSegment) -> CycleOutcome {
        log.info(
            CycleStage::Detecting,
            &format!("analysing {}", segment.path.display()),
        );
        let summary = match self.summarise(log, segment) {
            Ok(summary) => summary,
            Err(err) => return skipped(log, CycleStage::Detecting, &err),
        };

        let threshold = self.context.config.threshold;
        let best_count = summary.best.object_count;
        let decision = evaluate(summary, threshold);
        log.info(
            CycleStage::Deciding,
            &format!(
                "{} frame(s); frame {} holds {} object(s) (threshold {})",
                decision.summary.records.len(),
                decision.summary.best.frame_index,
                best_count,
                threshold
            ),
        );
        if !decision.triggered {
            return CycleOutcome::Quiet { best_count };
        }

        let pulse = self.context.config.pulse_duration();
        log.warn(
            CycleStage::Alerting,
            &format!(
                "{} objects over threshold {}; alarm pin {} HIGH for {:?}",
                best_count,
                threshold,
                self.context.signaler.pin(),
                pulse
            ),
        );
        if let Err(err) = self.context.signaler.pulse(pulse) {
            log.failure(CycleStage::Alerting, &err);
        }

        let uploaded = self.upload_evidence(log, segment, &decision.summary);
        CycleOutcome::Alerted {
            best_count,
            uploaded,
        }
    }

    fn summarise(
        &mut self,
        log: &CycleLog,
        segment: &VideoSegment,
    ) -> PipelineResult<DetectionSummary> {
        let frames = self.context.decoder.open(&segment.path)?;
        let context = &mut self.context;
        let mut discard = NoArtifacts;
        let artifacts: &mut dyn ArtifactSink = if context.config.persist_frames {
            &mut context.artifacts
        } else {
            &mut discard
        };
        self.aggregator
            .aggregate(frames, context.detector.as_mut(), artifacts, log)
    }

    fn upload_evidence(
        &mut self,
        log: &CycleLog,
        segment: &VideoSegment,
        summary: &DetectionSummary,
    ) -> bool {
        let image = match self
            .context
            .artifacts
            .write(summary.best.frame_index, &summary.best_frame_image)
        {
            Ok(path) => path,
            Err(err) => {
                let err = PipelineError::MissingEvidence(format!("writing best frame: {}", err));
                log.failure(CycleStage::Uploading, &err);
                return false;
            }
        };

        log.info(
            CycleStage::Uploading,
            &format!(
                "sending {} and {}",
                image.display(),
                segment.path.display()
            ),
        );
        match self
            .context
            .uploader
            .upload(&segment.path, &image, &self.metadata, log)
        {
            Ok(report) => {
                log.info(
                    CycleStage::Uploading,
                    &format!(
                        "evidence accepted after {} attempt(s) (HTTP {})",
                        report.attempts.len(),
                        report.http_status
                    ),
                );
                true
            }
            Err(err) => {
                log.failure(CycleStage::Uploading, &err);
                false
            }
        }
    }
}

fn skipped(log: &CycleLog, stage: CycleStage, err: &PipelineError) -> CycleOutcome {
    log.failure(stage, err);
    CycleOutcome::Skipped {
        stage,
        kind: err.kind(),
    }
}
