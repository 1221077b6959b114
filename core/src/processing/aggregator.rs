use crate::detection::{DetectionSummary, Frame, FrameRecord};
use crate::inference::Detector;
use crate::prelude::{PipelineError, PipelineResult};
use crate::processing::annotate::{annotate, encode_jpeg};
use crate::processing::artifacts::ArtifactSink;
use crate::telemetry::{CycleLog, CycleStage};
use log::debug;

/// Folds one segment's per-frame detections into a [`DetectionSummary`].
pub struct DetectionAggregator {
    target_class: u32,
}

impl DetectionAggregator {
    pub fn new(target_class: u32) -> Self {
        Self { target_class }
    }

    pub fn target_class(&self) -> u32 {
        self.target_class
    }

    /// Frames are numbered from 0 in stream order. A frame that fails to
    /// decode ends the stream. Artifact write failures are logged only.
    pub fn aggregate<I>(
        &self,
        frames: I,
        detector: &mut dyn Detector,
        artifacts: &mut dyn ArtifactSink,
        log: &CycleLog,
    ) -> PipelineResult<DetectionSummary>
    where
        I: IntoIterator<Item = PipelineResult<Frame>>,
    {
        if detector.restart_if_stopped()? {
            log.warn(CycleStage::Detecting, "detector restarted after a failure");
        }

        let mut records = Vec::new();
        let mut best: Option<(FrameRecord, Vec<u8>)> = None;

        for (frame_index, frame) in frames.into_iter().enumerate() {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    log.warn(
                        CycleStage::Detecting,
                        &format!("frame {} unreadable, closing segment: {}", frame_index, err),
                    );
                    break;
                }
            };

            let detections = detector.detect(&frame)?;
            let scores: Vec<f32> = detections
                .iter()
                .filter(|detection| detection.class_id == self.target_class)
                .map(|detection| detection.confidence)
                .collect();
            let record = FrameRecord::from_confidences(frame_index, &scores);

            let is_best = best
                .as_ref()
                .map_or(true, |(current, _)| record.object_count > current.object_count);

            if is_best || artifacts.enabled() {
                let annotated = annotate(&frame.image, &detections, self.target_class);
                let jpeg = encode_jpeg(&annotated)?;
                if artifacts.enabled() {
                    if let Err(err) = artifacts.persist(frame_index, &jpeg) {
                        log.warn(
                            CycleStage::Detecting,
                            &format!("could not persist frame {}: {}", frame_index, err),
                        );
                    }
                }
                if is_best {
                    best = Some((record.clone(), jpeg));
                }
            }

            debug!(
                "{}",
                log.line(
                    CycleStage::Detecting,
                    &format!(
                        "frame {:04} count={} min={:.2} max={:.2} avg={:.2}",
                        record.frame_index,
                        record.object_count,
                        record.confidence_min,
                        record.confidence_max,
                        record.confidence_avg
                    ),
                )
            );
            records.push(record);
        }

        let (best, best_frame_image) = best
            .ok_or_else(|| PipelineError::EmptySegment("segment yielded no frames".into()))?;

        Ok(DetectionSummary {
            records,
            best,
            best_frame_image,
        })
    }
}
