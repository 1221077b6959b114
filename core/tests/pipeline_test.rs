use aviguardcore::detection::{best_record, Detection, Frame, RgbImage};
use aviguardcore::inference::Detector;
use aviguardcore::processing::{evaluate, DetectionAggregator, FrameDirectory, NoArtifacts};
use aviguardcore::telemetry::CycleLog;
use aviguardcore::PipelineResult;

const BIRD: u32 = 14;

struct SegmentDetector {
    frame: usize,
}

impl Detector for SegmentDetector {
    fn detect(&mut self, _frame: &Frame) -> PipelineResult<Vec<Detection>> {
        let detections = if self.frame == 9 {
            let mut scores = vec![0.91, 0.5];
            scores.extend((0..10).map(|i| 0.6 + i as f32 * 0.02));
            scores.into_iter().map(|s| Detection::new(BIRD, s)).collect()
        } else {
            vec![Detection::new(0, 0.8)]
        };
        self.frame += 1;
        Ok(detections)
    }
}

fn ten_frames() -> Vec<PipelineResult<Frame>> {
    (0..10u8)
        .map(|shade| {
            Ok(Frame::in_memory(RgbImage::from_pixel(
                8,
                8,
                image::Rgb([shade * 20, 0, 0]),
            )))
        })
        .collect()
}

#[test]
fn crowded_last_frame_triggers_the_alert() {
    let mut detector = SegmentDetector { frame: 0 };
    let summary = DetectionAggregator::new(BIRD)
        .aggregate(ten_frames(), &mut detector, &mut NoArtifacts, &CycleLog::starting_now())
        .unwrap();

    assert_eq!(summary.records.len(), 10);
    assert!(summary.records[..9].iter().all(|r| r.object_count == 0
        && r.confidence_min == 0.0
        && r.confidence_max == 0.0
        && r.confidence_avg == 0.0));
    assert_eq!(summary.best.frame_index, 9);
    assert_eq!(summary.best.object_count, 12);
    assert_eq!(summary.best.confidence_max, 0.91);
    assert_eq!(summary.best.confidence_min, 0.5);
    assert_eq!(best_record(&summary.records), Some(&summary.best));

    let decision = evaluate(summary, 10);
    assert!(decision.triggered);
    assert!(!evaluate(decision.summary, 12).triggered);
}

#[test]
fn audit_trail_holds_one_file_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut artifacts = FrameDirectory::new(dir.path());
    let mut detector = SegmentDetector { frame: 0 };
    let summary = DetectionAggregator::new(BIRD)
        .aggregate(ten_frames(), &mut detector, &mut artifacts, &CycleLog::starting_now())
        .unwrap();

    for index in 0..10 {
        assert!(dir.path().join(format!("frame_{:04}.jpg", index)).is_file());
    }
    let best_on_disk = std::fs::read(dir.path().join("frame_0009.jpg")).unwrap();
    assert_eq!(best_on_disk, summary.best_frame_image);
}
