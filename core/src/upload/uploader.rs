use crate::prelude::{PipelineError, PipelineResult};
use crate::telemetry::{CycleLog, CycleStage};
use crate::upload::{
    classify, AttemptStatus, EvidenceFiles, RetryPolicy, Transport, TransportError,
    TransportResponse, UploadAttempt,
};
use log::debug;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Waits between retry attempts.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub system_id: String,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub attempts: Vec<UploadAttempt>,
    pub http_status: u16,
    pub body: String,
}

/// Posts a frame image and its source video with a bounded retry budget.
pub struct EvidenceUploader {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl EvidenceUploader {
    pub fn new(
        transport: Box<dyn Transport>,
        policy: RetryPolicy,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Both files must be non-empty; otherwise no request is made. The files
    /// are opened once, rewound before every attempt and closed on return.
    pub fn upload(
        &mut self,
        video: &Path,
        image: &Path,
        metadata: &UploadMetadata,
        log: &CycleLog,
    ) -> PipelineResult<UploadReport> {
        let mut evidence = EvidenceFiles::open(image, video)?;
        let outcome = self.attempt_all(&mut evidence, metadata, log);
        self.transport.close();
        outcome
    }

    fn attempt_all(
        &mut self,
        evidence: &mut EvidenceFiles,
        metadata: &UploadMetadata,
        log: &CycleLog,
    ) -> PipelineResult<UploadReport> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt_number in 1..=max_attempts {
            if let Err(err) = evidence.rewind() {
                return Err(PipelineError::UploadFailed {
                    attempts,
                    reason: format!("rewinding evidence: {}", err),
                });
            }

            let result = self.transport.send(evidence, metadata);
            let status = classify(&self.policy, &result);
            let http_status = result.as_ref().ok().map(|response| response.status);
            attempts.push(UploadAttempt::new(attempt_number, status, http_status));

            match (status, result) {
                (AttemptStatus::Success, Ok(response)) => {
                    log_body(log, &response);
                    log.info(
                        CycleStage::Uploading,
                        &format!(
                            "evidence uploaded on attempt {}/{} (HTTP {})",
                            attempt_number, max_attempts, response.status
                        ),
                    );
                    return Ok(UploadReport {
                        attempts,
                        http_status: response.status,
                        body: response.body,
                    });
                }
                (AttemptStatus::RetryableFailure, result) => {
                    let err = PipelineError::UploadRetryable(describe(&result));
                    if attempt_number < max_attempts {
                        log.warn(
                            CycleStage::Uploading,
                            &format!(
                                "attempt {}/{}: {}; retrying in {:?}",
                                attempt_number, max_attempts, err, self.policy.backoff
                            ),
                        );
                        self.sleeper.sleep(self.policy.backoff);
                    } else {
                        log.warn(
                            CycleStage::Uploading,
                            &format!("attempt {}/{}: {}", attempt_number, max_attempts, err),
                        );
                    }
                }
                (_, result) => {
                    return Err(PipelineError::UploadFailed {
                        attempts,
                        reason: describe(&result),
                    });
                }
            }
        }

        Err(PipelineError::UploadFailed {
            attempts,
            reason: format!("retry budget of {} attempt(s) exhausted", max_attempts),
        })
    }
}

fn describe(result: &Result<TransportResponse, TransportError>) -> String {
    match result {
        Ok(response) if response.body.is_empty() => format!("HTTP {}", response.status),
        Ok(response) => format!("HTTP {}: {}", response.status, response.body.trim()),
        Err(err) => err.to_string(),
    }
}

fn log_body(log: &CycleLog, response: &TransportResponse) {
    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(json) => log.info(CycleStage::Uploading, &format!("server response: {}", json)),
        Err(_) => debug!(
            "{}",
            log.line(
                CycleStage::Uploading,
                &format!("non-JSON server response: {:?}", response.body),
            )
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct TransportLog {
        sends: usize,
        closes: usize,
        bodies: Vec<(Vec<u8>, Vec<u8>)>,
        content_types: Vec<(String, String)>,
    }

    /// Replays scripted outcomes and records what each attempt read.
    struct ScriptedTransport {
        outcomes: VecDeque<Result<TransportResponse, TransportError>>,
        log: Arc<Mutex<TransportLog>>,
    }

    impl Transport for ScriptedTransport {
        fn send(
            &mut self,
            evidence: &EvidenceFiles,
            _metadata: &UploadMetadata,
        ) -> Result<TransportResponse, TransportError> {
            let mut media = Vec::new();
            let mut video = Vec::new();
            evidence.media.reader().unwrap().read_to_end(&mut media).unwrap();
            evidence.video.reader().unwrap().read_to_end(&mut video).unwrap();

            let mut log = self.log.lock().unwrap();
            log.sends += 1;
            log.bodies.push((media, video));
            log.content_types.push((
                evidence.media.content_type.clone(),
                evidence.video.content_type.clone(),
            ));
            self.outcomes
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request("script exhausted".into())))
        }

        fn close(&mut self) {
            self.log.lock().unwrap().closes += 1;
        }
    }

    struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    struct Harness {
        uploader: EvidenceUploader,
        log: Arc<Mutex<TransportLog>>,
        sleeps: Arc<Mutex<Vec<Duration>>>,
        _dir: TempDir,
        image: PathBuf,
        video: PathBuf,
    }

    fn code(status: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            body: if status == 201 {
                r#"{"id": 42}"#.into()
            } else {
                String::new()
            },
        })
    }

    fn harness(outcomes: Vec<Result<TransportResponse, TransportError>>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("frame_0009.jpg");
        let video = dir.path().join("detection_20250101_120000.mp4");
        fs::write(&image, b"jpeg-bytes").unwrap();
        fs::write(&video, b"mp4-bytes").unwrap();

        let log = Arc::new(Mutex::new(TransportLog::default()));
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let uploader = EvidenceUploader::new(
            Box::new(ScriptedTransport {
                outcomes: outcomes.into(),
                log: log.clone(),
            }),
            RetryPolicy::default(),
            Box::new(RecordingSleeper(sleeps.clone())),
        );
        Harness {
            uploader,
            log,
            sleeps,
            _dir: dir,
            image,
            video,
        }
    }

    fn metadata() -> UploadMetadata {
        UploadMetadata {
            system_id: "2".into(),
        }
    }

    impl Harness {
        fn upload(&mut self) -> PipelineResult<UploadReport> {
            let (video, image) = (self.video.clone(), self.image.clone());
            self.uploader
                .upload(&video, &image, &metadata(), &CycleLog::starting_now())
        }
    }

    #[test]
    fn two_bad_gateways_then_created_succeeds_on_third_attempt() {
        let mut h = harness(vec![code(502), code(502), code(201)]);
        let report = h.upload().unwrap();

        assert_eq!(report.http_status, 201);
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(report.attempts[2].status, AttemptStatus::Success);
        assert_eq!(
            *h.sleeps.lock().unwrap(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
        let log = h.log.lock().unwrap();
        assert_eq!(log.sends, 3);
        assert_eq!(log.closes, 1);
        for (media, video) in &log.bodies {
            assert_eq!(media, b"jpeg-bytes");
            assert_eq!(video, b"mp4-bytes");
        }
    }

    #[test]
    fn three_bad_gateways_exhaust_the_budget() {
        let mut h = harness(vec![code(502), code(502), code(502), code(201)]);
        let err = h.upload().unwrap_err();

        match err {
            PipelineError::UploadFailed { attempts, .. } => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts
                    .iter()
                    .all(|attempt| attempt.status == AttemptStatus::RetryableFailure));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(h.log.lock().unwrap().sends, 3);
        assert_eq!(h.sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn server_error_is_fatal_on_first_attempt() {
        let mut h = harness(vec![code(500), code(201)]);
        let err = h.upload().unwrap_err();

        assert_eq!(err.kind(), "UploadFailed");
        assert_eq!(h.log.lock().unwrap().sends, 1);
        assert!(h.sleeps.lock().unwrap().is_empty());
        assert_eq!(h.log.lock().unwrap().closes, 1);
    }

    #[test]
    fn timeouts_are_retried_and_connection_errors_are_not() {
        let mut h = harness(vec![
            Err(TransportError::Timeout("120s".into())),
            Err(TransportError::Connection("dns lookup failed".into())),
            code(201),
        ]);
        let err = h.upload().unwrap_err();

        assert!(err.to_string().contains("dns lookup failed"));
        assert_eq!(h.log.lock().unwrap().sends, 2);
        assert_eq!(*h.sleeps.lock().unwrap(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn missing_video_makes_no_request() {
        let mut h = harness(vec![code(201)]);
        let missing = h.image.with_file_name("nope.mp4");
        let image = h.image.clone();
        let err = h
            .uploader
            .upload(&missing, &image, &metadata(), &CycleLog::starting_now()).unwrap_err();

        assert_eq!(err.kind(), "MissingEvidence");
        let log = h.log.lock().unwrap();
        assert_eq!(log.sends, 0);
        assert_eq!(log.closes, 0);
    }

    #[test]
    fn parts_carry_inferred_content_types() {
        let mut h = harness(vec![code(201)]);
        h.upload().unwrap();
        let log = h.log.lock().unwrap();
        assert_eq!(
            log.content_types[0],
            ("image/jpeg".to_string(), "video/mp4".to_string())
        );
    }
}
