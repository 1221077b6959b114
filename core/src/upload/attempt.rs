use crate::upload::{TransportError, TransportResponse};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptStatus {
    Success,
    RetryableFailure,
    FatalFailure,
}

/// One POST attempt, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadAttempt {
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub http_status: Option<u16>,
}

impl UploadAttempt {
    pub fn new(attempt_number: u32, status: AttemptStatus, http_status: Option<u16>) -> Self {
        Self {
            attempt_number,
            status,
            http_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub success_status: u16,
    /// Only these statuses are retried; every other non-success status is fatal.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
            success_status: 201,
            retryable_statuses: vec![502],
        }
    }
}

/// Timeouts are retryable; any other transport error is fatal.
pub fn classify(
    policy: &RetryPolicy,
    result: &Result<TransportResponse, TransportError>,
) -> AttemptStatus {
    match result {
        Ok(response) if response.status == policy.success_status => AttemptStatus::Success,
        Ok(response) if policy.retryable_statuses.contains(&response.status) => {
            AttemptStatus::RetryableFailure
        }
        Ok(_) => AttemptStatus::FatalFailure,
        Err(TransportError::Timeout(_)) => AttemptStatus::RetryableFailure,
        Err(_) => AttemptStatus::FatalFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: code,
            body: String::new(),
        })
    }

    #[test]
    fn created_is_the_only_success() {
        let policy = RetryPolicy::default();
        assert_eq!(classify(&policy, &status(201)), AttemptStatus::Success);
        assert_eq!(classify(&policy, &status(200)), AttemptStatus::FatalFailure);
    }

    #[test]
    fn bad_gateway_and_timeouts_are_retryable() {
        let policy = RetryPolicy::default();
        assert_eq!(classify(&policy, &status(502)), AttemptStatus::RetryableFailure);
        assert_eq!(
            classify(&policy, &Err(TransportError::Timeout("120s".into()))),
            AttemptStatus::RetryableFailure
        );
    }

    #[test]
    fn other_server_errors_and_connection_errors_are_fatal() {
        let policy = RetryPolicy::default();
        for code in [400, 404, 500, 503, 504] {
            assert_eq!(classify(&policy, &status(code)), AttemptStatus::FatalFailure);
        }
        assert_eq!(
            classify(&policy, &Err(TransportError::Connection("dns".into()))),
            AttemptStatus::FatalFailure
        );
    }

    #[test]
    fn retryable_statuses_are_tunable() {
        let policy = RetryPolicy {
            retryable_statuses: vec![502, 503],
            ..RetryPolicy::default()
        };
        assert_eq!(classify(&policy, &status(503)), AttemptStatus::RetryableFailure);
    }
}
