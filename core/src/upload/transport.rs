use crate::upload::{EvidenceFiles, UploadMetadata};
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION};
use reqwest::redirect::Policy;
use std::time::Duration;

pub const MEDIA_FIELD: &str = "media";
pub const VIDEO_FIELD: &str = "video";
pub const SYSTEM_ID_FIELD: &str = "systeme_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Sends one multipart evidence request per call.
pub trait Transport {
    /// The files are positioned at offset 0 when this is called.
    fn send(
        &mut self,
        evidence: &EvidenceFiles,
        metadata: &UploadMetadata,
    ) -> Result<TransportResponse, TransportError>;

    /// Drops the session opened by `send`, if any.
    fn close(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub endpoint: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://server-agriproject.onrender.com/api/detections".into(),
            timeout: Duration::from_secs(120),
            max_redirects: 5,
            user_agent: format!("aviguard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `reqwest` transport. The client is built on first use and discarded by
/// [`Transport::close`], so each upload call gets its own session.
pub struct HttpTransport {
    settings: HttpSettings,
    client: Option<Client>,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    fn client(&mut self) -> Result<Client, TransportError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        let client = Client::builder()
            .user_agent(self.settings.user_agent.clone())
            .default_headers(headers)
            .timeout(self.settings.timeout)
            .redirect(Policy::limited(self.settings.max_redirects))
            .build()
            .map_err(|err| TransportError::Request(format!("building client: {}", err)))?;
        self.client = Some(client.clone());
        Ok(client)
    }
}

fn file_part(part: &crate::upload::EvidencePart) -> Result<Part, TransportError> {
    let reader = part
        .reader()
        .map_err(|err| TransportError::Request(format!("reading {}: {}", part.file_name, err)))?;
    Part::reader_with_length(reader, part.len)
        .file_name(part.file_name.clone())
        .mime_str(&part.content_type)
        .map_err(|err| TransportError::Request(format!("content type {}: {}", part.content_type, err)))
}

impl Transport for HttpTransport {
    fn send(
        &mut self,
        evidence: &EvidenceFiles,
        metadata: &UploadMetadata,
    ) -> Result<TransportResponse, TransportError> {
        let client = self.client()?;
        let form = Form::new()
            .text(SYSTEM_ID_FIELD, metadata.system_id.clone())
            .part(MEDIA_FIELD, file_part(&evidence.media)?)
            .part(VIDEO_FIELD, file_part(&evidence.video)?);

        debug!(
            "POST {} ({} + {} bytes)",
            self.settings.endpoint, evidence.media.len, evidence.video.len
        );
        let response = client
            .post(&self.settings.endpoint)
            .multipart(form)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Ok(TransportResponse { status, body })
    }

    fn close(&mut self) {
        self.client = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_collection_endpoint() {
        let settings = HttpSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert_eq!(settings.max_redirects, 5);
        assert!(settings.endpoint.ends_with("/api/detections"));
    }

    #[test]
    fn close_discards_the_session() {
        let mut transport = HttpTransport::new(HttpSettings::default());
        transport.client().unwrap();
        assert!(transport.client.is_some());
        transport.close();
        assert!(transport.client.is_none());
    }
}
