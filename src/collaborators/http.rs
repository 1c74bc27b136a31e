//! HTTP-backed collaborator clients.
//!
//! Each client is a thin reqwest wrapper with a bounded request timeout.
//! A client constructed without a base URL is a permanent
//! `NotConfigured` responder, which the ingestion pipeline treats the
//! same as an outage.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::{CollaboratorError, Labeler, Transcriber, VideoStorage};

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn check_status(response: &reqwest::Response) -> Result<(), CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(CollaboratorError::UpstreamStatus {
            status: status.as_u16(),
        })
    }
}

/// Speech-to-text client. Posts the raw video to `{base}/transcribe`
/// and expects `{"transcript": "..."}` back.
pub struct HttpTranscriber {
    base_url: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    transcript: String,
}

impl HttpTranscriber {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, video: &[u8]) -> Result<String, CollaboratorError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/transcribe", base.trim_end_matches('/')))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(video.to_vec())
            .send()
            .await?;
        check_status(&response)?;

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        Ok(body.transcript)
    }
}

/// Label extraction client. Posts `{"transcript": "..."}` to
/// `{base}/label` and expects `{"labels": "a,b,c"}` back.
pub struct HttpLabeler {
    base_url: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct LabelResponse {
    labels: String,
}

impl HttpLabeler {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl Labeler for HttpLabeler {
    async fn label(&self, transcript: &str) -> Result<Vec<String>, CollaboratorError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/label", base.trim_end_matches('/')))
            .json(&serde_json::json!({ "transcript": transcript }))
            .send()
            .await?;
        check_status(&response)?;

        let body: LabelResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        Ok(super::parse_labels(&body.labels))
    }
}

/// Video storage client. Uploads the video to
/// `{base}/videos/{report_id}` and expects `{"url": "..."}` back.
pub struct HttpVideoStorage {
    base_url: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct StoreResponse {
    url: String,
}

impl HttpVideoStorage {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl VideoStorage for HttpVideoStorage {
    async fn store(&self, report_id: Uuid, video: Vec<u8>) -> Result<String, CollaboratorError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured)?;

        let response = self
            .client
            .put(format!(
                "{}/videos/{}",
                base.trim_end_matches('/'),
                report_id
            ))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(video)
            .send()
            .await?;
        check_status(&response)?;

        let body: StoreResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        Ok(body.url)
    }
}
