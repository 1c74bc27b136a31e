//! # Collaborator Services
//!
//! Interfaces to the external services the ingestion pipeline leans on:
//! speech-to-text transcription, label extraction, and video storage.
//! Every collaborator is optional at runtime; ingestion degrades instead
//! of failing when one is missing or unhealthy.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

pub use http::{HttpLabeler, HttpTranscriber, HttpVideoStorage};

/// Collaborator-specific error, kept coarse on purpose: callers only
/// decide between "use the result" and "degrade".
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator is not configured")]
    NotConfigured,
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },
    #[error("request failed: {0}")]
    Request(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        CollaboratorError::Request(err.to_string())
    }
}

/// Speech-to-text over the recorded session video
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, video: &[u8]) -> Result<String, CollaboratorError>;
}

/// Extracts triage labels from a transcript
#[async_trait]
pub trait Labeler: Send + Sync {
    async fn label(&self, transcript: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Persists the session video and returns a retrievable URL
#[async_trait]
pub trait VideoStorage: Send + Sync {
    async fn store(
        &self,
        report_id: uuid::Uuid,
        video: Vec<u8>,
    ) -> Result<String, CollaboratorError>;
}

/// The full collaborator set carried in application state. Trait objects
/// so tests can substitute stubs without touching the network.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub labeler: Arc<dyn Labeler>,
    pub video_storage: Arc<dyn VideoStorage>,
}

impl Collaborators {
    /// Build HTTP-backed collaborators from configuration. Unset URLs
    /// yield clients that report `NotConfigured` on every call.
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        let timeout = std::time::Duration::from_millis(config.collaborator_timeout_ms);
        Self {
            transcriber: Arc::new(HttpTranscriber::new(config.transcriber_url.clone(), timeout)),
            labeler: Arc::new(HttpLabeler::new(config.labeler_url.clone(), timeout)),
            video_storage: Arc::new(HttpVideoStorage::new(
                config.video_storage_url.clone(),
                timeout,
            )),
        }
    }
}

/// Split a comma-separated label string into trimmed, non-empty labels.
pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels_splits_and_trims() {
        assert_eq!(
            parse_labels("checkout, payment , ui-freeze"),
            vec!["checkout", "payment", "ui-freeze"]
        );
    }

    #[test]
    fn parse_labels_drops_empty_segments() {
        assert_eq!(parse_labels("a,,b, ,"), vec!["a", "b"]);
        assert!(parse_labels("").is_empty());
        assert!(parse_labels("  ,  ").is_empty());
    }
}
