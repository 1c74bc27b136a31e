//! Shared fixtures for integration tests: an in-memory SQLite database
//! with migrations applied, stub collaborators, and helpers for seeding
//! tenants and users and exercising the router.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use bugtriage::auth::password;
use bugtriage::collaborators::{
    CollaboratorError, Collaborators, Labeler, Transcriber, VideoStorage,
};
use bugtriage::config::AppConfig;
use bugtriage::models::user::Role;
use bugtriage::repositories::{CreateTenantData, CreateUserData, TenantRepository, UserRepository};
use bugtriage::server::{AppState, create_app};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Transcriber stub: `Some` returns that transcript, `None` fails
pub struct StubTranscriber(pub Option<String>);

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _video: &[u8]) -> Result<String, CollaboratorError> {
        self.0.clone().ok_or(CollaboratorError::NotConfigured)
    }
}

/// Labeler stub: `Some` returns those labels, `None` fails
pub struct StubLabeler(pub Option<Vec<String>>);

#[async_trait]
impl Labeler for StubLabeler {
    async fn label(&self, _transcript: &str) -> Result<Vec<String>, CollaboratorError> {
        self.0.clone().ok_or(CollaboratorError::NotConfigured)
    }
}

/// Video storage stub: `Some` returns a URL built from the prefix,
/// `None` fails
pub struct StubVideoStorage(pub Option<String>);

#[async_trait]
impl VideoStorage for StubVideoStorage {
    async fn store(&self, report_id: Uuid, _video: Vec<u8>) -> Result<String, CollaboratorError> {
        match &self.0 {
            Some(prefix) => Ok(format!("{prefix}/{report_id}.webm")),
            None => Err(CollaboratorError::NotConfigured),
        }
    }
}

/// Collaborator set where everything succeeds
pub fn healthy_collaborators(transcript: &str, labels: Vec<&str>) -> Collaborators {
    Collaborators {
        transcriber: Arc::new(StubTranscriber(Some(transcript.to_string()))),
        labeler: Arc::new(StubLabeler(Some(
            labels.into_iter().map(str::to_owned).collect(),
        ))),
        video_storage: Arc::new(StubVideoStorage(Some(
            "https://videos.test.example".to_string(),
        ))),
    }
}

/// Collaborator set where every call fails
pub fn broken_collaborators() -> Collaborators {
    Collaborators {
        transcriber: Arc::new(StubTranscriber(None)),
        labeler: Arc::new(StubLabeler(None)),
        video_storage: Arc::new(StubVideoStorage(None)),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: "integration-test-secret".to_string(),
        log_format: "pretty".to_string(),
        ..AppConfig::default()
    }
}

pub async fn build_app(collaborators: Collaborators) -> Result<(Router, DatabaseConnection)> {
    let db = setup_test_db().await?;
    let state = AppState {
        config: Arc::new(test_config()),
        db: db.clone(),
        collaborators,
    };
    Ok((create_app(state), db))
}

pub async fn seed_tenant(
    db: &DatabaseConnection,
    name: &str,
) -> Result<bugtriage::models::tenant::Model> {
    let tenant = TenantRepository::new(db)
        .create(CreateTenantData {
            name: name.to_string(),
            company_name: None,
        })
        .await?;
    Ok(tenant)
}

pub async fn seed_user(
    db: &DatabaseConnection,
    email: &str,
    plain_password: &str,
    role: Role,
    tenant_id: Option<Uuid>,
) -> Result<bugtriage::models::user::Model> {
    let user = UserRepository::new(db)
        .create(CreateUserData {
            email: email.to_string(),
            password_hash: password::hash_password(plain_password)?,
            role,
            tenant_id,
        })
        .await?;
    Ok(user)
}

/// Log in through the API and return the bearer token
pub async fn login(app: &Router, email: &str, plain_password: &str) -> Result<String> {
    let body = serde_json::json!({ "email": email, "password": plain_password });
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    anyhow::ensure!(
        response.status().is_success(),
        "login failed with {}",
        response.status()
    );
    let json = body_json(response).await?;
    Ok(json["access_token"].as_str().unwrap().to_string())
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Send an authenticated JSON request through the router
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<Response<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(request).await?)
}

const MULTIPART_BOUNDARY: &str = "test-boundary-7f3a";

/// Build a `multipart/form-data` feedback submission. `video` is raw
/// bytes; the rest are text fields, skipped when `None`.
pub fn feedback_request(
    tenant_key: Option<&str>,
    video: Option<&[u8]>,
    dom: Option<&str>,
    metadata: Option<&str>,
    description: Option<&str>,
    struggle_score: Option<&str>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    let mut text_part = |name: &str, value: Option<&str>| {
        if let Some(value) = value {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
    };
    text_part("tenantId", tenant_key);
    text_part("dom", dom);
    text_part("metadata", metadata);
    text_part("description", description);
    text_part("struggleScore", struggle_score);
    if let Some(video) = video {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"session.webm\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(video);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::post("/feedback")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
