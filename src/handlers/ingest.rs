//! # Feedback Ingestion Handler
//!
//! The public intake endpoint embedded widgets post to. Authenticates
//! with the tenant API key, runs the collaborator pipeline
//! (transcription, labeling, video storage), and persists the report.
//! Collaborator failures degrade the report instead of rejecting it.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use metrics::counter;
use serde::Serialize;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, invalid_tenant_key, validation_error};
use crate::repositories::{CreateReportData, ReportRepository, TenantRepository};
use crate::server::AppState;

/// Successful ingestion acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    /// The created report's ID
    pub id: Uuid,
}

/// Raw multipart payload after field extraction
#[derive(Default)]
struct FeedbackForm {
    tenant_key: Option<String>,
    video: Option<Vec<u8>>,
    dom: Option<String>,
    metadata: Option<String>,
    description: Option<String>,
    struggle_score: Option<String>,
}

fn missing_field(field: &str) -> ApiError {
    validation_error(
        "Required field is missing",
        serde_json::json!({ "field": field }),
    )
}

async fn read_form(mut multipart: Multipart) -> Result<FeedbackForm, ApiError> {
    let mut form = FeedbackForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        validation_error(
            "Malformed multipart payload",
            serde_json::json!({ "detail": e.to_string() }),
        )
    })? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "video" => {
                let bytes = field.bytes().await.map_err(|e| {
                    validation_error(
                        "Failed to read video field",
                        serde_json::json!({ "detail": e.to_string() }),
                    )
                })?;
                form.video = Some(bytes.to_vec());
            }
            "dom" => form.dom = Some(read_text(field, "dom").await?),
            "metadata" => form.metadata = Some(read_text(field, "metadata").await?),
            "tenantId" => form.tenant_key = Some(read_text(field, "tenantId").await?),
            "description" => form.description = Some(read_text(field, "description").await?),
            "struggleScore" => {
                form.struggle_score = Some(read_text(field, "struggleScore").await?)
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ApiError> {
    field.text().await.map_err(|e| {
        validation_error(
            "Failed to read form field",
            serde_json::json!({ "field": name, "detail": e.to_string() }),
        )
    })
}

fn parse_struggle_score(raw: Option<&str>) -> Result<Option<f64>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let score: f64 = raw.trim().parse().map_err(|_| {
        validation_error(
            "struggleScore must be a number",
            serde_json::json!({ "field": "struggleScore" }),
        )
    })?;
    if !(0.0..=10.0).contains(&score) {
        return Err(validation_error(
            "struggleScore must be between 0 and 10",
            serde_json::json!({ "field": "struggleScore" }),
        ));
    }
    Ok(Some(score))
}

/// Ingest a feedback submission
///
/// Accepts `multipart/form-data` with `video`, `dom`, `metadata`, and
/// `tenantId` (the tenant's API key), plus optional `description` and
/// `struggleScore`. Always responds 201 when the key is valid and the
/// payload is complete, even if every collaborator is down.
#[utoipa::path(
    post,
    path = "/feedback",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report created", body = IngestResponse),
        (status = 400, description = "Incomplete or malformed payload", body = ApiError),
        (status = 401, description = "Unknown or inactive tenant key", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn ingest_feedback(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let form = read_form(multipart).await?;

    let tenant_key = form.tenant_key.ok_or_else(|| missing_field("tenantId"))?;
    let video = form.video.ok_or_else(|| missing_field("video"))?;
    let dom = form.dom.ok_or_else(|| missing_field("dom"))?;
    let metadata_raw = form.metadata.ok_or_else(|| missing_field("metadata"))?;

    if serde_json::from_str::<serde_json::Value>(&metadata_raw).is_err() {
        return Err(validation_error(
            "metadata must be valid JSON",
            serde_json::json!({ "field": "metadata" }),
        ));
    }
    let struggle_score = parse_struggle_score(form.struggle_score.as_deref())?;

    let tenant = TenantRepository::new(&state.db)
        .find_active_by_api_key(&tenant_key)
        .await?
        .ok_or_else(invalid_tenant_key)?;
    // Recheck in constant time; the indexed lookup already matched but
    // the comparison that gates ingestion must not be timing-dependent.
    let key_matches: bool = tenant.api_key.as_bytes().ct_eq(tenant_key.as_bytes()).into();
    if !key_matches {
        return Err(invalid_tenant_key());
    }

    let transcript = match state.collaborators.transcriber.transcribe(&video).await {
        Ok(transcript) => Some(transcript),
        Err(e) => {
            counter!("ingest_collaborator_failures_total", "collaborator" => "transcriber")
                .increment(1);
            tracing::warn!(tenant_id = %tenant.id, error = %e, "Transcription unavailable, ingesting without transcript");
            None
        }
    };

    // Labels come from the transcript only; a caller-supplied
    // description is stored verbatim and never labeled, so a failed
    // transcription yields an unlabeled report.
    let label = match transcript.as_deref() {
        Some(transcript) => match state.collaborators.labeler.label(transcript).await {
            Ok(labels) => labels,
            Err(e) => {
                counter!("ingest_collaborator_failures_total", "collaborator" => "labeler")
                    .increment(1);
                tracing::warn!(tenant_id = %tenant.id, error = %e, "Labeling unavailable, ingesting without labels");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    // The submitter's own description wins; the transcript fills in
    // when the widget sent none.
    let description = form.description.filter(|d| !d.trim().is_empty()).or(transcript);

    let repo = ReportRepository::new(&state.db);
    let report = repo
        .create(CreateReportData {
            tenant_id: tenant.id,
            description,
            label,
            struggle_score,
            metadata_json: metadata_raw,
            dom_snapshot: dom,
            video_url: None,
        })
        .await?;

    let report = match state
        .collaborators
        .video_storage
        .store(report.id, video)
        .await
    {
        Ok(url) => repo.set_video_url(report, url).await?,
        Err(e) => {
            counter!("ingest_collaborator_failures_total", "collaborator" => "video_storage")
                .increment(1);
            tracing::warn!(report_id = %report.id, error = %e, "Video storage unavailable, report has no video");
            report
        }
    };

    counter!("ingest_reports_total").increment(1);
    tracing::info!(report_id = %report.id, tenant_id = %tenant.id, "Feedback ingested");
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "success",
            id: report.id,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struggle_score_parses_and_bounds() {
        assert_eq!(parse_struggle_score(None).unwrap(), None);
        assert_eq!(parse_struggle_score(Some("7.5")).unwrap(), Some(7.5));
        assert_eq!(parse_struggle_score(Some(" 0 ")).unwrap(), Some(0.0));
        assert!(parse_struggle_score(Some("11")).is_err());
        assert!(parse_struggle_score(Some("-1")).is_err());
        assert!(parse_struggle_score(Some("high")).is_err());
    }
}
