//! # Reports API Handlers
//!
//! Triage surface over ingested bug reports: paginated listing with
//! filters, dashboard statistics, status transitions, content edits,
//! and video retrieval.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Redirect},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::authz::{Action, Op, Resource, authorize};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::{deny_to_error, list_scope};
use crate::models::bug_report::{self, ReportStatus};
use crate::repositories::{DashboardStats, ReportFilter, ReportRepository};
use crate::server::AppState;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

/// Bug report projection returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportDto {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub description: Option<String>,
    pub label: Vec<String>,
    pub struggle_score: Option<f64>,
    pub metadata_json: serde_json::Value,
    pub dom_snapshot: String,
    pub status: ReportStatus,
    pub synced_to_integration: bool,
    pub external_ticket_id: Option<String>,
    pub video_url: Option<String>,
    pub created_at: String,
}

impl From<bug_report::Model> for ReportDto {
    fn from(model: bug_report::Model) -> Self {
        let label = model.labels();
        // Stored as validated text; tolerate legacy rows that predate
        // validation instead of failing the read.
        let metadata_json =
            serde_json::from_str(&model.metadata_json).unwrap_or(serde_json::Value::Null);
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            description: model.description,
            label,
            struggle_score: model.struggle_score,
            metadata_json,
            dom_snapshot: model.dom_snapshot,
            status: model.status,
            synced_to_integration: model.synced_to_integration,
            external_ticket_id: model.external_ticket_id,
            video_url: model.video_url,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// One page of reports
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportPageDto {
    pub reports: Vec<ReportDto>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Listing query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListReportsQuery {
    /// 1-based page number, defaults to 1
    pub page: Option<u64>,
    /// Page size between 1 and 100, defaults to 10
    pub page_size: Option<u64>,
    pub status: Option<ReportStatus>,
    /// Narrow to one tenant; honored for SUPER_ADMIN callers only
    pub tenant_id: Option<Uuid>,
    /// Substring match against description and metadata text
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Triage update payload; omitted fields are unchanged
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: Option<ReportStatus>,
    pub synced_to_integration: Option<bool>,
    /// Omitted keeps the current ticket reference; an explicit `null`
    /// clears it.
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    #[schema(value_type = Option<String>)]
    pub external_ticket_id: Option<Option<String>>,
}

/// Distinguishes an absent field (outer `None`) from `"field": null`
/// (inner `None`) so callers can clear a nullable column.
fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Content correction payload; omitted fields are unchanged
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDetailsRequest {
    pub description: Option<String>,
    pub label: Option<Vec<String>>,
}

fn validate_pagination(page: u64, page_size: u64) -> Result<(), ApiError> {
    if page < 1 {
        return Err(validation_error(
            "page must be at least 1",
            serde_json::json!({ "field": "page" }),
        ));
    }
    if page_size < 1 || page_size > MAX_PAGE_SIZE {
        return Err(validation_error(
            "page_size must be between 1 and 100",
            serde_json::json!({ "field": "page_size", "max": MAX_PAGE_SIZE }),
        ));
    }
    Ok(())
}

/// Authorize report access after the row is loaded. Cross-tenant rows
/// surface as 404.
fn authorize_on_report(
    current: &CurrentUser,
    op: Op,
    report: &bug_report::Model,
) -> Result<(), ApiError> {
    authorize(
        &current.caller(),
        &Action::new(op, Resource::Report).on(Some(report.tenant_id)),
    )
    .map_err(|d| deny_to_error(d, "Report"))
}

/// List reports visible to the caller, newest first
#[utoipa::path(
    get,
    path = "/api/reports",
    security(("bearer_auth" = [])),
    params(ListReportsQuery),
    responses(
        (status = 200, description = "One page of reports", body = ReportPageDto),
        (status = 400, description = "Invalid pagination or filters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ReportPageDto>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::List, Resource::Report))
        .map_err(|d| deny_to_error(d, "Report"))?;

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    validate_pagination(page, page_size)?;

    // Tenant-bound callers are pinned to their own tenant; only a
    // SUPER_ADMIN may narrow to an arbitrary one.
    let tenant_scope = match list_scope(&caller)? {
        Some(own_tenant) => Some(own_tenant),
        None => query.tenant_id,
    };

    let filter = ReportFilter {
        tenant_id: tenant_scope,
        status: query.status,
        search: query.search,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let result = ReportRepository::new(&state.db)
        .list(filter, page, page_size)
        .await?;
    Ok(Json(ReportPageDto {
        reports: result.reports.into_iter().map(ReportDto::from).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

/// Dashboard statistics for the caller's scope
#[utoipa::path(
    get,
    path = "/api/reports/stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn report_stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Read, Resource::Report))
        .map_err(|d| deny_to_error(d, "Report"))?;

    let stats = ReportRepository::new(&state.db)
        .stats(list_scope(&caller)?)
        .await?;
    Ok(Json(stats))
}

/// Fetch a single report
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report found", body = ReportDto),
        (status = 404, description = "Report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDto>, ApiError> {
    let report = ReportRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Report"))?;
    authorize_on_report(&current, Op::Read, &report)?;

    Ok(Json(ReportDto::from(report)))
}

/// Apply a triage update to a report
#[utoipa::path(
    put,
    path = "/api/reports/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportDto),
        (status = 404, description = "Report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn update_report_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ReportDto>, ApiError> {
    let repo = ReportRepository::new(&state.db);
    let report = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Report"))?;
    authorize_on_report(&current, Op::Update, &report)?;

    let updated = repo
        .update_status(
            report,
            request.status,
            request.synced_to_integration,
            request.external_ticket_id,
        )
        .await?;

    tracing::info!(report_id = %id, status = ?updated.status, "Report triage updated");
    Ok(Json(ReportDto::from(updated)))
}

/// Correct a report's description or labels
#[utoipa::path(
    put,
    path = "/api/reports/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateDetailsRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportDto),
        (status = 404, description = "Report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn update_report_details(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<ReportDto>, ApiError> {
    let repo = ReportRepository::new(&state.db);
    let report = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Report"))?;
    authorize_on_report(&current, Op::Update, &report)?;

    let updated = repo
        .update_details(report, request.description, request.label)
        .await?;
    Ok(Json(ReportDto::from(updated)))
}

/// Delete a report
#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 404, description = "Report not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn delete_report(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = ReportRepository::new(&state.db);
    let report = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Report"))?;
    authorize_on_report(&current, Op::Delete, &report)?;

    repo.delete(report).await?;
    tracing::info!(report_id = %id, "Report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Redirect to the stored session video
#[utoipa::path(
    get,
    path = "/api/reports/{id}/video",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 307, description = "Redirect to the video URL"),
        (status = 404, description = "Report or video not found", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn get_report_video(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let report = ReportRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Report"))?;
    authorize_on_report(&current, Op::Read, &report)?;

    let video_url = report.video_url.ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "No video is stored for this report",
        )
    })?;
    Ok(Redirect::temporary(&video_url))
}
