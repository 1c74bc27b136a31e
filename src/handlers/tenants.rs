//! # Tenants API Handlers
//!
//! Tenant lifecycle management. Every endpoint here is restricted to
//! SUPER_ADMIN; tenant-bound roles receive 403 without any lookup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::authz::{Action, Op, Resource, authorize};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::deny_to_error;
use crate::models::tenant;
use crate::repositories::{CreateTenantData, TenantRepository, UpdateTenantData};
use crate::server::AppState;

/// Full tenant projection, including the ingestion API key.
///
/// Only SUPER_ADMIN can reach these endpoints, so exposing the key
/// here is the intended distribution channel.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantDto {
    pub id: Uuid,
    pub name: String,
    pub company_name: Option<String>,
    pub api_key: String,
    pub is_active: bool,
    pub created_at: String,
}

impl From<tenant::Model> for TenantDto {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            company_name: model.company_name,
            api_key: model.api_key,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for creating a tenant
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTenantRequest {
    #[schema(example = "Acme Corp")]
    pub name: String,
    pub company_name: Option<String>,
}

/// Request payload for updating a tenant; omitted fields are unchanged
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub is_active: Option<bool>,
}

fn require_tenant_admin(current: &CurrentUser, op: Op) -> Result<(), ApiError> {
    authorize(&current.caller(), &Action::new(op, Resource::Tenant))
        .map_err(|d| deny_to_error(d, "Tenant"))
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(validation_error(
            "Tenant name is required and cannot be empty",
            serde_json::json!({ "field": "name" }),
        ));
    }
    if name.len() > 255 {
        return Err(validation_error(
            "Tenant name exceeds maximum length",
            serde_json::json!({ "field": "name", "max_length": 255 }),
        ));
    }
    Ok(())
}

/// List all tenants
#[utoipa::path(
    get,
    path = "/api/tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All tenants", body = [TenantDto]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<TenantDto>>, ApiError> {
    require_tenant_admin(&current, Op::List)?;

    let tenants = TenantRepository::new(&state.db).list().await?;
    Ok(Json(tenants.into_iter().map(TenantDto::from).collect()))
}

/// Create a tenant with a freshly generated API key
#[utoipa::path(
    post,
    path = "/api/tenants",
    security(("bearer_auth" = [])),
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant created", body = TenantDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantDto>), ApiError> {
    require_tenant_admin(&current, Op::Create)?;
    validate_name(&request.name)?;

    let created = TenantRepository::new(&state.db)
        .create(CreateTenantData {
            name: request.name.trim().to_string(),
            company_name: request.company_name,
        })
        .await?;

    tracing::info!(tenant_id = %created.id, name = %created.name, "Tenant created");
    Ok((StatusCode::CREATED, Json(TenantDto::from(created))))
}

/// Fetch a single tenant
#[utoipa::path(
    get,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant found", body = TenantDto),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantDto>, ApiError> {
    require_tenant_admin(&current, Op::Read)?;

    let tenant = TenantRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Tenant"))?;
    Ok(Json(TenantDto::from(tenant)))
}

/// Update a tenant
#[utoipa::path(
    put,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Tenant updated", body = TenantDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTenantRequest>,
) -> Result<Json<TenantDto>, ApiError> {
    require_tenant_admin(&current, Op::Update)?;
    if let Some(name) = request.name.as_deref() {
        validate_name(name)?;
    }

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Tenant"))?;

    let updated = repo
        .update(
            tenant,
            UpdateTenantData {
                name: request.name.map(|n| n.trim().to_string()),
                company_name: request.company_name,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(TenantDto::from(updated)))
}

/// Deactivate a tenant (soft delete)
///
/// Ingestion with the tenant's API key stops immediately; stored
/// reports remain queryable for platform operators.
#[utoipa::path(
    delete,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 204, description = "Tenant deactivated"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn delete_tenant(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_tenant_admin(&current, Op::Delete)?;

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Tenant"))?;

    repo.deactivate(tenant).await?;
    tracing::info!(tenant_id = %id, "Tenant deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Rotate a tenant's ingestion API key
///
/// The previous key is invalid as soon as this returns.
#[utoipa::path(
    post,
    path = "/api/tenants/{id}/regenerate-key",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Key rotated", body = TenantDto),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn regenerate_key(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantDto>, ApiError> {
    require_tenant_admin(&current, Op::Update)?;

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Tenant"))?;

    let rotated = repo.regenerate_api_key(tenant).await?;
    tracing::info!(tenant_id = %id, "Tenant API key rotated");
    Ok(Json(TenantDto::from(rotated)))
}
