//! # Integrations API Handlers
//!
//! Ticketing integration management (Jira, ClickUp, Linear). Restricted
//! to admin roles; scoped to the caller's tenant unless the caller is
//! SUPER_ADMIN.

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
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::{deny_to_error, list_scope};
use crate::models::integration::{self, IntegrationType};
use crate::models::user::Role;
use crate::repositories::{
    CreateIntegrationData, IntegrationRepository, UpdateIntegrationData,
};
use crate::server::AppState;

/// Integration projection returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntegrationDto {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub integration_type: IntegrationType,
    pub config_json: serde_json::Value,
    pub enabled: bool,
    pub created_at: String,
}

impl From<integration::Model> for IntegrationDto {
    fn from(model: integration::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            integration_type: model.integration_type,
            config_json: model.config_json,
            enabled: model.enabled,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for registering an integration
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntegrationRequest {
    pub integration_type: IntegrationType,
    pub config_json: serde_json::Value,
    #[serde(default)]
    pub enabled: bool,
    /// SUPER_ADMIN may target any tenant; tenant admins may only name
    /// their own
    pub tenant_id: Option<Uuid>,
}

/// Request payload for updating an integration; omitted fields are unchanged
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIntegrationRequest {
    pub config_json: Option<serde_json::Value>,
    pub enabled: Option<bool>,
}

/// Configuration keys each provider requires before it can sync
fn required_config_keys(integration_type: IntegrationType) -> &'static [&'static str] {
    match integration_type {
        IntegrationType::Jira => &["url", "email", "api_token", "project_key"],
        IntegrationType::Clickup => &["api_token", "list_id"],
        IntegrationType::Linear => &["api_key", "team_id"],
    }
}

fn validate_config(
    integration_type: IntegrationType,
    config: &serde_json::Value,
) -> Result<(), ApiError> {
    let missing: Vec<&str> = required_config_keys(integration_type)
        .iter()
        .filter(|key| config.get(**key).and_then(|v| v.as_str()).is_none_or(str::is_empty))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(validation_error(
            "Integration configuration is incomplete",
            serde_json::json!({ "missing_keys": missing }),
        ));
    }
    Ok(())
}

/// List integrations visible to the caller
#[utoipa::path(
    get,
    path = "/api/integrations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Integrations visible to the caller", body = [IntegrationDto]),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn list_integrations(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<IntegrationDto>>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::List, Resource::Integration))
        .map_err(|d| deny_to_error(d, "Integration"))?;

    let integrations = IntegrationRepository::new(&state.db)
        .list(list_scope(&caller)?)
        .await?;
    Ok(Json(
        integrations.into_iter().map(IntegrationDto::from).collect(),
    ))
}

/// Register an integration
#[utoipa::path(
    post,
    path = "/api/integrations",
    security(("bearer_auth" = [])),
    request_body = CreateIntegrationRequest,
    responses(
        (status = 201, description = "Integration registered", body = IntegrationDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn create_integration(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateIntegrationRequest>,
) -> Result<(StatusCode, Json<IntegrationDto>), ApiError> {
    let caller = current.caller();

    let tenant_id = match caller.role {
        Role::SuperAdmin => request.tenant_id,
        _ => {
            if request.tenant_id.is_some() && request.tenant_id != caller.tenant_id {
                return Err(forbidden(Some(
                    "Can only register integrations in your own tenant",
                )));
            }
            caller.tenant_id
        }
    };
    authorize(
        &caller,
        &Action::new(Op::Create, Resource::Integration).on(tenant_id),
    )
    .map_err(|d| deny_to_error(d, "Integration"))?;

    let tenant_id = tenant_id.ok_or_else(|| {
        validation_error(
            "tenant_id is required",
            serde_json::json!({ "field": "tenant_id" }),
        )
    })?;
    validate_config(request.integration_type, &request.config_json)?;

    let created = IntegrationRepository::new(&state.db)
        .create(CreateIntegrationData {
            tenant_id,
            integration_type: request.integration_type,
            config_json: request.config_json,
            enabled: request.enabled,
        })
        .await?;

    tracing::info!(
        integration_id = %created.id,
        tenant_id = %created.tenant_id,
        integration_type = %created.integration_type.as_str(),
        "Integration registered"
    );
    Ok((StatusCode::CREATED, Json(IntegrationDto::from(created))))
}

/// Update an integration
#[utoipa::path(
    put,
    path = "/api/integrations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Integration ID")),
    request_body = UpdateIntegrationRequest,
    responses(
        (status = 200, description = "Integration updated", body = IntegrationDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn update_integration(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateIntegrationRequest>,
) -> Result<Json<IntegrationDto>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Update, Resource::Integration))
        .map_err(|d| deny_to_error(d, "Integration"))?;

    let repo = IntegrationRepository::new(&state.db);
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Integration"))?;

    authorize(
        &caller,
        &Action::new(Op::Update, Resource::Integration).on(Some(existing.tenant_id)),
    )
    .map_err(|d| deny_to_error(d, "Integration"))?;

    if let Some(config) = request.config_json.as_ref() {
        validate_config(existing.integration_type, config)?;
    }

    let updated = repo
        .update(
            existing,
            UpdateIntegrationData {
                config_json: request.config_json,
                enabled: request.enabled,
            },
        )
        .await?;
    Ok(Json(IntegrationDto::from(updated)))
}

/// Remove an integration
#[utoipa::path(
    delete,
    path = "/api/integrations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 204, description = "Integration removed"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn delete_integration(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Delete, Resource::Integration))
        .map_err(|d| deny_to_error(d, "Integration"))?;

    let repo = IntegrationRepository::new(&state.db);
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Integration"))?;

    authorize(
        &caller,
        &Action::new(Op::Delete, Resource::Integration).on(Some(existing.tenant_id)),
    )
    .map_err(|d| deny_to_error(d, "Integration"))?;

    repo.delete(existing).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate an integration's stored configuration
///
/// Checks the configuration shape without calling the provider; a
/// passing result means the integration is ready to be enabled.
#[utoipa::path(
    post,
    path = "/api/integrations/{id}/test",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Integration ID")),
    responses(
        (status = 200, description = "Configuration is valid"),
        (status = 400, description = "Configuration is incomplete", body = ApiError),
        (status = 404, description = "Integration not found", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn test_integration(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Read, Resource::Integration))
        .map_err(|d| deny_to_error(d, "Integration"))?;

    let existing = IntegrationRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Integration"))?;

    authorize(
        &caller,
        &Action::new(Op::Read, Resource::Integration).on(Some(existing.tenant_id)),
    )
    .map_err(|d| deny_to_error(d, "Integration"))?;

    validate_config(existing.integration_type, &existing.config_json)?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "integration_type": existing.integration_type.as_str(),
    })))
}
