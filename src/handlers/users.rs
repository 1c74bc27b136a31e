//! # Users API Handlers
//!
//! User management endpoints. Listing and mutation are scoped by the
//! caller's tenant; CLIENT_USER may only read their own record.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, password};
use crate::authz::{Action, Op, Resource, authorize};
use crate::error::{ApiError, duplicate_email, forbidden, not_found, validation_error};
use crate::handlers::{deny_to_error, list_scope};
use crate::models::user::{self, Role};
use crate::repositories::{CreateUserData, UpdateUserData, UserRepository};
use crate::server::AppState;

/// Public projection of a user; never carries the password hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            tenant_id: model.tenant_id,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for creating a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "jane@acme.example")]
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Required for tenant-bound roles; platform operators may omit it
    pub tenant_id: Option<Uuid>,
}

/// Request payload for updating a user; omitted fields are unchanged
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    /// Reassign the user to another tenant; SUPER_ADMIN only
    pub tenant_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The only unique constraint on users is the email column, so a
/// conflict from the database always means a duplicate address.
fn map_user_db_err(error: sea_orm::DbErr) -> ApiError {
    let api: ApiError = error.into();
    if api.status == StatusCode::CONFLICT {
        duplicate_email()
    } else {
        api
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || !email.contains('@') {
        return Err(validation_error(
            "A valid email address is required",
            serde_json::json!({ "field": "email" }),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(validation_error(
            "Password must be at least 8 characters",
            serde_json::json!({ "field": "password" }),
        ));
    }
    Ok(())
}

/// List users visible to the caller
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users visible to the caller", body = [UserDto]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::List, Resource::User))
        .map_err(|d| deny_to_error(d, "User"))?;

    let users = UserRepository::new(&state.db)
        .list(list_scope(&caller)?)
        .await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let caller = current.caller();

    // Tenant admins create users inside their own tenant only.
    let tenant_id = match caller.role {
        Role::SuperAdmin => request.tenant_id,
        _ => {
            if request.tenant_id.is_some() && request.tenant_id != caller.tenant_id {
                return Err(forbidden(Some("Can only create users in your own tenant")));
            }
            caller.tenant_id
        }
    };

    authorize(
        &caller,
        &Action::new(Op::Create, Resource::User).on(tenant_id),
    )
    .map_err(|d| deny_to_error(d, "User"))?;

    // Only a platform operator may mint another platform operator.
    if request.role == Role::SuperAdmin && caller.role != Role::SuperAdmin {
        return Err(forbidden(Some("Cannot grant the SUPER_ADMIN role")));
    }

    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password)?;
    if request.role != Role::SuperAdmin && tenant_id.is_none() {
        return Err(validation_error(
            "tenant_id is required for tenant-bound roles",
            serde_json::json!({ "field": "tenant_id" }),
        ));
    }

    let password_hash = password::hash_password(&request.password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;

    let created = UserRepository::new(&state.db)
        .create(CreateUserData {
            email,
            password_hash,
            role: request.role,
            tenant_id,
        })
        .await
        .map_err(map_user_db_err)?;

    tracing::info!(user_id = %created.id, role = ?created.role, "User created");
    Ok((StatusCode::CREATED, Json(UserDto::from(created))))
}

/// Fetch a single user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let caller = current.caller();

    let user = UserRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("User"))?;

    let action = Action::new(Op::Read, Resource::User)
        .on(user.tenant_id)
        .owned_by(user.id);
    authorize(&caller, &action).map_err(|d| deny_to_error(d, "User"))?;

    Ok(Json(UserDto::from(user)))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Update, Resource::User))
        .map_err(|d| deny_to_error(d, "User"))?;

    let repo = UserRepository::new(&state.db);
    let user = repo.find_by_id(id).await?.ok_or_else(|| not_found("User"))?;

    authorize(
        &caller,
        &Action::new(Op::Update, Resource::User).on(user.tenant_id),
    )
    .map_err(|d| deny_to_error(d, "User"))?;

    if request.role == Some(Role::SuperAdmin) && caller.role != Role::SuperAdmin {
        return Err(forbidden(Some("Cannot grant the SUPER_ADMIN role")));
    }
    if request.tenant_id.is_some() && caller.role != Role::SuperAdmin {
        return Err(forbidden(Some("Cannot move users between tenants")));
    }

    let email = match request.email {
        Some(email) => {
            let email = normalize_email(&email);
            validate_email(&email)?;
            Some(email)
        }
        None => None,
    };
    if let Some(password) = request.password.as_deref() {
        validate_password(password)?;
    }

    let mut updated = repo
        .update(
            user,
            UpdateUserData {
                email,
                role: request.role,
                tenant_id: request.tenant_id.map(Some),
                is_active: request.is_active,
            },
        )
        .await
        .map_err(map_user_db_err)?;

    if let Some(new_password) = request.password {
        let hash = password::hash_password(&new_password)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        updated = repo.set_password_hash(updated, hash).await?;
    }

    Ok(Json(UserDto::from(updated)))
}

/// Deactivate a user (soft delete)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller = current.caller();
    authorize(&caller, &Action::new(Op::Delete, Resource::User))
        .map_err(|d| deny_to_error(d, "User"))?;

    let repo = UserRepository::new(&state.db);
    let user = repo.find_by_id(id).await?.ok_or_else(|| not_found("User"))?;

    authorize(
        &caller,
        &Action::new(Op::Delete, Resource::User).on(user.tenant_id),
    )
    .map_err(|d| deny_to_error(d, "User"))?;

    repo.deactivate(user).await?;
    Ok(StatusCode::NO_CONTENT)
}
