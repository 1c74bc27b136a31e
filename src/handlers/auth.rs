//! # Auth API Handlers
//!
//! Login, session introspection, and logout. Tokens are stateless, so
//! logout is a client-side discard acknowledged by the server.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{CurrentUser, password, token};
use crate::error::{ApiError, invalid_credentials};
use crate::handlers::users::UserDto;
use crate::repositories::UserRepository;
use crate::server::AppState;

/// Login request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane@acme.example")]
    pub email: String,
    pub password: String,
}

/// Successful login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: &'static str,
    pub user: UserDto,
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();

    let user = UserRepository::new(&state.db)
        .find_by_email(&email)
        .await?;

    // A single failure path for missing, inactive, and wrong-password
    // so responses do not leak which accounts exist.
    let user = match user {
        Some(user) if user.is_active => user,
        _ => {
            tracing::debug!(%email, "Login rejected: unknown or inactive account");
            return Err(invalid_credentials());
        }
    };

    let verified = password::verify_password(&request.password, &user.password_hash)
        .map_err(|e| anyhow::anyhow!("credential verification failed: {e}"))?;
    if !verified {
        tracing::debug!(user_id = %user.id, "Login rejected: bad password");
        return Err(invalid_credentials());
    }

    let token = token::issue(user.id, &state.config)
        .map_err(|e| anyhow::anyhow!("token issuance failed: {e}"))?;

    tracing::info!(user_id = %user.id, role = ?user.role, "Login succeeded");
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer",
        user: UserDto::from(user),
    }))
}

/// Return the authenticated caller's own record
#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(current: CurrentUser) -> Json<UserDto> {
    Json(UserDto::from(current.0))
}

/// Acknowledge logout; token invalidation happens client-side
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out")
    ),
    tag = "auth"
)]
pub async fn logout(current: CurrentUser) -> Json<serde_json::Value> {
    tracing::debug!(user_id = %current.0.id, "Logout");
    Json(serde_json::json!({ "status": "success" }))
}
