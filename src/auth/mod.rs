//! # Authentication
//!
//! Bearer-token authentication for protected API endpoints: credential
//! hashing ([`password`]), session tokens ([`token`]), and the axum
//! middleware that resolves a token into the calling [`user::Model`].

pub mod password;
pub mod token;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::authz::Caller;
use crate::error::{ApiError, invalid_token, unauthorized};
use crate::models::user;
use crate::server::AppState;

/// The authenticated user attached to request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    /// Project the user into the authorization engine's caller identity.
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.0.id,
            role: self.0.role,
            tenant_id: self.0.tenant_id,
        }
    }
}

/// Authentication middleware: validates the bearer token and loads the
/// active user it names, attaching it as a [`CurrentUser`] extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = extract_bearer_token(request.headers())?.to_string();

    let claims = token::decode(&bearer, &state.config)
        .map_err(|e| invalid_token(Some(&e.to_string())))?;
    let user_id =
        token::subject_user_id(&claims).map_err(|e| invalid_token(Some(&e.to_string())))?;

    let user = user::Entity::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| invalid_token(Some("User not found or inactive")))?;

    tracing::debug!(user_id = %user.id, role = ?user.role, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction_accepts_well_formed_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_extraction_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn bearer_extraction_rejects_basic_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
