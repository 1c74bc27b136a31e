//! # API Handlers
//!
//! HTTP endpoint handlers for the bug triage API, grouped by resource.

pub mod auth;
pub mod ingest;
pub mod integrations;
pub mod reports;
pub mod tenants;
pub mod users;

use axum::response::Json;

use crate::authz::Deny;
use crate::error::{ApiError, forbidden, not_found};
use crate::models::ServiceInfo;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Map an authorization denial onto the wire.
///
/// Role denials happen before any lookup and surface as 403. Isolation
/// and ownership denials surface as the same 404 a missing `resource`
/// would produce, so a caller cannot probe for records outside their
/// tenant.
pub(crate) fn deny_to_error(deny: Deny, resource: &str) -> ApiError {
    match deny {
        Deny::InsufficientRole => forbidden(None),
        Deny::TenantIsolation | Deny::NotOwner => not_found(resource),
    }
}

/// The tenant scope a caller's list queries run under.
///
/// A tenant-bound caller without a tenant assignment is rejected rather
/// than falling through to the unscoped (all-tenant) query.
pub(crate) fn list_scope(caller: &crate::authz::Caller) -> Result<Option<uuid::Uuid>, ApiError> {
    use crate::models::user::Role;
    match crate::authz::visible_tenant(caller) {
        None if caller.role != Role::SuperAdmin => {
            Err(forbidden(Some("No tenant assigned to this account")))
        }
        scope => Ok(scope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn isolation_denials_look_like_missing_records() {
        let err = deny_to_error(Deny::TenantIsolation, "Report");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(&*err.code, "NOT_FOUND");

        let err = deny_to_error(Deny::NotOwner, "User");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn role_denials_are_forbidden() {
        let err = deny_to_error(Deny::InsufficientRole, "Tenant");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
