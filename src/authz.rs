//! # Authorization Engine
//!
//! Central decision procedure invoked before every repository operation
//! that touches tenant-scoped state. The engine is a pure function over the
//! caller's identity and a description of the attempted action; it performs
//! no I/O and holds no state, which keeps the tenant-isolation rules in one
//! place instead of scattered across endpoints.
//!
//! One rule is deliberately left to the call sites: granting SUPER_ADMIN.
//! Whether an update is a role *elevation* depends on request payloads the
//! engine never sees, so the user create/update handlers enforce it.

use thiserror::Error;
use uuid::Uuid;

use crate::models::user::Role;

/// The authenticated identity on whose behalf an action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    /// `None` only for SUPER_ADMIN accounts.
    pub tenant_id: Option<Uuid>,
}

/// Kinds of resource the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Tenant,
    User,
    Integration,
    Report,
}

/// Operation classes the decision table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    List,
    Create,
    Update,
    Delete,
}

/// The concrete target of an action, once one is known.
///
/// `tenant_id` is the owning tenant; `None` for tenant-less records
/// (SUPER_ADMIN users), which never match a tenant-bound caller.
/// `owner_id` is set for User targets and drives the self-read rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub tenant_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

/// A described action, optionally against a concrete target.
///
/// List operations carry no target; create operations carry the tenant the
/// new row is requested for; read/update/delete carry the fetched row's
/// tenant and (for users) owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub op: Op,
    pub resource: Resource,
    pub target: Option<Target>,
}

impl Action {
    pub fn new(op: Op, resource: Resource) -> Self {
        Self {
            op,
            resource,
            target: None,
        }
    }

    /// Attach the target's owning tenant.
    pub fn on(mut self, tenant_id: Option<Uuid>) -> Self {
        let target = self.target.get_or_insert(Target {
            tenant_id: None,
            owner_id: None,
        });
        target.tenant_id = tenant_id;
        self
    }

    /// Attach the target's owning user (User targets only).
    pub fn owned_by(mut self, owner_id: Uuid) -> Self {
        let target = self.target.get_or_insert(Target {
            tenant_id: None,
            owner_id: None,
        });
        target.owner_id = Some(owner_id);
        self
    }
}

/// Reasons an action is refused.
///
/// The HTTP layer maps `TenantIsolation` and `NotOwner` to the same 404
/// shape as a missing resource so denials never reveal foreign-tenant
/// existence; `InsufficientRole` is decided before any fetch and maps
/// to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Deny {
    #[error("insufficient role")]
    InsufficientRole,
    #[error("tenant isolation")]
    TenantIsolation,
    #[error("not the record owner")]
    NotOwner,
}

/// Decide whether `caller` may perform `action`.
///
/// Rules are evaluated in order, first match wins:
/// 1. SUPER_ADMIN: unrestricted.
/// 2. Tenant management, or an elevated operation by CLIENT_USER: denied.
/// 3. Target in a different tenant than the caller (null counts as
///    different): denied.
/// 4. CLIENT_USER reading a User record: allowed only for their own.
/// 5. Otherwise: allowed.
pub fn authorize(caller: &Caller, action: &Action) -> Result<(), Deny> {
    if caller.role == Role::SuperAdmin {
        return Ok(());
    }

    if action.resource == Resource::Tenant {
        return Err(Deny::InsufficientRole);
    }

    if caller.role == Role::ClientUser && requires_elevation(action) {
        return Err(Deny::InsufficientRole);
    }

    if let Some(target) = action.target {
        if target.tenant_id != caller.tenant_id {
            return Err(Deny::TenantIsolation);
        }
    }

    if caller.role == Role::ClientUser
        && action.resource == Resource::User
        && action.op == Op::Read
    {
        let owner = action.target.and_then(|t| t.owner_id);
        return match owner {
            Some(owner) if owner == caller.user_id => Ok(()),
            _ => Err(Deny::NotOwner),
        };
    }

    Ok(())
}

/// Whether an action needs CLIENT_ADMIN or better.
///
/// Report read/write stays open to CLIENT_USER within their own tenant;
/// everything touching users or integrations is management surface, except
/// a user self-read.
fn requires_elevation(action: &Action) -> bool {
    match action.resource {
        Resource::Tenant => true,
        Resource::Integration => true,
        Resource::User => action.op != Op::Read,
        Resource::Report => false,
    }
}

/// The tenant scope visible to a caller: `None` means all tenants.
pub fn visible_tenant(caller: &Caller) -> Option<Uuid> {
    match caller.role {
        Role::SuperAdmin => None,
        _ => caller.tenant_id,
    }
}
