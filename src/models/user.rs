//! User entity model
//!
//! Dashboard accounts. `tenant_id` is null only for SUPER_ADMIN accounts;
//! the authorization engine relies on that invariant.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role hierarchy: SUPER_ADMIN spans all tenants, CLIENT_ADMIN manages one
/// tenant, CLIENT_USER is read-mostly inside one tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Role {
    #[sea_orm(string_value = "SUPER_ADMIN")]
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[sea_orm(string_value = "CLIENT_ADMIN")]
    #[serde(rename = "CLIENT_ADMIN")]
    ClientAdmin,
    #[sea_orm(string_value = "CLIENT_USER")]
    #[serde(rename = "CLIENT_USER")]
    ClientUser,
}

/// User entity for authenticated dashboard access
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login identifier, globally unique
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id PHC-format hash; never serialized outward
    pub password_hash: String,

    pub role: Role,

    /// Owning tenant; null only for SUPER_ADMIN
    pub tenant_id: Option<Uuid>,

    /// Soft-delete flag; inactive users cannot authenticate
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
