//! Tenant entity model
//!
//! This module contains the SeaORM entity model for the tenants table,
//! the unit of data partitioning for every other entity.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Tenant entity representing an isolated customer account
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the tenant
    pub name: String,

    /// Legal/company name (optional)
    pub company_name: Option<String>,

    /// Shared secret identifying the tenant on unauthenticated ingestion
    #[sea_orm(unique)]
    pub api_key: String,

    /// Soft-delete flag; an inactive tenant's api_key is rejected
    pub is_active: bool,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    #[sea_orm(has_many = "super::integration::Entity")]
    Integrations,
    #[sea_orm(has_many = "super::bug_report::Entity")]
    BugReports,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::integration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Integrations.def()
    }
}

impl Related<super::bug_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BugReports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
