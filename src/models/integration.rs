//! Integration entity model
//!
//! Per-tenant issue-tracker configuration. `config_json` is an opaque bag
//! (OAuth tokens, project IDs) and is treated as secret material.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported issue-tracker targets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum IntegrationType {
    #[sea_orm(string_value = "JIRA")]
    #[serde(rename = "JIRA")]
    Jira,
    #[sea_orm(string_value = "CLICKUP")]
    #[serde(rename = "CLICKUP")]
    Clickup,
    #[sea_orm(string_value = "LINEAR")]
    #[serde(rename = "LINEAR")]
    Linear,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Jira => "JIRA",
            IntegrationType::Clickup => "CLICKUP",
            IntegrationType::Linear => "LINEAR",
        }
    }
}

/// Integration entity, owned by exactly one tenant
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub integration_type: IntegrationType,

    /// Opaque configuration bag; may hold secrets
    pub config_json: Json,

    pub enabled: bool,

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
