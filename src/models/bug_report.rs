//! BugReport entity model
//!
//! The ingested struggle event: description (caller-supplied or the
//! transcript), auto-generated labels, DOM snapshot, client metadata, and
//! an optional object-storage video reference. `tenant_id` is immutable
//! after creation.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Triage lifecycle of a report
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReportStatus {
    #[sea_orm(string_value = "NEW")]
    #[serde(rename = "NEW")]
    New,
    #[sea_orm(string_value = "IN_PROGRESS")]
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "RESOLVED")]
    #[serde(rename = "RESOLVED")]
    Resolved,
    #[sea_orm(string_value = "CLOSED")]
    #[serde(rename = "CLOSED")]
    Closed,
}

/// Bug report entity, owned by exactly one tenant
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bug_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub description: Option<String>,

    /// Ordered list of label strings, stored as JSON
    pub label: Json,

    /// Client-reported friction metric
    pub struggle_score: Option<f64>,

    /// Opaque JSON-encoded client metadata, searchable as text
    pub metadata_json: String,

    /// Opaque serialized DOM snapshot
    pub dom_snapshot: String,

    pub status: ReportStatus,

    pub synced_to_integration: bool,

    /// Ticket reference once pushed to an issue tracker
    pub external_ticket_id: Option<String>,

    /// Public object-storage URL of the screen recording, when stored
    pub video_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decode the JSON label column into a list of strings, dropping
    /// anything malformed rather than failing the read path.
    pub fn labels(&self) -> Vec<String> {
        self.label
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
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
