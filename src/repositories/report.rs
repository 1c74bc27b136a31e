//! # Bug Report Repository
//!
//! Repository implementation for bug reports: paginated listing with
//! filters, status transitions, and the dashboard statistics rollup.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Func;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, IntoSimpleExpr, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use crate::models::bug_report::{
    ActiveModel as ReportActiveModel, Column, Entity as BugReport, Model as ReportModel,
    ReportStatus,
};
use crate::repositories::TenantRepository;

/// Request data for persisting a newly ingested report
#[derive(Debug, Clone)]
pub struct CreateReportData {
    pub tenant_id: Uuid,
    pub description: Option<String>,
    pub label: Vec<String>,
    pub struggle_score: Option<f64>,
    /// Raw JSON text as submitted; validated upstream
    pub metadata_json: String,
    pub dom_snapshot: String,
    pub video_url: Option<String>,
}

/// Listing filters; every field is optional and combined with AND
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Tenant scope; `None` means all tenants (platform operators only)
    pub tenant_id: Option<Uuid>,
    pub status: Option<ReportStatus>,
    /// Case-sensitive substring match against description and metadata text
    pub search: Option<String>,
    pub date_from: Option<chrono::DateTime<Utc>>,
    pub date_to: Option<chrono::DateTime<Utc>>,
}

/// One page of reports plus the total row count for the filter
#[derive(Debug, Clone)]
pub struct ReportPage {
    pub reports: Vec<ReportModel>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Dashboard statistics rollup
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total_reports: u64,
    pub active_tenants: u64,
    pub resolved_this_week: u64,
    /// Mean struggle score rounded to two decimals, `0.0` when no
    /// report carries a score
    pub avg_struggle_score: f64,
}

/// Repository for BugReport database operations
pub struct ReportRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ReportRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: CreateReportData) -> Result<ReportModel, DbErr> {
        let report = ReportActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(data.tenant_id),
            description: Set(data.description),
            label: Set(serde_json::json!(data.label)),
            struggle_score: Set(data.struggle_score),
            metadata_json: Set(data.metadata_json),
            dom_snapshot: Set(data.dom_snapshot),
            status: Set(ReportStatus::New),
            synced_to_integration: Set(false),
            external_ticket_id: Set(None),
            video_url: Set(data.video_url),
            created_at: Set(Utc::now().into()),
        };

        report.insert(self.db).await
    }

    pub async fn find_by_id(&self, report_id: Uuid) -> Result<Option<ReportModel>, DbErr> {
        BugReport::find_by_id(report_id).one(self.db).await
    }

    /// Paginated listing, newest first. `page` is 1-based; callers
    /// validate the range before reaching the repository.
    pub async fn list(
        &self,
        filter: ReportFilter,
        page: u64,
        page_size: u64,
    ) -> Result<ReportPage, DbErr> {
        let mut query = BugReport::find().order_by_desc(Column::CreatedAt);

        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(Column::TenantId.eq(tenant_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(Column::Description.contains(search))
                    .add(Column::MetadataJson.contains(search)),
            );
        }
        if let Some(from) = filter.date_from {
            query = query.filter(Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(Column::CreatedAt.lte(to));
        }

        let paginator = query.paginate(self.db, page_size);
        let total = paginator.num_items().await?;
        let reports = paginator.fetch_page(page - 1).await?;

        Ok(ReportPage {
            reports,
            total,
            page,
            page_size,
        })
    }

    /// Triage updates: status transition plus the integration sync markers
    pub async fn update_status(
        &self,
        report: ReportModel,
        status: Option<ReportStatus>,
        synced_to_integration: Option<bool>,
        external_ticket_id: Option<Option<String>>,
    ) -> Result<ReportModel, DbErr> {
        let mut active = report.into_active_model();
        if let Some(status) = status {
            active.status = Set(status);
        }
        if let Some(synced) = synced_to_integration {
            active.synced_to_integration = Set(synced);
        }
        if let Some(ticket) = external_ticket_id {
            active.external_ticket_id = Set(ticket);
        }

        active.update(self.db).await
    }

    /// Attach the stored video URL once the upload lands
    pub async fn set_video_url(
        &self,
        report: ReportModel,
        video_url: String,
    ) -> Result<ReportModel, DbErr> {
        let mut active = report.into_active_model();
        active.video_url = Set(Some(video_url));
        active.update(self.db).await
    }

    /// Content corrections after ingestion
    pub async fn update_details(
        &self,
        report: ReportModel,
        description: Option<String>,
        label: Option<Vec<String>>,
    ) -> Result<ReportModel, DbErr> {
        let mut active = report.into_active_model();
        if let Some(description) = description {
            active.description = Set(Some(description));
        }
        if let Some(label) = label {
            active.label = Set(serde_json::json!(label));
        }

        active.update(self.db).await
    }

    pub async fn delete(&self, report: ReportModel) -> Result<(), DbErr> {
        report.delete(self.db).await?;
        Ok(())
    }

    /// Dashboard rollup, scoped to one tenant unless `scope` is `None`.
    ///
    /// `resolved_this_week` counts reports currently RESOLVED that were
    /// created within the last seven days.
    pub async fn stats(&self, scope: Option<Uuid>) -> Result<DashboardStats, DbErr> {
        let scoped = |mut query: sea_orm::Select<BugReport>| {
            if let Some(tenant_id) = scope {
                query = query.filter(Column::TenantId.eq(tenant_id));
            }
            query
        };

        let total_reports = scoped(BugReport::find()).count(self.db).await?;

        let week_ago = Utc::now() - Duration::days(7);
        let resolved_this_week = scoped(BugReport::find())
            .filter(Column::Status.eq(ReportStatus::Resolved))
            .filter(Column::CreatedAt.gte(week_ago))
            .count(self.db)
            .await?;

        let avg: Option<Option<f64>> = scoped(BugReport::find())
            .select_only()
            .expr(Func::avg(Column::StruggleScore.into_simple_expr()))
            .into_tuple()
            .one(self.db)
            .await?;
        let avg_struggle_score = avg
            .flatten()
            .map(|v| (v * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        let active_tenants = TenantRepository::new(self.db).count_active(scope).await?;

        Ok(DashboardStats {
            total_reports,
            active_tenants,
            resolved_this_week,
            avg_struggle_score,
        })
    }
}
