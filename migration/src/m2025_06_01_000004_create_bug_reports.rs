//! Migration to create the bug_reports table.
//!
//! Bug reports are ingested by the unauthenticated SDK endpoint and read
//! by the dashboard; the `(tenant_id, created_at DESC)` index backs the
//! tenant-scoped listing order.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BugReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BugReports::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BugReports::TenantId).uuid().not_null())
                    .col(ColumnDef::new(BugReports::Description).text().null())
                    .col(ColumnDef::new(BugReports::Label).json().not_null())
                    .col(ColumnDef::new(BugReports::StruggleScore).double().null())
                    .col(ColumnDef::new(BugReports::MetadataJson).text().not_null())
                    .col(ColumnDef::new(BugReports::DomSnapshot).text().not_null())
                    .col(ColumnDef::new(BugReports::Status).text().not_null())
                    .col(
                        ColumnDef::new(BugReports::SyncedToIntegration)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BugReports::ExternalTicketId)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(BugReports::VideoUrl).text().null())
                    .col(
                        ColumnDef::new(BugReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bug_reports_tenant_id")
                            .from(BugReports::Table, BugReports::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // DESC ordering in the index needs raw SQL across backends.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_bug_reports_tenant_created ON bug_reports (tenant_id, created_at DESC)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BugReports::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BugReports {
    Table,
    Id,
    TenantId,
    Description,
    Label,
    StruggleScore,
    MetadataJson,
    DomSnapshot,
    Status,
    SyncedToIntegration,
    ExternalTicketId,
    VideoUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
