//! # Integration Repository
//!
//! Repository implementation for tenant ticketing integrations
//! (Jira, ClickUp, Linear).

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::integration::{
    ActiveModel as IntegrationActiveModel, Column, Entity as Integration, IntegrationType,
    Model as IntegrationModel,
};

/// Request data for registering a new integration
#[derive(Debug, Clone)]
pub struct CreateIntegrationData {
    pub tenant_id: Uuid,
    pub integration_type: IntegrationType,
    pub config_json: serde_json::Value,
    pub enabled: bool,
}

/// Field updates for an existing integration; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateIntegrationData {
    pub config_json: Option<serde_json::Value>,
    pub enabled: Option<bool>,
}

/// Repository for Integration database operations
pub struct IntegrationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> IntegrationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: CreateIntegrationData) -> Result<IntegrationModel, DbErr> {
        let integration = IntegrationActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(data.tenant_id),
            integration_type: Set(data.integration_type),
            config_json: Set(data.config_json),
            enabled: Set(data.enabled),
            created_at: Set(Utc::now().into()),
        };

        integration.insert(self.db).await
    }

    pub async fn find_by_id(&self, integration_id: Uuid) -> Result<Option<IntegrationModel>, DbErr> {
        Integration::find_by_id(integration_id).one(self.db).await
    }

    /// List integrations, optionally restricted to one tenant
    pub async fn list(&self, scope: Option<Uuid>) -> Result<Vec<IntegrationModel>, DbErr> {
        let mut query = Integration::find().order_by_desc(Column::CreatedAt);
        if let Some(tenant_id) = scope {
            query = query.filter(Column::TenantId.eq(tenant_id));
        }
        query.all(self.db).await
    }

    pub async fn update(
        &self,
        integration: IntegrationModel,
        data: UpdateIntegrationData,
    ) -> Result<IntegrationModel, DbErr> {
        let mut active = integration.into_active_model();
        if let Some(config_json) = data.config_json {
            active.config_json = Set(config_json);
        }
        if let Some(enabled) = data.enabled {
            active.enabled = Set(enabled);
        }

        active.update(self.db).await
    }

    pub async fn delete(&self, integration: IntegrationModel) -> Result<(), DbErr> {
        integration.delete(self.db).await?;
        Ok(())
    }
}
