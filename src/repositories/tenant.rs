//! # Tenant Repository
//!
//! Repository implementation for Tenant entities: creation with generated
//! API keys, soft-delete via the `is_active` flag, key rotation, and the
//! active-key lookup used by unauthenticated ingestion.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::tenant::{ActiveModel as TenantActiveModel, Column, Entity as Tenant, Model as TenantModel};

/// Request data for creating a new tenant
#[derive(Debug, Clone)]
pub struct CreateTenantData {
    pub name: String,
    pub company_name: Option<String>,
}

/// Field updates for an existing tenant; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateTenantData {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Generate an unguessable tenant API key: 32 random bytes, URL-safe
/// base64 without padding.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Repository for Tenant database operations
pub struct TenantRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TenantRepository<'a> {
    /// Create a new TenantRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new tenant with a freshly generated API key
    pub async fn create(&self, data: CreateTenantData) -> Result<TenantModel, DbErr> {
        let tenant = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            company_name: Set(data.company_name),
            api_key: Set(generate_api_key()),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        tenant.insert(self.db).await
    }

    /// Get tenant by ID
    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<TenantModel>, DbErr> {
        Tenant::find_by_id(tenant_id).one(self.db).await
    }

    /// List all tenants, newest first
    pub async fn list(&self) -> Result<Vec<TenantModel>, DbErr> {
        Tenant::find()
            .order_by_desc(Column::CreatedAt)
            .all(self.db)
            .await
    }

    /// Apply partial updates to a tenant
    pub async fn update(
        &self,
        tenant: TenantModel,
        data: UpdateTenantData,
    ) -> Result<TenantModel, DbErr> {
        let mut active = tenant.into_active_model();
        if let Some(name) = data.name {
            active.name = Set(name);
        }
        if let Some(company_name) = data.company_name {
            active.company_name = Set(Some(company_name));
        }
        if let Some(is_active) = data.is_active {
            active.is_active = Set(is_active);
        }

        active.update(self.db).await
    }

    /// Soft-delete: flip `is_active` off, keeping all rows
    pub async fn deactivate(&self, tenant: TenantModel) -> Result<TenantModel, DbErr> {
        let mut active = tenant.into_active_model();
        active.is_active = Set(false);
        active.update(self.db).await
    }

    /// Rotate the tenant's API key; the previous key stops working immediately
    pub async fn regenerate_api_key(&self, tenant: TenantModel) -> Result<TenantModel, DbErr> {
        let mut active = tenant.into_active_model();
        active.api_key = Set(generate_api_key());
        active.update(self.db).await
    }

    /// Resolve an *active* tenant by its API key; inactive tenants are
    /// invisible here so deactivation locks ingestion out
    pub async fn find_active_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<TenantModel>, DbErr> {
        Tenant::find()
            .filter(Column::ApiKey.eq(api_key))
            .filter(Column::IsActive.eq(true))
            .one(self.db)
            .await
    }

    /// Count active tenants, optionally restricted to a single tenant ID
    /// (the caller's visible scope)
    pub async fn count_active(&self, scope: Option<Uuid>) -> Result<u64, DbErr> {
        let mut query = Tenant::find().filter(Column::IsActive.eq(true));
        if let Some(tenant_id) = scope {
            query = query.filter(Column::Id.eq(tenant_id));
        }
        query.count(self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_url_safe_and_long_enough() {
        let key = generate_api_key();
        // 32 bytes -> 43 base64url chars, no padding.
        assert_eq!(key.len(), 43);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn api_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }
}
