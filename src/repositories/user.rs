//! # User Repository
//!
//! Repository implementation for User entities. Listing takes an optional
//! tenant scope (derived from the caller's role by the authorization
//! layer); deletes are soft.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::user::{ActiveModel as UserActiveModel, Column, Entity as User, Model as UserModel, Role};

/// Request data for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

/// Field updates for an existing user; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateUserData {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub tenant_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: CreateUserData) -> Result<UserModel, DbErr> {
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(data.email),
            password_hash: Set(data.password_hash),
            role: Set(data.role),
            tenant_id: Set(data.tenant_id),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        user.insert(self.db).await
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserModel>, DbErr> {
        User::find_by_id(user_id).one(self.db).await
    }

    /// Lookup by normalized (lowercased, trimmed) email, active or not.
    /// Login distinguishes "missing" from "inactive" for logging only.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, DbErr> {
        User::find()
            .filter(Column::Email.eq(email))
            .one(self.db)
            .await
    }

    /// List users, optionally restricted to one tenant
    pub async fn list(&self, scope: Option<Uuid>) -> Result<Vec<UserModel>, DbErr> {
        let mut query = User::find().order_by_desc(Column::CreatedAt);
        if let Some(tenant_id) = scope {
            query = query.filter(Column::TenantId.eq(tenant_id));
        }
        query.all(self.db).await
    }

    /// Apply partial updates to a user
    pub async fn update(
        &self,
        user: UserModel,
        data: UpdateUserData,
    ) -> Result<UserModel, DbErr> {
        let mut active = user.into_active_model();
        if let Some(email) = data.email {
            active.email = Set(email);
        }
        if let Some(role) = data.role {
            active.role = Set(role);
        }
        if let Some(tenant_id) = data.tenant_id {
            active.tenant_id = Set(tenant_id);
        }
        if let Some(is_active) = data.is_active {
            active.is_active = Set(is_active);
        }

        active.update(self.db).await
    }

    /// Replace the stored credential hash
    pub async fn set_password_hash(
        &self,
        user: UserModel,
        password_hash: String,
    ) -> Result<UserModel, DbErr> {
        let mut active = user.into_active_model();
        active.password_hash = Set(password_hash);
        active.update(self.db).await
    }

    /// Soft-delete: the row stays, authentication stops working
    pub async fn deactivate(&self, user: UserModel) -> Result<UserModel, DbErr> {
        let mut active = user.into_active_model();
        active.is_active = Set(false);
        active.update(self.db).await
    }
}
