//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities, providing tenant-aware data access.
//! Repositories execute queries as instructed; tenant scoping decisions are
//! made upstream by the authorization engine.

pub mod integration;
pub mod report;
pub mod tenant;
pub mod user;

pub use integration::{CreateIntegrationData, IntegrationRepository, UpdateIntegrationData};
pub use report::{
    CreateReportData, DashboardStats, ReportFilter, ReportPage, ReportRepository,
};
pub use tenant::{CreateTenantData, TenantRepository, UpdateTenantData};
pub use user::{CreateUserData, UpdateUserData, UserRepository};
