//! # Data Models
//!
//! This module contains the SeaORM entities used throughout the Bugtriage API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod bug_report;
pub mod integration;
pub mod tenant;
pub mod user;

pub use bug_report::Entity as BugReport;
pub use integration::Entity as Integration;
pub use tenant::Entity as Tenant;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "bugtriage".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
