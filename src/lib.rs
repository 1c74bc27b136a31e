//! # Bugtriage API Library
//!
//! This library provides the core functionality for the Bugtriage API
//! service: multi-tenant bug-report intake, transcription/labeling
//! delegation, and role-scoped dashboard access.

pub mod auth;
pub mod authz;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
