//! HTTP handlers for profile-service.

pub mod auth;
pub mod metrics;
pub mod user;
