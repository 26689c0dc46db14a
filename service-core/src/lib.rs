//! Shared HTTP plumbing for profile-service: errors, config loading,
//! observability and middleware.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use async_trait;
pub use axum;
pub use reqwest;
pub use tokio;
pub use tower_http;
pub use tracing;
