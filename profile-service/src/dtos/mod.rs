pub mod auth;
pub mod profile;

use serde::Serialize;
use utoipa::ToSchema;

pub use auth::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenExchangeRequest};
pub use profile::ProfileResponse;

/// Error body produced by `service_core::error::AppError`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "User already exists")]
    pub error: String,
    pub details: Option<String>,
}
