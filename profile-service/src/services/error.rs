use service_core::error::AppError;
use thiserror::Error;

/// Failures of the registration, login and lookup flows.
///
/// Every variant reaches the HTTP caller as the same `400 Bad Request` shape,
/// so the message text is the only thing that tells them apart.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Credential(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl ProfileError {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        ProfileError::Upstream(format!("{}: {}", context, err))
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProfileError::Validation(_) => "validation",
            ProfileError::Conflict(_) => "conflict",
            ProfileError::NotFound(_) => "not_found",
            ProfileError::Credential(_) => "credential",
            ProfileError::Upstream(_) => "upstream",
            ProfileError::Database(_) => "database",
        }
    }
}

impl From<validator::ValidationErrors> for ProfileError {
    fn from(err: validator::ValidationErrors) -> Self {
        ProfileError::Validation(err.to_string())
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn every_kind_surfaces_as_bad_request() {
        let errors = [
            ProfileError::Validation("Password and confirm password do not match".into()),
            ProfileError::Conflict("User already exists".into()),
            ProfileError::NotFound("User not found".into()),
            ProfileError::Credential("Failed to obtain tokens".into()),
            ProfileError::upstream("Group lookup failed", "404 Not Found"),
        ];

        for err in errors {
            let message = err.to_string();
            let app_error = AppError::from(err);
            assert!(app_error.to_string().contains(&message));
            assert_eq!(app_error.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn upstream_keeps_context() {
        let err = ProfileError::upstream("Account creation failed", "409 Conflict");
        assert_eq!(err.to_string(), "Account creation failed: 409 Conflict");
        assert_eq!(err.kind(), "upstream");
    }
}
