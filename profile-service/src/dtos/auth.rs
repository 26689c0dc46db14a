use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "email must be an email"))]
    #[schema(example = "a@x.com")]
    pub email: String,

    #[validate(length(min = 1, message = "username should not be empty"))]
    #[schema(example = "a")]
    pub username: String,

    #[validate(length(min = 1, message = "password should not be empty"))]
    #[schema(example = "Passw0rd1")]
    pub password: String,

    #[schema(example = "Passw0rd1")]
    pub confirm_password: String,

    #[validate(length(min = 1, message = "firstName should not be empty"))]
    #[schema(example = "A")]
    pub first_name: String,

    #[validate(length(min = 1, message = "lastName should not be empty"))]
    #[schema(example = "B")]
    pub last_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username should not be empty"))]
    #[schema(example = "a")]
    pub username: String,

    #[validate(length(min = 1, message = "password should not be empty"))]
    #[schema(example = "Passw0rd1")]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken should not be empty"))]
    #[schema(example = "eyJhbGciOi...")]
    pub refresh_token: String,
}

/// Federated sign-in: trade a third-party token for realm tokens.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    #[validate(length(min = 1, message = "subjectToken should not be empty"))]
    pub subject_token: String,
    /// Alias of the identity-provider broker that issued `subject_token`.
    #[validate(length(min = 1, message = "subjectIssuer should not be empty"))]
    #[schema(example = "google")]
    pub subject_issuer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
}
