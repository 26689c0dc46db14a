use crate::{services::IdentityClaims, AppState};
use service_core::axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::fmt;

/// Client roles defined on the service's Keycloak client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeycloakRole {
    UserProfileViewSelf,
    UserProfileEditSelf,
    UserProfileView,
    UserProfileEdit,
    UserListView,
    UserCreate,
    UserDelete,
}

impl KeycloakRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeycloakRole::UserProfileViewSelf => "USER_PROFILE_VIEW_SELF",
            KeycloakRole::UserProfileEditSelf => "USER_PROFILE_EDIT_SELF",
            KeycloakRole::UserProfileView => "USER_PROFILE_VIEW",
            KeycloakRole::UserProfileEdit => "USER_PROFILE_EDIT",
            KeycloakRole::UserListView => "USER_LIST_VIEW",
            KeycloakRole::UserCreate => "USER_CREATE",
            KeycloakRole::UserDelete => "USER_DELETE",
        }
    }
}

impl fmt::Display for KeycloakRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs after [`super::auth_middleware`]; requires `role` on the service client.
pub async fn require_role(
    State(state): State<AppState>,
    role: KeycloakRole,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req.extensions().get::<IdentityClaims>().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!(
            "Auth claims missing from request extensions"
        ))
    })?;

    let client_id = &state.config.keycloak.client_id;
    if !claims.has_client_role(client_id, role.as_str()) {
        tracing::warn!(
            sub = %claims.sub,
            client_id = %client_id,
            required_role = %role,
            "Insufficient role"
        );
        return Err(AppError::Forbidden(format!(
            "Insufficient role. Required: {}",
            role
        )));
    }

    Ok(next.run(req).await)
}
