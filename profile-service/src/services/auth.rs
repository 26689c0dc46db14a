use crate::dtos::{AuthResponse, LoginRequest};
use crate::models::Profile;
use crate::services::{IdentityClaims, IdentityProvider, ProfileError, ProfileStore};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

/// Registration, login and profile lookup over the provider and the cache.
#[derive(Clone)]
pub struct AuthService {
    pub(crate) store: Arc<dyn ProfileStore>,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    /// Groups every new account is enrolled into, in configured order.
    pub(crate) default_groups: Vec<String>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        identity: Arc<dyn IdentityProvider>,
        default_groups: Vec<String>,
    ) -> Self {
        Self {
            store,
            identity,
            default_groups,
        }
    }

    /// Local existence gate, then the provider's direct grant.
    ///
    /// The password is never checked locally.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ProfileError> {
        let result = self.try_login(request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("logins_total", "outcome" => outcome).increment(1);

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Login failed");
        }
        result
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<AuthResponse, ProfileError> {
        request.validate()?;
        if self.store.find_by_username(&request.username).await?.is_none() {
            return Err(ProfileError::NotFound("User not found".to_string()));
        }

        self.identity
            .password_grant(&request.username, &request.password)
            .await?
            .into_auth_response()
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ProfileError> {
        self.identity
            .refresh_grant(refresh_token)
            .await?
            .into_auth_response()
    }

    /// Federated sign-in: trade a token from a brokered provider for realm tokens.
    #[instrument(skip(self, subject_token))]
    pub async fn exchange(
        &self,
        subject_token: &str,
        subject_issuer: &str,
    ) -> Result<AuthResponse, ProfileError> {
        self.identity
            .exchange_token(subject_token, subject_issuer)
            .await?
            .into_auth_response()
    }

    /// Profile keyed by the token's `profile_id` claim.
    #[instrument(skip(self, identity), fields(sub = %identity.sub))]
    pub async fn find_me(&self, identity: &IdentityClaims) -> Result<Option<Profile>, ProfileError> {
        match identity.profile_id.as_deref() {
            Some(profile_id) => self.store.find_by_id(profile_id).await,
            None => {
                tracing::debug!("Token carries no profile_id claim");
                Ok(None)
            }
        }
    }
}
