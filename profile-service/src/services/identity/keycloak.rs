//! Keycloak admin REST API and OpenID Connect token endpoint.

use super::{GroupRepresentation, IdentityProvider, NewAccount, RoleMappings, TokenGrant};
use crate::config::KeycloakConfig;
use crate::services::ProfileError;
use async_trait::async_trait;
use reqwest::{header::LOCATION, Response, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// Admin tokens are renewed this long before they expire, or at half their
/// lifetime when that is shorter.
const ADMIN_TOKEN_SKEW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct AdminToken {
    access_token: String,
    refresh_at: Instant,
}

impl AdminToken {
    fn new(access_token: String, expires_in: Duration) -> Self {
        let skew = ADMIN_TOKEN_SKEW.min(expires_in / 2);
        Self {
            access_token,
            refresh_at: Instant::now() + expires_in - skew,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRepresentation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
    temporary: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRepresentation<'a> {
    username: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    enabled: bool,
    credentials: Vec<CredentialRepresentation<'a>>,
    attributes: HashMap<&'static str, Vec<String>>,
}

impl<'a> From<&'a NewAccount> for UserRepresentation<'a> {
    fn from(account: &'a NewAccount) -> Self {
        Self {
            username: &account.username,
            email: &account.email,
            first_name: &account.first_name,
            last_name: &account.last_name,
            enabled: true,
            credentials: vec![CredentialRepresentation {
                kind: "password",
                value: &account.password,
                temporary: false,
            }],
            attributes: HashMap::from([
                ("profile_id", vec![account.profile_id.clone()]),
                ("clients", vec![account.clients_attribute()]),
            ]),
        }
    }
}

/// Client for one realm, authenticated for admin calls with admin credentials.
///
/// The admin token is fetched lazily and shared by all callers until it
/// nears expiry.
#[derive(Clone)]
pub struct KeycloakClient {
    http: reqwest::Client,
    config: KeycloakConfig,
    admin_token: Arc<RwLock<Option<AdminToken>>>,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Result<Self, ProfileError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProfileError::upstream("Failed to build HTTP client", e))?;

        tracing::info!(
            host = %config.host,
            realm = %config.realm,
            admin_realm = %config.admin_realm,
            "Keycloak client configured (lazy admin login)"
        );

        Ok(Self {
            http,
            config,
            admin_token: Arc::new(RwLock::new(None)),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.host.trim_end_matches('/'),
            self.config.realm
        )
    }

    fn admin_token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.admin_host.trim_end_matches('/'),
            self.config.admin_realm
        )
    }

    fn admin_url(&self, path: &str) -> String {
        format!(
            "{}/admin/realms/{}{}",
            self.config.admin_host.trim_end_matches('/'),
            self.config.realm,
            path
        )
    }

    async fn admin_access_token(&self) -> Result<String, ProfileError> {
        {
            let guard = self.admin_token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.admin_token.write().await;

        // Another task may have refreshed it while we waited
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.admin_client_id.as_str()),
            ("username", self.config.admin_username.as_str()),
            ("password", self.config.admin_password.as_str()),
        ];
        let response = self
            .http
            .traced_post(&self.admin_token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Admin login failed", e))?;
        let response = ensure_success(response, "Admin login failed").await?;

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| ProfileError::upstream("Admin login returned an invalid body", e))?;
        let access_token = grant
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProfileError::Upstream("Admin login returned no access token".to_string()))?;
        let expires_in = Duration::from_secs(grant.expires_in.unwrap_or(60));

        tracing::debug!(expires_in = expires_in.as_secs(), "Obtained Keycloak admin token");
        *guard = Some(AdminToken::new(access_token.clone(), expires_in));
        Ok(access_token)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, ProfileError> {
        let response = self
            .http
            .traced_post(&self.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Token request failed", e))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: TokenErrorBody = response.json().await.unwrap_or_default();
            tracing::warn!(status = %status, error = ?body.error, "Token request rejected");
            return Err(ProfileError::Credential(
                body.error_description
                    .or(body.error)
                    .unwrap_or_else(|| "Failed to obtain tokens".to_string()),
            ));
        }

        let response = ensure_success(response, "Token request failed").await?;
        response
            .json()
            .await
            .map_err(|e| ProfileError::upstream("Token endpoint returned an invalid body", e))
    }
}

/// Turn a non-2xx response into `Upstream`, keeping status and body.
async fn ensure_success(response: Response, context: &str) -> Result<Response, ProfileError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %body, "{}", context);
    Err(ProfileError::Upstream(format!("{}: {} {}", context, status, body).trim_end().to_string()))
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    #[instrument(skip(self))]
    async fn find_group(&self, group_id: &str) -> Result<Option<GroupRepresentation>, ProfileError> {
        let token = self.admin_access_token().await?;
        let response = self
            .http
            .traced_get(&self.admin_url(&format!("/groups/{}", group_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Group lookup failed", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, "Group lookup failed").await?;
        let group = response
            .json()
            .await
            .map_err(|e| ProfileError::upstream("Group lookup returned an invalid body", e))?;
        Ok(Some(group))
    }

    #[instrument(skip(self, account), fields(username = %account.username))]
    async fn create_user(&self, account: &NewAccount) -> Result<String, ProfileError> {
        let token = self.admin_access_token().await?;
        let response = self
            .http
            .traced_post(&self.admin_url("/users"))
            .bearer_auth(token)
            .json(&UserRepresentation::from(account))
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Account creation failed", e))?;
        let response = ensure_success(response, "Account creation failed").await?;

        let user_id = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string())
            .ok_or_else(|| {
                ProfileError::Upstream("Account creation returned no account id".to_string())
            })?;

        tracing::info!(user_id = %user_id, "Created Keycloak account");
        Ok(user_id)
    }

    #[instrument(skip(self))]
    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), ProfileError> {
        let token = self.admin_access_token().await?;
        let response = self
            .http
            .traced_put(&self.admin_url(&format!("/users/{}/groups/{}", user_id, group_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Group enrollment failed", e))?;
        ensure_success(response, "Group enrollment failed").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRepresentation>, ProfileError> {
        let token = self.admin_access_token().await?;
        let response = self
            .http
            .traced_get(&self.admin_url(&format!("/users/{}/groups", user_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Listing account groups failed", e))?;
        let response = ensure_success(response, "Listing account groups failed").await?;
        response
            .json()
            .await
            .map_err(|e| ProfileError::upstream("Listing account groups returned an invalid body", e))
    }

    #[instrument(skip(self))]
    async fn list_group_role_mappings(&self, group_id: &str) -> Result<RoleMappings, ProfileError> {
        let token = self.admin_access_token().await?;
        let response = self
            .http
            .traced_get(&self.admin_url(&format!("/groups/{}/role-mappings", group_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::upstream("Role mapping lookup failed", e))?;
        let response = ensure_success(response, "Role mapping lookup failed").await?;
        response
            .json()
            .await
            .map_err(|e| ProfileError::upstream("Role mapping lookup returned an invalid body", e))
    }

    #[instrument(skip(self, password))]
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenGrant, ProfileError> {
        self.token_request(&[
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", username),
            ("password", password),
            ("scope", "openid"),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ProfileError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    #[instrument(skip(self, subject_token))]
    async fn exchange_token(
        &self,
        subject_token: &str,
        subject_issuer: &str,
    ) -> Result<TokenGrant, ProfileError> {
        self.token_request(&[
            ("grant_type", TOKEN_EXCHANGE_GRANT),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("subject_token", subject_token),
            ("subject_issuer", subject_issuer),
            ("subject_token_type", ACCESS_TOKEN_TYPE),
            ("requested_token_type", "urn:ietf:params:oauth:token-type:refresh_token"),
        ])
        .await
    }
}
