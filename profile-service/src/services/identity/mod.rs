//! Identity-provider seam: admin operations and end-user token grants.

mod keycloak;
mod mock;

pub use keycloak::KeycloakClient;
pub use mock::{IdentityCall, MockIdentityProvider};

use crate::dtos::AuthResponse;
use crate::services::ProfileError;
use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// Group attribute holding the downstream client ids a group grants.
pub const CLIENT_ATTRIBUTE: &str = "client";

/// Separator used when the client list is stored as one account attribute.
pub const CLIENTS_SEPARATOR: &str = "##";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` when the provider has no group with this id.
    async fn find_group(&self, group_id: &str) -> Result<Option<GroupRepresentation>, ProfileError>;
    /// Returns the new account id.
    async fn create_user(&self, account: &NewAccount) -> Result<String, ProfileError>;
    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), ProfileError>;
    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRepresentation>, ProfileError>;
    async fn list_group_role_mappings(&self, group_id: &str) -> Result<RoleMappings, ProfileError>;

    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenGrant, ProfileError>;
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ProfileError>;
    async fn exchange_token(
        &self,
        subject_token: &str,
        subject_issuer: &str,
    ) -> Result<TokenGrant, ProfileError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupRepresentation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: Option<HashMap<String, Vec<String>>>,
}

impl GroupRepresentation {
    /// Every value of the group's `client` attribute.
    ///
    /// A group without the attribute, or with it empty, is a provider
    /// misconfiguration and fails the lookup.
    pub fn client_ids(&self) -> Result<Vec<String>, ProfileError> {
        let values = self
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get(CLIENT_ATTRIBUTE))
            .filter(|values| !values.is_empty())
            .ok_or_else(|| {
                ProfileError::Upstream(format!(
                    "Group {} has no '{}' attribute",
                    self.id, CLIENT_ATTRIBUTE
                ))
            })?;
        Ok(values.clone())
    }
}

/// Account to be created in the provider.
#[derive(Clone)]
pub struct NewAccount {
    pub profile_id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub clients: Vec<String>,
}

impl NewAccount {
    /// Value of the single `clients` account attribute.
    pub fn clients_attribute(&self) -> String {
        self.clients.join(CLIENTS_SEPARATOR)
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("profile_id", &self.profile_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("clients", &self.clients)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleRepresentation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientRoleMapping {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub mappings: Vec<RoleRepresentation>,
}

/// Role mappings of a group, client mappings keep the provider's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMappings {
    #[serde(default, deserialize_with = "ordered_client_mappings")]
    pub client_mappings: Vec<(String, ClientRoleMapping)>,
}

fn ordered_client_mappings<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, ClientRoleMapping)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedMap;

    impl<'de> Visitor<'de> for OrderedMap {
        type Value = Vec<(String, ClientRoleMapping)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object of client role mappings")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((client, mapping)) = access.next_entry::<String, ClientRoleMapping>()? {
                entries.push((client, mapping));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(OrderedMap)
}

/// Raw token endpoint response; either token may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenGrant {
    pub fn new(access_token: &str, refresh_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
            expires_in: None,
        }
    }

    /// Both tokens, or `Credential("Failed to obtain tokens")`.
    pub fn into_auth_response(self) -> Result<AuthResponse, ProfileError> {
        match (self.access_token, self.refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Ok(AuthResponse {
                    access_token,
                    refresh_token,
                })
            }
            _ => Err(ProfileError::Credential("Failed to obtain tokens".to_string())),
        }
    }
}
