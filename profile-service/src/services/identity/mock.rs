use super::{GroupRepresentation, IdentityProvider, NewAccount, RoleMappings, TokenGrant};
use crate::services::ProfileError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One recorded call against [`MockIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    FindGroup(String),
    CreateUser(String),
    AddUserToGroup { user_id: String, group_id: String },
    ListUserGroups(String),
    ListGroupRoleMappings(String),
    PasswordGrant(String),
    RefreshGrant,
    ExchangeToken(String),
}

impl IdentityCall {
    pub fn is_token_call(&self) -> bool {
        matches!(
            self,
            IdentityCall::PasswordGrant(_) | IdentityCall::RefreshGrant | IdentityCall::ExchangeToken(_)
        )
    }

    fn operation(&self) -> &'static str {
        match self {
            IdentityCall::FindGroup(_) => "find_group",
            IdentityCall::CreateUser(_) => "create_user",
            IdentityCall::AddUserToGroup { .. } => "add_user_to_group",
            IdentityCall::ListUserGroups(_) => "list_user_groups",
            IdentityCall::ListGroupRoleMappings(_) => "list_group_role_mappings",
            IdentityCall::PasswordGrant(_) => "password_grant",
            IdentityCall::RefreshGrant => "refresh_grant",
            IdentityCall::ExchangeToken(_) => "exchange_token",
        }
    }
}

/// In-memory provider recording every call.
///
/// Groups the account is enrolled into are what `list_user_groups` returns
/// unless `with_user_groups` overrides it.
pub struct MockIdentityProvider {
    pub user_id: String,
    groups: HashMap<String, GroupRepresentation>,
    role_mappings: HashMap<String, RoleMappings>,
    user_groups: Option<Vec<GroupRepresentation>>,
    token_grant: TokenGrant,
    failing: Option<&'static str>,
    enrolled: Mutex<Vec<String>>,
    accounts: Mutex<Vec<NewAccount>>,
    calls: Mutex<Vec<IdentityCall>>,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            user_id: "kc-user-1".to_string(),
            groups: HashMap::new(),
            role_mappings: HashMap::new(),
            user_groups: None,
            token_grant: TokenGrant::new("access-token", "refresh-token"),
            failing: None,
            enrolled: Mutex::new(Vec::new()),
            accounts: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a group carrying the given `client` attribute values.
    pub fn with_group(mut self, group_id: &str, clients: &[&str]) -> Self {
        let attributes = HashMap::from([(
            super::CLIENT_ATTRIBUTE.to_string(),
            clients.iter().map(|c| c.to_string()).collect(),
        )]);
        self.groups.insert(
            group_id.to_string(),
            GroupRepresentation {
                id: group_id.to_string(),
                name: group_id.to_string(),
                path: Some(format!("/{}", group_id)),
                attributes: Some(attributes),
            },
        );
        self
    }

    pub fn with_group_representation(mut self, group: GroupRepresentation) -> Self {
        self.groups.insert(group.id.clone(), group);
        self
    }

    /// Client role mappings for a group, as `(client, [(role id, role name)])`.
    pub fn with_role_mappings(mut self, group_id: &str, clients: &[(&str, &[(&str, &str)])]) -> Self {
        let client_mappings = clients
            .iter()
            .map(|(client, roles)| {
                (
                    client.to_string(),
                    super::ClientRoleMapping {
                        id: Some(format!("{}-uuid", client)),
                        client: Some(client.to_string()),
                        mappings: roles
                            .iter()
                            .map(|(id, name)| super::RoleRepresentation {
                                id: id.to_string(),
                                name: name.to_string(),
                            })
                            .collect(),
                    },
                )
            })
            .collect();
        self.role_mappings
            .insert(group_id.to_string(), RoleMappings { client_mappings });
        self
    }

    pub fn with_user_groups(mut self, group_ids: &[&str]) -> Self {
        self.user_groups = Some(
            group_ids
                .iter()
                .map(|id| {
                    self.groups.get(*id).cloned().unwrap_or_else(|| GroupRepresentation {
                        id: id.to_string(),
                        name: id.to_string(),
                        ..Default::default()
                    })
                })
                .collect(),
        );
        self
    }

    pub fn with_token_grant(mut self, grant: TokenGrant) -> Self {
        self.token_grant = grant;
        self
    }

    /// Make the named trait operation fail with `Upstream`.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<IdentityCall> {
        lock(&self.calls).clone()
    }

    pub fn created_accounts(&self) -> Vec<NewAccount> {
        lock(&self.accounts).clone()
    }

    fn record(&self, call: IdentityCall) -> Result<(), ProfileError> {
        let operation = call.operation();
        lock(&self.calls).push(call);
        if self.failing == Some(operation) {
            return Err(ProfileError::Upstream(format!("{} failed: 500 Internal Server Error", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn find_group(&self, group_id: &str) -> Result<Option<GroupRepresentation>, ProfileError> {
        self.record(IdentityCall::FindGroup(group_id.to_string()))?;
        Ok(self.groups.get(group_id).cloned())
    }

    async fn create_user(&self, account: &NewAccount) -> Result<String, ProfileError> {
        self.record(IdentityCall::CreateUser(account.username.clone()))?;
        lock(&self.accounts).push(account.clone());
        Ok(self.user_id.clone())
    }

    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), ProfileError> {
        self.record(IdentityCall::AddUserToGroup {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
        })?;
        lock(&self.enrolled).push(group_id.to_string());
        Ok(())
    }

    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRepresentation>, ProfileError> {
        self.record(IdentityCall::ListUserGroups(user_id.to_string()))?;
        if let Some(groups) = &self.user_groups {
            return Ok(groups.clone());
        }
        Ok(lock(&self.enrolled)
            .iter()
            .map(|id| {
                self.groups.get(id).cloned().unwrap_or_else(|| GroupRepresentation {
                    id: id.clone(),
                    ..Default::default()
                })
            })
            .collect())
    }

    async fn list_group_role_mappings(&self, group_id: &str) -> Result<RoleMappings, ProfileError> {
        self.record(IdentityCall::ListGroupRoleMappings(group_id.to_string()))?;
        Ok(self.role_mappings.get(group_id).cloned().unwrap_or_default())
    }

    async fn password_grant(&self, username: &str, _password: &str) -> Result<TokenGrant, ProfileError> {
        self.record(IdentityCall::PasswordGrant(username.to_string()))?;
        Ok(self.token_grant.clone())
    }

    async fn refresh_grant(&self, _refresh_token: &str) -> Result<TokenGrant, ProfileError> {
        self.record(IdentityCall::RefreshGrant)?;
        Ok(self.token_grant.clone())
    }

    async fn exchange_token(
        &self,
        _subject_token: &str,
        subject_issuer: &str,
    ) -> Result<TokenGrant, ProfileError> {
        self.record(IdentityCall::ExchangeToken(subject_issuer.to_string()))?;
        Ok(self.token_grant.clone())
    }
}
