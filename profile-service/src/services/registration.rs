//! New-account flow: provider account, group grants, local profile, first tokens.
//!
//! Steps run in order and nothing is rolled back. A failure after the account
//! is created leaves the provider and the cache out of sync.

use crate::dtos::{AuthResponse, RegisterRequest};
use crate::models::{Profile, ProfileRole};
use crate::services::{AuthService, NewAccount, ProfileError};
use futures::future::try_join_all;
use tracing::instrument;
use validator::Validate;

impl AuthService {
    /// Register a new account and return its first token pair.
    ///
    /// Every failure is logged here and returned with its message intact.
    #[instrument(skip(self, request), fields(email = %request.email, username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ProfileError> {
        let result = self.try_register(request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("registrations_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(_) => tracing::info!("Registration completed"),
            Err(e) => tracing::error!(error = %e, kind = e.kind(), "Registration failed"),
        }
        result
    }

    async fn try_register(&self, request: &RegisterRequest) -> Result<AuthResponse, ProfileError> {
        request.validate()?;
        if request.password != request.confirm_password {
            return Err(ProfileError::Validation(
                "Password and confirm password do not match".to_string(),
            ));
        }
        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(ProfileError::Conflict("User already exists".to_string()));
        }

        let clients = self.resolve_group_clients().await?;

        let mut profile = Profile::new();
        let account = NewAccount {
            profile_id: profile.id.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            password: request.password.clone(),
            clients: clients.clone(),
        };
        let user_id = self.identity.create_user(&account).await?;

        try_join_all(
            self.default_groups
                .iter()
                .map(|group_id| self.identity.add_user_to_group(&user_id, group_id)),
        )
        .await?;
        tracing::debug!(user_id = %user_id, groups = ?self.default_groups, "Enrolled account into default groups");

        let roles = self.discover_roles(&user_id).await?;

        profile.first_name = request.first_name.clone();
        profile.last_name = request.last_name.clone();
        profile.email = request.email.clone();
        profile.username = request.username.clone();
        profile.groups = self.default_groups.clone();
        profile.clients = clients;
        profile.kid = user_id;
        profile.roles = roles;
        self.store.insert(&profile).await?;
        tracing::info!(profile_id = %profile.id, kid = %profile.kid, "Stored profile");

        self.identity
            .password_grant(&request.username, &request.password)
            .await?
            .into_auth_response()
    }

    /// Client ids granted by the default groups, deduplicated in first-seen order.
    ///
    /// Lookups run concurrently; the first failure cancels the rest.
    async fn resolve_group_clients(&self) -> Result<Vec<String>, ProfileError> {
        let lookups = self.default_groups.iter().map(|group_id| async move {
            let group = self.identity.find_group(group_id).await?.ok_or_else(|| {
                ProfileError::Upstream(format!("Group {} not found", group_id))
            })?;
            group.client_ids()
        });

        let per_group = try_join_all(lookups).await?;
        Ok(fold_unique(per_group))
    }

    /// One role per (group, client, role) the provider returns, in its order.
    async fn discover_roles(&self, user_id: &str) -> Result<Vec<ProfileRole>, ProfileError> {
        let mut roles = Vec::new();
        for group in self.identity.list_user_groups(user_id).await? {
            let mappings = self.identity.list_group_role_mappings(&group.id).await?;
            for (client_id, mapping) in mappings.client_mappings {
                roles.extend(mapping.mappings.into_iter().map(|role| ProfileRole {
                    id: role.id,
                    title: role.name,
                    client_id: client_id.clone(),
                }));
            }
        }
        Ok(roles)
    }
}

fn fold_unique(per_group: Vec<Vec<String>>) -> Vec<String> {
    per_group
        .into_iter()
        .flatten()
        .fold(Vec::new(), |mut clients, client| {
            if !clients.contains(&client) {
                clients.push(client);
            }
            clients
        })
}
