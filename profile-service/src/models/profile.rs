//! Local profile document, a denormalized mirror of identity-provider state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A client-scoped role grant discovered through the account's groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProfileRole {
    pub id: String,
    pub title: String,
    pub client_id: String,
}

/// Stored in the `users` collection.
///
/// `id` is chosen by the registration flow before the provider account exists,
/// and `kid` is the provider's account id, written once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub kid: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub roles: Vec<ProfileRole>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh, not yet persisted profile with a newly generated id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kid: String::new(),
            email: String::new(),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            clients: Vec::new(),
            roles: Vec::new(),
            groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
