use crate::models::{Profile, ProfileRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Profile as returned by `GET /user/get-info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub kid: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub clients: Vec<String>,
    pub roles: Vec<ProfileRole>,
    pub groups: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            kid: profile.kid,
            email: profile.email,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            clients: profile.clients,
            roles: profile.roles,
            groups: profile.groups,
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}
