//! Business logic of profile-service.
//!
//! The provider and the store sit behind traits so the flows run against
//! in-memory doubles in tests.

mod auth;
mod database;
pub mod error;
pub mod identity;
mod registration;
mod token_verifier;

pub use auth::AuthService;
pub use database::{MockProfileStore, MongoDb, ProfileStore};
pub use error::ProfileError;
pub use identity::{
    GroupRepresentation, IdentityCall, IdentityProvider, KeycloakClient, MockIdentityProvider,
    NewAccount, RoleMappings, TokenGrant,
};
pub use token_verifier::{IdentityClaims, RoleSet, TokenVerifier};
