use crate::models::Profile;
use crate::services::ProfileError;
use async_trait::async_trait;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use std::sync::Mutex;

const DUPLICATE_KEY: i32 = 11000;

/// Keyed access to the local profile cache.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProfileError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, ProfileError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, ProfileError>;
    /// Insert a new profile; a duplicate email or username is a `Conflict`.
    async fn insert(&self, profile: &Profile) -> Result<(), ProfileError>;
    async fn health_check(&self) -> Result<(), ProfileError>;
}

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ProfileError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            ProfileError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    /// Unique indexes on `email` and `username` back the uniqueness invariant.
    pub async fn initialize_indexes(&self) -> Result<(), ProfileError> {
        tracing::info!("Creating MongoDB indexes for profile-service");

        for field in ["email", "username"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_unique", field))
                        .unique(true)
                        .build(),
                )
                .build();

            self.users().create_index(index, None).await.map_err(|e| {
                tracing::error!("Failed to create {} index on users collection: {}", field, e);
                ProfileError::from(e)
            })?;
            tracing::info!("Created unique index on users.{}", field);
        }

        Ok(())
    }

    pub fn users(&self) -> Collection<Profile> {
        self.db.collection("users")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl ProfileStore for MongoDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self
            .users()
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert(&self, profile: &Profile) -> Result<(), ProfileError> {
        match self.users().insert_one(profile, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(ProfileError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> Result<(), ProfileError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                ProfileError::from(e)
            })?;
        Ok(())
    }
}

/// In-memory store with the same uniqueness rules as the MongoDB indexes.
#[derive(Default)]
pub struct MockProfileStore {
    pub profiles: Mutex<Vec<Profile>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }

    pub fn snapshot(&self) -> Vec<Profile> {
        self.profiles
            .lock()
            .map(|profiles| profiles.clone())
            .unwrap_or_default()
    }

    fn find<F>(&self, predicate: F) -> Result<Option<Profile>, ProfileError>
    where
        F: Fn(&Profile) -> bool,
    {
        let profiles = self
            .profiles
            .lock()
            .map_err(|e| ProfileError::Upstream(format!("Mock store mutex poisoned: {}", e)))?;
        Ok(profiles.iter().find(|p| predicate(p)).cloned())
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, ProfileError> {
        self.find(|p| p.email == email)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, ProfileError> {
        self.find(|p| p.username == username)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, ProfileError> {
        self.find(|p| p.id == id)
    }

    async fn insert(&self, profile: &Profile) -> Result<(), ProfileError> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|e| ProfileError::Upstream(format!("Mock store mutex poisoned: {}", e)))?;

        let duplicate = profiles.iter().any(|p| {
            p.id == profile.id || p.email == profile.email || p.username == profile.username
        });
        if duplicate {
            return Err(ProfileError::Conflict("User already exists".to_string()));
        }

        profiles.push(profile.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ProfileError> {
        Ok(())
    }
}
