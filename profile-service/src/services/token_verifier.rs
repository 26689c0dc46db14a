use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims of a realm access token issued by Keycloak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Provider account id
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
    /// Client the token was issued to
    #[serde(default)]
    pub azp: Option<String>,
    /// Local profile id, mapped from the account attribute
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub realm_access: RoleSet,
    #[serde(default)]
    pub resource_access: HashMap<String, RoleSet>,
}

impl IdentityClaims {
    pub fn has_client_role(&self, client_id: &str, role: &str) -> bool {
        self.resource_access
            .get(client_id)
            .map(|access| access.roles.iter().any(|r| r == role))
            .unwrap_or(false)
    }
}

/// Verifies RS256 access tokens against the realm public key.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(public_key_path: &str, issuer: &str) -> Result<Self, anyhow::Error> {
        let public_key_pem = fs::read_to_string(public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read realm public key from {}: {}",
                public_key_path,
                e
            )
        })?;
        let verifier = Self::from_pem(public_key_pem.as_bytes(), issuer)?;
        tracing::info!(issuer = %issuer, "Token verifier initialized with realm RS256 key");
        Ok(verifier)
    }

    pub fn from_pem(public_key_pem: &[u8], issuer: &str) -> Result<Self, anyhow::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| anyhow::anyhow!("Failed to parse realm public key: {}", e))?;
        Ok(Self {
            decoding_key,
            issuer: issuer.to_string(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<IdentityClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        // Realm tokens carry `account` or a client list as audience
        validation.validate_aud = false;
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}
