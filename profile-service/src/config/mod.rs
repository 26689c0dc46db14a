use serde::Deserialize;
use service_core::config::{self as core_config, get_env, parse_env};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: String,
    pub mongodb: MongoConfig,
    pub keycloak: KeycloakConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub swagger_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

/// Connection settings for the identity provider.
///
/// End-user grants go to `host`/`realm` with the confidential `client_id`;
/// admin calls authenticate against `admin_realm` and then operate on `realm`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    pub host: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub default_groups: Vec<String>,
    pub admin_host: String,
    pub admin_realm: String,
    pub admin_client_id: String,
    pub admin_username: String,
    pub admin_password: String,
    pub public_key_path: String,
}

impl KeycloakConfig {
    /// Expected `iss` claim of realm access tokens.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.host.trim_end_matches('/'), self.realm)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub register_attempts: u32,
    pub register_window_seconds: u64,
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

impl ProfileConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env and the APP__ prefix
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(AppError::ConfigError)?;
        let is_prod = environment == Environment::Prod;

        let host = get_env("KEYCLOAK_HOST", None, is_prod)?;
        let admin_host = match env::var("KEYCLOAK_ADMIN_HOST") {
            Ok(admin_host) => admin_host,
            Err(_) => host.clone(),
        };

        Ok(ProfileConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("profile-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: get_env("OTLP_ENDPOINT", Some("http://tempo:4317"), is_prod)?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("profile_db"), is_prod)?,
            },
            keycloak: KeycloakConfig {
                host,
                realm: get_env("KEYCLOAK_REALM", None, is_prod)?,
                client_id: get_env("KEYCLOAK_CLIENT_ID", None, is_prod)?,
                client_secret: get_env("KEYCLOAK_SECRET", None, is_prod)?,
                default_groups: split_list(&get_env("KEYCLOAK_DEFAULT_GROUP_ID", None, is_prod)?),
                admin_host,
                admin_realm: get_env("KEYCLOAK_ADMIN_REALM", Some("master"), is_prod)?,
                admin_client_id: get_env("KEYCLOAK_ADMIN_CLIENT_ID", Some("admin-cli"), is_prod)?,
                admin_username: get_env("KEYCLOAK_ADMIN_USERNAME", None, is_prod)?,
                admin_password: get_env("KEYCLOAK_ADMIN_PASSWORD", None, is_prod)?,
                public_key_path: get_env("KEYCLOAK_PUBLIC_KEY_PATH", None, is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: split_list(&get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?),
            },
            rate_limit: RateLimitConfig {
                register_attempts: parse_env(
                    "RATE_LIMIT_REGISTER_ATTEMPTS",
                    &get_env("RATE_LIMIT_REGISTER_ATTEMPTS", Some("5"), is_prod)?,
                )?,
                register_window_seconds: parse_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    &get_env("RATE_LIMIT_REGISTER_WINDOW_SECONDS", Some("60"), is_prod)?,
                )?,
                login_attempts: parse_env(
                    "RATE_LIMIT_LOGIN_ATTEMPTS",
                    &get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("10"), is_prod)?,
                )?,
                login_window_seconds: parse_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    &get_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", Some("60"), is_prod)?,
                )?,
            },
            swagger_enabled: parse_env(
                "ENABLE_SWAGGER",
                &get_env("ENABLE_SWAGGER", Some("true"), is_prod)?,
            )?,
        })
    }
}

/// Comma separated list, blanks and repeats dropped, first-seen order kept.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .fold(Vec::new(), |mut items, item| {
            if !items.iter().any(|seen: &String| seen == item) {
                items.push(item.to_string());
            }
            items
        })
}
