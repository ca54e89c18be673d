use anyhow::{bail, Context, Result};
use std::env;
use uuid::Uuid;

// === Limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LOCATION_LENGTH: usize = 100;
pub const MAX_WEBSITE_LENGTH: usize = 200;
pub const MAX_SEARCH_RESULTS: usize = 20;
pub const POSTS_PER_PAGE: usize = 20;

pub const MIN_JWT_SECRET_LENGTH: usize = 32;
pub const MAX_TOKEN_EXPIRATION_HOURS: i64 = 168;
pub const MAX_FEDERATED_TOKEN_DAYS: i64 = 90;

// === Storage keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub fn user_key(id: &Uuid) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &Uuid) -> String {
    format!("post:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username.to_lowercase())
}

pub fn email_key(normalized_email: &str) -> String {
    format!("email:{}", normalized_email)
}

pub fn federated_key(provider: &str, provider_id: &str) -> String {
    format!("federated:{}:{}", provider.to_lowercase(), provider_id)
}

// === Runtime settings ===

/// Process settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_expiration_hours: i64,
    pub federated_token_days: i64,
    pub federation_key: Option<String>,
    pub log_json: bool,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("AGORA_JWT_SECRET").context("AGORA_JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            bail!(
                "AGORA_JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let token_expiration_hours = bounded(
            "AGORA_TOKEN_EXPIRATION_HOURS",
            env::var("AGORA_TOKEN_EXPIRATION_HOURS").ok(),
            24,
            MAX_TOKEN_EXPIRATION_HOURS,
        )?;
        let federated_token_days = bounded(
            "AGORA_FEDERATED_TOKEN_DAYS",
            env::var("AGORA_FEDERATED_TOKEN_DAYS").ok(),
            7,
            MAX_FEDERATED_TOKEN_DAYS,
        )?;

        Ok(Self {
            bind_addr: env::var("AGORA_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret,
            token_expiration_hours,
            federated_token_days,
            federation_key: env::var("AGORA_FEDERATION_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            log_json: env_flag("AGORA_LOG_JSON"),
            seed_demo: env_flag("AGORA_SEED_DEMO"),
        })
    }

    /// Settings for tests and embedded use; no environment access.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: jwt_secret.into(),
            token_expiration_hours: 24,
            federated_token_days: 7,
            federation_key: None,
            log_json: false,
            seed_demo: false,
        }
    }

    pub fn password_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_expiration_hours)
    }

    pub fn federated_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.federated_token_days)
    }
}

/// Integer setting in `1..=max`, `default` when unset.
fn bounded(name: &str, raw: Option<String>, default: i64, max: i64) -> Result<i64> {
    let value = match raw {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid {}", name))?,
        None => default,
    };
    if !(1..=max).contains(&value) {
        bail!("{} must be between 1 and {}", name, max);
    }
    Ok(value)
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
