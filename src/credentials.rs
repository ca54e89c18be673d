//! Account registration and sign-in.
//!
//! Local accounts store an Argon2 PHC hash; federated accounts store only the
//! `(provider, provider_id)` pair. Plaintext passwords are never persisted or
//! logged.

use chrono::Duration;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::TokenService;
use crate::config::*;
use crate::core::db::{Store, Transaction};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{
    hash_password, is_plausible_email, normalize_email, now, sanitize_text,
};
use crate::models::models::{Account, AccountId, Credential, Profile, Session};
use crate::users::{load_account, resolve_identifier};

/// Identity already verified by an external OAuth handshake.
#[derive(Deserialize, Clone, Debug)]
pub struct FederatedIdentity {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub display_name: String,
}

pub fn register(store: &Store, username: &str, email: &str, password: &str) -> ApiResult<Account> {
    let username = validate_username(username)?;
    let email = validate_email(email)?;
    validate_password(password)?;

    let hash = hash_password(password)?;

    let account: Account = store.transaction(|tx| {
        if tx.exists(&username_key(&username)) {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }
        if tx.exists(&email_key(&email)) {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let account = new_account(username.clone(), email.clone(), Credential::LocalPassword { hash });
        insert_account(tx, &account)?;
        Ok(account)
    })?;

    info!(account_id = %account.id, username = %account.username, "account registered");
    Ok(account)
}

/// Returns the account bound to `(provider, provider_id)`, creating it on
/// first sight.
pub fn register_federated(store: &Store, identity: &FederatedIdentity) -> ApiResult<Account> {
    let provider = identity.provider.trim().to_lowercase();
    let provider_id = identity.provider_id.trim().to_string();
    if provider.is_empty() || provider_id.is_empty() {
        return Err(ApiError::InvalidInput("Provider identity is required".to_string()));
    }
    let email = validate_email(&identity.email)?;
    let base_username = username_from_display_name(&identity.display_name);

    store.transaction(|tx| {
        let link_key = federated_key(&provider, &provider_id);
        if let Some(account_id) = tx.get_json::<AccountId>(&link_key)? {
            debug!(account_id = %account_id, provider = %provider, "federated account found");
            return load_account(tx, &account_id);
        }

        if tx.exists(&email_key(&email)) {
            return Err(ApiError::Conflict(
                "Email already registered with another sign-in method".to_string(),
            ));
        }

        let username = unique_username(tx, &base_username);
        let account = new_account(
            username,
            email.clone(),
            Credential::Federated {
                provider: provider.clone(),
                provider_id: provider_id.clone(),
            },
        );
        insert_account(tx, &account)?;
        tx.set_json(&link_key, &account.id)?;

        info!(account_id = %account.id, provider = %provider, "federated account created");
        Ok(account)
    })
}

/// Federated-only accounts never match a local password.
pub fn verify_password(account: &Account, candidate: &str) -> bool {
    match &account.credential {
        Credential::LocalPassword { hash } => crate::core::helpers::verify_password(candidate, hash),
        Credential::Federated { .. } => false,
    }
}

/// Password sign-in by email or username.
pub fn login(
    store: &Store,
    tokens: &TokenService,
    ttl: Duration,
    identifier: &str,
    password: &str,
) -> ApiResult<Session> {
    if identifier.trim().is_empty() || password.is_empty() {
        return Err(ApiError::InvalidInput("Identifier and password are required".to_string()));
    }

    let Some(account) = resolve_identifier(store, identifier)? else {
        // Pay the same Argon2 cost as a wrong password.
        if let Some(hash) = dummy_hash() {
            crate::core::helpers::verify_password(password, hash);
        }
        return Err(ApiError::InvalidCredentials);
    };
    if account.is_federated() {
        return Err(ApiError::UnsupportedMethod);
    }
    if !verify_password(&account, password) {
        info!(account_id = %account.id, "password login failed");
        return Err(ApiError::InvalidCredentials);
    }

    let session = tokens.issue(account.id, ttl)?;
    info!(account_id = %account.id, "password login");
    Ok(session)
}

pub fn login_federated(
    store: &Store,
    tokens: &TokenService,
    ttl: Duration,
    identity: &FederatedIdentity,
) -> ApiResult<Session> {
    let account = register_federated(store, identity)?;
    let session = tokens.issue(account.id, ttl)?;
    info!(account_id = %account.id, "federated login");
    Ok(session)
}

pub fn change_password(
    store: &Store,
    account_id: &AccountId,
    old_password: &str,
    new_password: &str,
) -> ApiResult<()> {
    validate_password(new_password)?;

    let account = crate::users::get_profile(store, account_id)?;
    let verified_hash = match account.credential {
        Credential::LocalPassword { hash } => hash,
        Credential::Federated { .. } => return Err(ApiError::UnsupportedMethod),
    };
    if !crate::core::helpers::verify_password(old_password, &verified_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let hash = hash_password(new_password)?;
    store.transaction(|tx| {
        let mut account = load_account(tx, account_id)?;
        // A concurrent change may have committed since the old password was checked.
        match &account.credential {
            Credential::LocalPassword { hash: current } if *current == verified_hash => {}
            _ => return Err(ApiError::InvalidCredentials),
        }
        account.credential = Credential::LocalPassword { hash };
        tx.set_json(&user_key(account_id), &account)?;
        Ok::<_, ApiError>(())
    })?;

    info!(account_id = %account_id, "password changed");
    Ok(())
}

// === Validation ===

pub(crate) fn validate_username(raw: &str) -> ApiResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }
    let username = sanitize_text(trimmed);
    if username != trimmed || username.chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidInput(
            "Username may not contain spaces or markup".to_string(),
        ));
    }
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ApiError::InvalidInput(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    Ok(username)
}

fn validate_email(raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Err(ApiError::InvalidInput("Email is required".to_string()));
    }
    if !is_plausible_email(&email) {
        return Err(ApiError::InvalidInput("Invalid email address".to_string()));
    }
    Ok(email)
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::InvalidInput("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// === Helpers ===

fn new_account(username: String, email: String, credential: Credential) -> Account {
    Account {
        id: Uuid::new_v4(),
        username,
        email,
        credential,
        profile: Profile::default(),
        followers: HashSet::new(),
        following: HashSet::new(),
        created_at: now(),
    }
}

fn insert_account(tx: &mut Transaction<'_>, account: &Account) -> ApiResult<()> {
    tx.set_json(&user_key(&account.id), account)?;
    tx.set_json(&username_key(&account.username), &account.id)?;
    tx.set_json(&email_key(&account.email), &account.id)?;

    let mut users: Vec<AccountId> = tx.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(account.id);
    tx.set_json(USERS_LIST_KEY, &users)?;
    Ok(())
}

fn username_from_display_name(display_name: &str) -> String {
    let mut base: String = display_name
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => Some(c),
            ' ' | '-' | '.' => Some('_'),
            _ => None,
        })
        .take(MAX_USERNAME_LENGTH - 5)
        .collect();
    while base.chars().count() < MIN_USERNAME_LENGTH {
        base.push_str("user");
    }
    base
}

/// Hash checked against when no account matches, so a miss costs as much as
/// a wrong password.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("agora-login-placeholder").ok())
        .as_deref()
}

fn unique_username(tx: &Transaction<'_>, base: &str) -> String {
    if !tx.exists(&username_key(base)) {
        return base.to_string();
    }
    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("{}_{:04}", base, rng.gen_range(0..10_000));
        if !tx.exists(&username_key(&candidate)) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = dummy_hash().expect("dummy hash");
        assert!(hash.starts_with("$argon2"));
        assert!(!crate::core::helpers::verify_password("", hash));
        assert!(std::ptr::eq(hash, dummy_hash().unwrap()));
    }
}
