use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::errors::{ApiError, ApiResult};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// Constant-time check against a PHC hash. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Constant-time comparison of two shared secrets. Both sides are hashed
/// first so the length of `expected` does not leak either.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented.ct_eq(&expected).into()
}

pub fn parse_uuid(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidInput("Invalid id".to_string()))
}

/// Plain text only: every tag is stripped.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(HashSet::new())
        .clean(text)
        .to_string()
}

/// Post bodies keep ammonia's safe tag set; scripts and handlers are dropped.
pub fn sanitize_rich_text(text: &str) -> String {
    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(text)
        .to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Trimmed, sanitized, non-empty text. The length limit applies to what the
/// caller typed, not to the escaped output.
pub fn require_text(field: &str, raw: &str, max: usize, rich: bool) -> ApiResult<String> {
    let trimmed = raw.trim();
    let cleaned = if rich {
        sanitize_rich_text(trimmed)
    } else {
        sanitize_text(trimmed)
    };
    if cleaned.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::InvalidInput(format!(
            "{} too long (max {} chars)",
            field, max
        )));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_limit_counts_typed_characters() {
        let ampersands = "&".repeat(10);
        let stored = require_text("Comment", &ampersands, 10, false).unwrap();
        assert_eq!(stored, "&amp;".repeat(10));
        assert!(require_text("Comment", &"&".repeat(11), 10, false).is_err());
        assert!(require_text("Comment", "  <b></b>  ", 10, false).is_err());
    }

    #[test]
    fn secrets_match_only_on_equal_input() {
        assert!(secrets_match("front-door-key", "front-door-key"));
        assert!(!secrets_match("front-door-ke", "front-door-key"));
        assert!(!secrets_match("", "front-door-key"));
    }
}
