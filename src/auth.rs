//! Bearer session tokens.
//!
//! Tokens are HS256 JWTs carrying the account id, issue time, expiry and a
//! unique `jti`. Verification is signature + clock + one revocation lookup;
//! it never touches the account store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::errors::{ApiError, ApiResult};
use crate::models::models::{AccountId, Claims, Session};

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Process-wide signing state. Built once at startup and shared; only the
/// revocation set is mutable.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// jti -> expiry (unix seconds). Entries past expiry are pruned lazily.
    revoked: DashMap<Uuid, i64>,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        // Expiry is checked by `verify` with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            revoked: DashMap::new(),
        }
    }

    pub fn issue(&self, account_id: AccountId, ttl: Duration) -> ApiResult<Session> {
        if ttl < Duration::zero() {
            return Err(ApiError::InvalidInput("Token lifetime cannot be negative".to_string()));
        }

        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| ApiError::InvalidInput("Token lifetime is out of range".to_string()))?;
        let claims = Claims {
            sub: account_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

        debug!(account_id = %account_id, jti = %claims.jti, "token issued");
        Ok(Session {
            token,
            account_id,
            expires_at: to_datetime(claims.exp),
        })
    }

    pub fn verify(&self, token: &str) -> ApiResult<AccountId> {
        let claims = self.decode_claims(token)?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(ApiError::Expired);
        }
        if self.revoked.contains_key(&claims.jti) {
            return Err(ApiError::Revoked);
        }

        Ok(claims.sub)
    }

    /// Revokes a token that carries a valid signature. Expired tokens are
    /// accepted and ignored: they can no longer be used anyway.
    pub fn revoke(&self, token: &str) -> ApiResult<()> {
        let claims = self.decode_claims(token)?;
        self.prune_expired();

        if Utc::now().timestamp() < claims.exp {
            self.revoked.insert(claims.jti, claims.exp);
            info!(account_id = %claims.sub, jti = %claims.jti, "token revoked");
        }
        Ok(())
    }

    pub fn prune_expired(&self) {
        let now = Utc::now().timestamp();
        self.revoked.retain(|_, exp| *exp > now);
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    fn decode_claims(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                ApiError::Malformed
            })
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: Option<&str>) -> ApiResult<&str> {
    let header = header.ok_or(ApiError::Unauthorized)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::Unauthorized),
    }
}

fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
