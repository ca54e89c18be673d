mod common;

use std::sync::Arc;

use agora::auth::{bearer_token, TokenService};
use agora::core::errors::ApiError;
use chrono::Duration;
use common::tokens;
use uuid::Uuid;

#[test]
fn issued_token_verifies_to_account() {
    let tokens = tokens();
    let account = Uuid::new_v4();

    let session = tokens.issue(account, Duration::hours(1)).unwrap();
    assert_eq!(session.account_id, account);
    assert_eq!(tokens.verify(&session.token).unwrap(), account);
}

#[test]
fn zero_ttl_is_immediately_expired() {
    let tokens = tokens();
    let session = tokens.issue(Uuid::new_v4(), Duration::zero()).unwrap();

    assert!(matches!(tokens.verify(&session.token), Err(ApiError::Expired)));
}

#[test]
fn negative_ttl_is_rejected() {
    let tokens = tokens();
    let err = tokens.issue(Uuid::new_v4(), Duration::seconds(-5)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn out_of_range_ttl_is_rejected() {
    let tokens = tokens();
    let err = tokens
        .issue(Uuid::new_v4(), Duration::days(100_000_000))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn tampered_or_foreign_tokens_are_malformed() {
    let tokens = tokens();
    let session = tokens.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

    // Another account's claims under this token's signature.
    let forged_claims = tokens.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
    let parts: Vec<&str> = session.token.split('.').collect();
    let other_parts: Vec<&str> = forged_claims.token.split('.').collect();
    let tampered = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
    assert!(matches!(tokens.verify(&tampered), Err(ApiError::Malformed)));

    assert!(matches!(tokens.verify("not-a-token"), Err(ApiError::Malformed)));

    let other = TokenService::new(b"a-completely-different-signing-secret!!");
    let foreign = other.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
    assert!(matches!(tokens.verify(&foreign.token), Err(ApiError::Malformed)));
}

#[test]
fn tokens_are_independent_until_revoked() {
    let tokens = tokens();
    let account = Uuid::new_v4();
    let first = tokens.issue(account, Duration::hours(1)).unwrap();
    let second = tokens.issue(account, Duration::hours(1)).unwrap();

    tokens.revoke(&first.token).unwrap();

    assert!(matches!(tokens.verify(&first.token), Err(ApiError::Revoked)));
    assert_eq!(tokens.verify(&second.token).unwrap(), account);
    assert_eq!(tokens.revoked_count(), 1);
}

#[test]
fn revoking_expired_token_keeps_set_empty() {
    let tokens = tokens();
    let expired = tokens.issue(Uuid::new_v4(), Duration::zero()).unwrap();

    tokens.revoke(&expired.token).unwrap();
    assert_eq!(tokens.revoked_count(), 0);
    assert!(matches!(tokens.revoke("garbage"), Err(ApiError::Malformed)));
}

#[test]
fn bearer_header_parsing() {
    assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
    assert!(matches!(bearer_token(None), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(Some("Basic xyz")), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(Some("Bearer ")), Err(ApiError::Unauthorized)));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_revoke_and_verify() {
    let tokens = Arc::new(tokens());
    let sessions: Vec<_> = (0..32)
        .map(|_| tokens.issue(Uuid::new_v4(), Duration::hours(1)).unwrap())
        .collect();

    let mut handles = Vec::new();
    for (i, session) in sessions.iter().cloned().enumerate() {
        let tokens = tokens.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            if i % 2 == 0 {
                tokens.revoke(&session.token).unwrap();
            }
            tokens.verify(&session.token).is_ok()
        }));
    }

    let mut valid = 0;
    for handle in handles {
        if handle.await.unwrap() {
            valid += 1;
        }
    }
    assert_eq!(valid, 16);
    assert_eq!(tokens.revoked_count(), 16);
}
