mod common;

use std::sync::Arc;

use agora::core::errors::ApiError;
use agora::credentials::{
    change_password, login, login_federated, register, register_federated, verify_password,
    FederatedIdentity,
};
use agora::models::models::Credential;
use agora::users::get_profile;
use chrono::Duration;
use common::{store, tokens, user};

fn google(id: &str, email: &str, name: &str) -> FederatedIdentity {
    FederatedIdentity {
        provider: "google".to_string(),
        provider_id: id.to_string(),
        email: email.to_string(),
        display_name: name.to_string(),
    }
}

#[test]
fn register_hashes_password() {
    let store = store();
    let account = register(&store, "alice", "Alice@X.com", "pw1").unwrap();

    assert_eq!(account.email, "alice@x.com");
    match &account.credential {
        Credential::LocalPassword { hash } => {
            assert_ne!(hash, "pw1");
            assert!(hash.starts_with("$argon2"));
        }
        other => panic!("unexpected credential {:?}", other),
    }
    assert!(verify_password(&account, "pw1"));
    assert!(!verify_password(&account, "pw2"));
    assert!(account.followers.is_empty() && account.following.is_empty());
}

#[test]
fn duplicate_email_conflicts_case_insensitively() {
    let store = store();
    register(&store, "alice", "a@x.com", "pw1").unwrap();

    let err = register(&store, "alice2", "A@X.COM", "pw1").unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
}

#[test]
fn duplicate_username_conflicts() {
    let store = store();
    register(&store, "alice", "a@x.com", "pw1").unwrap();

    let err = register(&store, "alice", "other@x.com", "pw1").unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
    let err = register(&store, "ALICE", "third@x.com", "pw1").unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
}

#[test]
fn register_rejects_missing_fields() {
    let store = store();
    for (username, email, password) in [
        ("", "a@x.com", "pw1"),
        ("alice", "", "pw1"),
        ("alice", "a@x.com", ""),
        ("alice", "not-an-email", "pw1"),
        ("a b", "a@x.com", "pw1"),
        ("<b>bold</b>", "a@x.com", "pw1"),
    ] {
        let err = register(&store, username, email, password).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);
    }
}

#[test]
fn login_by_email_or_username() {
    let store = store();
    let tokens = tokens();
    let alice = user(&store, "alice");

    let by_email = login(&store, &tokens, Duration::hours(1), "ALICE@example.com", "pw-alice").unwrap();
    assert_eq!(by_email.account_id, alice.id);
    assert_eq!(tokens.verify(&by_email.token).unwrap(), alice.id);

    let by_name = login(&store, &tokens, Duration::hours(1), "alice", "pw-alice").unwrap();
    assert_eq!(by_name.account_id, alice.id);
}

#[test]
fn login_failures() {
    let store = store();
    let tokens = tokens();
    user(&store, "alice");

    let wrong = login(&store, &tokens, Duration::hours(1), "alice", "nope").unwrap_err();
    assert!(matches!(wrong, ApiError::InvalidCredentials));

    let unknown = login(&store, &tokens, Duration::hours(1), "nobody", "pw").unwrap_err();
    assert!(matches!(unknown, ApiError::InvalidCredentials));

    let empty = login(&store, &tokens, Duration::hours(1), "", "pw").unwrap_err();
    assert!(matches!(empty, ApiError::InvalidInput(_)));
}

#[test]
fn federated_account_is_created_once() {
    let store = store();
    let first = register_federated(&store, &google("g-1", "Fed@x.com", "Fed User")).unwrap();
    let second = register_federated(&store, &google("g-1", "fed@x.com", "Fed User")).unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.is_federated());
    assert_eq!(first.username, "fed_user");
    assert_eq!(first.email, "fed@x.com");
}

#[test]
fn federated_account_rejects_password_login() {
    let store = store();
    let tokens = tokens();
    let account = register_federated(&store, &google("g-2", "fed@x.com", "fed")).unwrap();

    assert!(!verify_password(&account, ""));
    assert!(!verify_password(&account, "anything"));

    let err = login(&store, &tokens, Duration::hours(1), "fed@x.com", "anything").unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedMethod));

    let err = change_password(&store, &account.id, "x", "newpass").unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedMethod));
}

#[test]
fn federated_email_taken_by_local_account_conflicts() {
    let store = store();
    user(&store, "alice");

    let err = register_federated(&store, &google("g-3", "alice@example.com", "Alice")).unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn federated_usernames_stay_unique() {
    let store = store();
    user(&store, "alice");

    let fed = register_federated(&store, &google("g-4", "other@x.com", "Alice")).unwrap();
    assert_ne!(fed.username, "alice");
    assert!(fed.username.starts_with("alice_"));
}

#[test]
fn federated_login_issues_long_session() {
    let store = store();
    let tokens = tokens();
    let session = login_federated(&store, &tokens, Duration::days(7), &google("g-5", "f@x.com", "F")).unwrap();

    assert_eq!(tokens.verify(&session.token).unwrap(), session.account_id);
    assert!(session.expires_at > chrono::Utc::now() + Duration::days(6));
}

#[test]
fn change_password_replaces_hash() {
    let store = store();
    let tokens = tokens();
    let alice = user(&store, "alice");

    let err = change_password(&store, &alice.id, "wrong", "fresh-pw").unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));

    change_password(&store, &alice.id, "pw-alice", "fresh-pw").unwrap();
    let updated = get_profile(&store, &alice.id).unwrap();
    assert!(verify_password(&updated, "fresh-pw"));
    assert!(login(&store, &tokens, Duration::hours(1), "alice", "pw-alice").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_password_changes_have_one_winner() {
    let store = Arc::new(store());
    let alice = user(&store, "alice");

    let mut handles = Vec::new();
    for i in 0..4 {
        let store = store.clone();
        let id = alice.id;
        handles.push(tokio::task::spawn_blocking(move || {
            change_password(&store, &id, "pw-alice", &format!("new-pw-{}", i)).map(|_| i)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(i) => winners.push(i),
            Err(ApiError::InvalidCredentials) => {}
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }
    assert_eq!(winners.len(), 1);

    let updated = get_profile(&store, &alice.id).unwrap();
    assert!(verify_password(&updated, &format!("new-pw-{}", winners[0])));
    assert!(!verify_password(&updated, "pw-alice"));
}
