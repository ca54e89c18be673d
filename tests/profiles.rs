mod common;

use agora::core::errors::ApiError;
use agora::core::seed::init_demo_data;
use agora::follow::edge_state;
use agora::follow::EdgeState;
use agora::models::models::{Theme, Visibility};
use agora::posts::list_feed;
use agora::users::{
    find_by_username, get_profile, profile_view, search, update_profile, ProfileUpdate,
};
use common::{store, user};

#[test]
fn partial_update_touches_only_given_fields() {
    let store = store();
    let alice = user(&store, "alice");

    update_profile(
        &store,
        &alice.id,
        ProfileUpdate {
            bio: Some("hello".to_string()),
            location: Some("Oslo".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let updated = update_profile(
        &store,
        &alice.id,
        ProfileUpdate {
            theme: Some(Theme::Dark),
            location: Some(String::new()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(updated.profile.bio.as_deref(), Some("hello"));
    assert_eq!(updated.profile.location, None);
    assert_eq!(updated.profile.theme, Theme::Dark);
    assert_eq!(updated.profile.visibility, Visibility::Public);
    assert_eq!(updated.username, "alice");
    assert_eq!(updated.email, alice.email);
}

#[test]
fn unknown_update_fields_are_ignored() {
    let store = store();
    let alice = user(&store, "alice");

    let update: ProfileUpdate = serde_json::from_value(serde_json::json!({
        "bio": "<i>plain</i> text",
        "followers": ["00000000-0000-0000-0000-000000000000"],
        "credential": {"method": "local_password", "hash": "x"},
        "email": "evil@x.com"
    }))
    .unwrap();
    let updated = update_profile(&store, &alice.id, update).unwrap();

    assert_eq!(updated.profile.bio.as_deref(), Some("plain text"));
    assert!(updated.followers.is_empty());
    assert_eq!(updated.email, "alice@example.com");
    assert_eq!(updated.credential, alice.credential);
}

#[test]
fn rename_moves_username_index() {
    let store = store();
    let alice = user(&store, "alice");
    user(&store, "bob");

    let err = update_profile(
        &store,
        &alice.id,
        ProfileUpdate {
            username: Some("BOB".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(get_profile(&store, &alice.id).unwrap().username, "alice");

    update_profile(
        &store,
        &alice.id,
        ProfileUpdate {
            username: Some("alicia".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(find_by_username(&store, "alice").unwrap().is_none());
    assert_eq!(find_by_username(&store, "Alicia").unwrap().unwrap().id, alice.id);
}

#[test]
fn overlong_bio_is_rejected() {
    let store = store();
    let alice = user(&store, "alice");

    let err = update_profile(
        &store,
        &alice.id,
        ProfileUpdate {
            bio: Some("b".repeat(501)),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn search_matches_substrings_without_private_fields() {
    let store = store();
    user(&store, "alice");
    user(&store, "malice");
    user(&store, "bob");

    let names: Vec<String> = search(&store, "LIC", 10)
        .unwrap()
        .into_iter()
        .map(|p| p.username)
        .collect();
    assert_eq!(names, vec!["alice", "malice"]);

    assert_eq!(search(&store, "lic", 1).unwrap().len(), 1);
    assert!(search(&store, "  ", 10).unwrap().is_empty());

    let json = serde_json::to_value(&search(&store, "bob", 10).unwrap()[0]).unwrap();
    assert!(json.get("email").is_none());
    assert!(json.get("credential").is_none());
}

#[test]
fn profile_view_resolves_follow_sets() {
    let store = store();
    let alice = user(&store, "alice");
    let bob = user(&store, "bob");
    agora::follow::follow_user(&store, &bob.id, &alice.id).unwrap();

    let alice = get_profile(&store, &alice.id).unwrap();
    let view = profile_view(&store, &alice).unwrap();
    assert_eq!(view.followers.len(), 1);
    assert_eq!(view.followers[0].username, "bob");
    assert!(view.following.is_empty());
    assert!(!view.is_federated);
}

#[test]
fn demo_seed_is_idempotent() {
    let store = store();
    init_demo_data(&store).unwrap();
    init_demo_data(&store).unwrap();

    let test = find_by_username(&store, "test").unwrap().unwrap();
    let bob = find_by_username(&store, "bob").unwrap().unwrap();
    assert_eq!(edge_state(&store, &test.id, &bob.id).unwrap(), EdgeState::Present);
    assert_eq!(list_feed(&store).unwrap().len(), 4);
}
