use tracing::info;

use crate::core::db::Store;
use crate::core::errors::{ApiError, ApiResult};
use crate::credentials::register;
use crate::follow::follow_user;
use crate::models::models::Account;
use crate::posts::create_post;
use crate::users::find_by_username;

const DEMO_ACCOUNTS: &[(&str, &str, &[&str])] = &[
    ("test", "test", &["This is my first post on Agora!"]),
    (
        "alice",
        "alice",
        &[
            "Welcome to my board! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    ),
    (
        "bob",
        "bob",
        &["Hey everyone! Just joined Agora, looking forward to connecting with you all."],
    ),
];

/// Creates the demo accounts, their posts and the `test -> bob` edge. Safe
/// to run on every start: existing accounts are left alone.
pub fn init_demo_data(store: &Store) -> ApiResult<()> {
    let mut created = 0;
    for (username, password, posts) in DEMO_ACCOUNTS {
        if find_by_username(store, username)?.is_some() {
            continue;
        }
        let email = format!("{}@agora.local", username);
        let account = register(store, username, &email, password)?;
        for content in posts.iter() {
            create_post(store, &account.id, content, None)?;
        }
        created += 1;
    }

    let test = demo_account(store, "test")?;
    let bob = demo_account(store, "bob")?;
    match follow_user(store, &test.id, &bob.id) {
        Ok(_) | Err(ApiError::AlreadyFollowing) => {}
        Err(e) => return Err(e),
    }

    info!(created, "demo data ready");
    Ok(())
}

fn demo_account(store: &Store, username: &str) -> ApiResult<Account> {
    find_by_username(store, username)?
        .ok_or_else(|| ApiError::Internal(format!("demo account {} missing", username)))
}
