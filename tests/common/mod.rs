#![allow(dead_code)]

use agora::auth::TokenService;
use agora::core::db::Store;
use agora::credentials::register;
use agora::models::models::Account;

pub const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

pub fn store() -> Store {
    Store::new()
}

pub fn tokens() -> TokenService {
    TokenService::new(SECRET.as_bytes())
}

/// Registers `name` with email `name@example.com` and password `pw-name`.
pub fn user(store: &Store, name: &str) -> Account {
    register(store, name, &format!("{}@example.com", name), &format!("pw-{}", name))
        .expect("register test user")
}
