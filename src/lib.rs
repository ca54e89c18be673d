//! Identity and social-graph backend.
//!
//! Accounts (local password or federated), bearer session tokens, a directed
//! follow graph and a chronological feed with likes and comments. Every
//! mutation runs as one [`core::db::Store`] transaction.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod engagement;
pub mod follow;
pub mod handlers;
pub mod posts;
pub mod users;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod query_params;
    pub mod seed;
}

pub mod models {
    #[allow(clippy::module_inception)]
    pub mod models;
}

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::core::db::Store;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let tokens = TokenService::new(config.jwt_secret.as_bytes());
        Self {
            store: Arc::new(Store::new()),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }
}
