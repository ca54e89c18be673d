use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub type AccountId = Uuid;
pub type PostId = Uuid;

/// How an account proves who it is. Exactly one per account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Credential {
    LocalPassword { hash: String },
    Federated { provider: String, provider_id: String },
}

impl Credential {
    pub fn is_federated(&self) -> bool {
        matches!(self, Credential::Federated { .. })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub theme: Theme,
    pub visibility: Visibility,
    /// Opaque media reference produced by the upload step.
    pub avatar: Option<String>,
    pub cover: Option<String>,
}

/// Persisted account. Follow sets are only written by `follow`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub credential: Credential,
    pub profile: Profile,
    pub followers: HashSet<AccountId>,
    pub following: HashSet<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_federated(&self) -> bool {
        self.credential.is_federated()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: AccountId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted post. Likes and comments live and die with it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: PostId,
    pub author_id: AccountId,
    pub content: String,
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: HashSet<AccountId>,
    pub comments: Vec<Comment>,
}

/// Signed session claims.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    /// Account id.
    pub sub: AccountId,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, the revocation key.
    pub jti: Uuid,
}

/// Issued session handed back to the caller.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub token: String,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}

// === Read-side projections ===

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRef {
    pub id: AccountId,
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProfileView {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub is_federated: bool,
    pub profile: Profile,
    pub followers: Vec<UserRef>,
    pub following: Vec<UserRef>,
    pub created_at: DateTime<Utc>,
}

/// Search projection: never carries credentials or email.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicProfile {
    pub id: AccountId,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentView {
    pub id: Uuid,
    pub author: Option<UserRef>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostView {
    pub id: PostId,
    pub author: Option<UserRef>,
    pub content: String,
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: usize,
    pub likes: Vec<AccountId>,
    pub comments: Vec<CommentView>,
}
