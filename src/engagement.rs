//! Likes and comments on posts.
//!
//! Each call is one read-modify-write of a single post inside a store
//! transaction, so racing likes by the same account have exactly one winner.

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::*;
use crate::core::db::{Store, Transaction};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{now, require_text};
use crate::models::models::{AccountId, Comment, Post, PostId};

pub fn like_post(store: &Store, post_id: &PostId, account_id: &AccountId) -> ApiResult<Post> {
    let result: ApiResult<Post> = store.transaction(|tx| {
        let mut post = load_post(tx, post_id)?;
        require_account(tx, account_id)?;

        if !post.likes.insert(*account_id) {
            return Err(ApiError::AlreadyLiked);
        }
        tx.set_json(&post_key(post_id), &post)?;
        Ok(post)
    });

    match &result {
        Ok(post) => info!(post_id = %post_id, account_id = %account_id, likes = post.likes.len(), "post liked"),
        Err(e) => debug!(post_id = %post_id, account_id = %account_id, error = %e, "like rejected"),
    }
    result
}

pub fn unlike_post(store: &Store, post_id: &PostId, account_id: &AccountId) -> ApiResult<Post> {
    let result: ApiResult<Post> = store.transaction(|tx| {
        let mut post = load_post(tx, post_id)?;

        if !post.likes.remove(account_id) {
            return Err(ApiError::NotLiked);
        }
        tx.set_json(&post_key(post_id), &post)?;
        Ok(post)
    });

    match &result {
        Ok(post) => info!(post_id = %post_id, account_id = %account_id, likes = post.likes.len(), "post unliked"),
        Err(e) => debug!(post_id = %post_id, account_id = %account_id, error = %e, "unlike rejected"),
    }
    result
}

/// Appends a comment and returns the post's full comment log.
pub fn add_comment(
    store: &Store,
    post_id: &PostId,
    account_id: &AccountId,
    text: &str,
) -> ApiResult<Vec<Comment>> {
    let text = require_text("Comment", text, MAX_COMMENT_LENGTH, false)?;

    let comments: Vec<Comment> = store.transaction(|tx| {
        let mut post = load_post(tx, post_id)?;
        require_account(tx, account_id)?;

        post.comments.push(Comment {
            id: Uuid::new_v4(),
            author_id: *account_id,
            text,
            created_at: now(),
        });
        tx.set_json(&post_key(post_id), &post)?;
        Ok::<_, ApiError>(post.comments)
    })?;

    info!(post_id = %post_id, account_id = %account_id, comments = comments.len(), "comment added");
    Ok(comments)
}

fn load_post(tx: &Transaction<'_>, post_id: &PostId) -> ApiResult<Post> {
    tx.get_json::<Post>(&post_key(post_id))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

fn require_account(tx: &Transaction<'_>, account_id: &AccountId) -> ApiResult<()> {
    if tx.exists(&user_key(account_id)) {
        Ok(())
    } else {
        Err(ApiError::NotFound("User not found".to_string()))
    }
}
