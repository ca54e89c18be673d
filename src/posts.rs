use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::config::*;
use crate::core::db::{Snapshot, Store};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{now, require_text};
use crate::models::models::{
    Account, AccountId, Comment, CommentView, Post, PostId, PostView, UserRef,
};
use crate::users::user_ref;

pub fn create_post(
    store: &Store,
    author_id: &AccountId,
    content: &str,
    media_ref: Option<String>,
) -> ApiResult<Post> {
    let content = require_text("Content", content, MAX_POST_LENGTH, true)?;
    let media_ref = media_ref.filter(|m| !m.trim().is_empty());

    let post: Post = store.transaction(|tx| {
        if !tx.exists(&user_key(author_id)) {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        // Timestamped under the write lock so feed order and clock order agree.
        let post = Post {
            id: Uuid::new_v4(),
            author_id: *author_id,
            content,
            media_ref,
            created_at: now(),
            likes: Default::default(),
            comments: Vec::new(),
        };
        tx.set_json(&post_key(&post.id), &post)?;

        let mut feed: Vec<PostId> = tx.get_json(FEED_KEY)?.unwrap_or_default();
        feed.insert(0, post.id); // prepend newest
        tx.set_json(FEED_KEY, &feed)?;
        Ok(post)
    })?;

    info!(post_id = %post.id, author_id = %author_id, "post created");
    Ok(post)
}

pub fn get_post(store: &Store, post_id: &PostId) -> ApiResult<Post> {
    store
        .get_json::<Post>(&post_key(post_id))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Global feed, newest first. Every call is a fresh snapshot.
pub fn list_feed(store: &Store) -> ApiResult<Vec<PostView>> {
    store.view(|snap| chronological(snap, |_| true))
}

pub fn list_by_author(store: &Store, author_id: &AccountId) -> ApiResult<Vec<PostView>> {
    store.view(|snap| {
        if !snap.exists(&user_key(author_id)) {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        chronological(snap, |post| post.author_id == *author_id)
    })
}

/// Posts by the accounts `account_id` follows, newest first.
pub fn list_following_feed(store: &Store, account_id: &AccountId) -> ApiResult<Vec<PostView>> {
    store.view(|snap| {
        let account = snap
            .get_json::<Account>(&user_key(account_id))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        chronological(snap, |post| account.following.contains(&post.author_id))
    })
}

/// Removes the post together with its likes and comments. Only the author may.
pub fn delete_post(store: &Store, post_id: &PostId, requester_id: &AccountId) -> ApiResult<()> {
    store.transaction(|tx| {
        let post = tx
            .get_json::<Post>(&post_key(post_id))?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        if post.author_id != *requester_id {
            return Err(ApiError::Forbidden);
        }

        tx.delete(&post_key(post_id));
        let mut feed: Vec<PostId> = tx.get_json(FEED_KEY)?.unwrap_or_default();
        feed.retain(|id| id != post_id);
        tx.set_json(FEED_KEY, &feed)?;
        Ok(())
    })?;

    info!(post_id = %post_id, author_id = %requester_id, "post deleted");
    Ok(())
}

pub fn post_view(store: &Store, post: &Post) -> ApiResult<PostView> {
    store.view(|snap| build_view(snap, post, &mut HashMap::new()))
}

pub fn comment_views(store: &Store, comments: &[Comment]) -> ApiResult<Vec<CommentView>> {
    store.view(|snap| {
        let mut authors = HashMap::new();
        comments
            .iter()
            .map(|c| comment_view(snap, c, &mut authors))
            .collect()
    })
}

/// 1-based page of `items`. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(POSTS_PER_PAGE);
    items.into_iter().skip(start).take(POSTS_PER_PAGE).collect()
}

// === Read-side projection ===

type AuthorCache = HashMap<AccountId, Option<UserRef>>;

fn chronological(snap: &Snapshot<'_>, keep: impl Fn(&Post) -> bool) -> ApiResult<Vec<PostView>> {
    let feed: Vec<PostId> = snap.get_json(FEED_KEY)?.unwrap_or_default();

    let mut posts = Vec::new();
    for id in &feed {
        if let Some(post) = snap.get_json::<Post>(&post_key(id))? {
            if keep(&post) {
                posts.push(post);
            }
        }
    }
    // Feed is newest-insertion first; the stable sort keeps that for equal timestamps.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut authors = AuthorCache::new();
    posts
        .iter()
        .map(|post| build_view(snap, post, &mut authors))
        .collect()
}

fn build_view(snap: &Snapshot<'_>, post: &Post, authors: &mut AuthorCache) -> ApiResult<PostView> {
    let mut likes: Vec<AccountId> = post.likes.iter().copied().collect();
    likes.sort();

    let comments = post
        .comments
        .iter()
        .map(|c| comment_view(snap, c, authors))
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(PostView {
        id: post.id,
        author: author(snap, &post.author_id, authors)?,
        content: post.content.clone(),
        media_ref: post.media_ref.clone(),
        created_at: post.created_at,
        like_count: post.likes.len(),
        likes,
        comments,
    })
}

fn comment_view(
    snap: &Snapshot<'_>,
    comment: &Comment,
    authors: &mut AuthorCache,
) -> ApiResult<CommentView> {
    Ok(CommentView {
        id: comment.id,
        author: author(snap, &comment.author_id, authors)?,
        text: comment.text.clone(),
        created_at: comment.created_at,
    })
}

fn author(
    snap: &Snapshot<'_>,
    id: &AccountId,
    authors: &mut AuthorCache,
) -> ApiResult<Option<UserRef>> {
    if let Some(cached) = authors.get(id) {
        return Ok(cached.clone());
    }
    let resolved = user_ref(snap, id)?;
    authors.insert(*id, resolved.clone());
    Ok(resolved)
}
