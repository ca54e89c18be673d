//! Directed follow edges.
//!
//! An edge `A -> B` is stored twice: `B` in `A.following` and `A` in
//! `B.followers`. Both halves are written in one store transaction, so a
//! reader sees either both or neither.
//!
//! Callers are responsible for checking that the authenticated identity is
//! the follower; the graph itself does not know who is asking.

use tracing::{debug, info};

use crate::config::user_key;
use crate::core::db::Store;
use crate::core::errors::{ApiError, ApiResult};
use crate::models::models::{Account, AccountId, UserRef};
use crate::users::{load_account, user_refs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    Absent,
    Present,
}

/// Adds `follower -> target`. Returns the follower's updated account.
pub fn follow_user(store: &Store, follower_id: &AccountId, target_id: &AccountId) -> ApiResult<Account> {
    if follower_id == target_id {
        return Err(ApiError::SelfFollow);
    }

    let result: ApiResult<Account> = store.transaction(|tx| {
        let mut follower = load_account(tx, follower_id)?;
        let mut target = tx
            .get_json::<Account>(&user_key(target_id))?
            .ok_or_else(|| ApiError::NotFound("Target user not found".to_string()))?;

        if follower.following.contains(target_id) {
            return Err(ApiError::AlreadyFollowing);
        }

        follower.following.insert(*target_id);
        target.followers.insert(*follower_id);
        tx.set_json(&user_key(follower_id), &follower)?;
        tx.set_json(&user_key(target_id), &target)?;
        Ok(follower)
    });

    match &result {
        Ok(_) => info!(follower = %follower_id, target = %target_id, "followed"),
        Err(e) => debug!(follower = %follower_id, target = %target_id, error = %e, "follow rejected"),
    }
    result
}

/// Removes `follower -> target`. Returns the follower's updated account.
pub fn unfollow_user(store: &Store, follower_id: &AccountId, target_id: &AccountId) -> ApiResult<Account> {
    let result: ApiResult<Account> = store.transaction(|tx| {
        let mut follower = load_account(tx, follower_id)?;
        let mut target = tx
            .get_json::<Account>(&user_key(target_id))?
            .ok_or_else(|| ApiError::NotFound("Target user not found".to_string()))?;

        if !follower.following.remove(target_id) {
            return Err(ApiError::NotFollowing);
        }
        target.followers.remove(follower_id);

        tx.set_json(&user_key(follower_id), &follower)?;
        tx.set_json(&user_key(target_id), &target)?;
        Ok(follower)
    });

    match &result {
        Ok(_) => info!(follower = %follower_id, target = %target_id, "unfollowed"),
        Err(e) => debug!(follower = %follower_id, target = %target_id, error = %e, "unfollow rejected"),
    }
    result
}

pub fn get_followers(store: &Store, account_id: &AccountId) -> ApiResult<Vec<UserRef>> {
    store.view(|snap| {
        let account = snap
            .get_json::<Account>(&user_key(account_id))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user_refs(snap, account.followers.iter())
    })
}

pub fn get_followings(store: &Store, account_id: &AccountId) -> ApiResult<Vec<UserRef>> {
    store.view(|snap| {
        let account = snap
            .get_json::<Account>(&user_key(account_id))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user_refs(snap, account.following.iter())
    })
}

/// Reads both halves of `from -> to` in one snapshot.
pub fn edge_state(store: &Store, from: &AccountId, to: &AccountId) -> ApiResult<EdgeState> {
    store.view(|snap| {
        let from_account = snap
            .get_json::<Account>(&user_key(from))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let to_account = snap
            .get_json::<Account>(&user_key(to))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        match (
            from_account.following.contains(to),
            to_account.followers.contains(from),
        ) {
            (true, true) => Ok(EdgeState::Present),
            (false, false) => Ok(EdgeState::Absent),
            _ => Err(ApiError::Internal(format!(
                "asymmetric follow edge {} -> {}",
                from, to
            ))),
        }
    })
}
