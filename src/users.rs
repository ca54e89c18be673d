use serde::Deserialize;
use tracing::info;

use crate::config::*;
use crate::core::db::{Snapshot, Store, Transaction};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{normalize_email, sanitize_text};
use crate::credentials::validate_username;
use crate::models::models::{
    Account, AccountId, ProfileView, PublicProfile, Theme, UserRef, Visibility,
};

/// Fields a caller may change on their own profile. Anything else in the
/// request body (credentials, follow sets, email) is ignored.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub theme: Option<Theme>,
    pub visibility: Option<Visibility>,
    pub avatar: Option<String>,
    pub cover: Option<String>,
}

pub fn get_profile(store: &Store, account_id: &AccountId) -> ApiResult<Account> {
    store
        .get_json::<Account>(&user_key(account_id))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn find_by_username(store: &Store, username: &str) -> ApiResult<Option<Account>> {
    store.view(|snap| {
        match snap.get_json::<AccountId>(&username_key(username.trim()))? {
            Some(id) => Ok(snap.get_json::<Account>(&user_key(&id))?),
            None => Ok(None),
        }
    })
}

/// Looks an account up by email (case-normalized) or username.
pub fn resolve_identifier(store: &Store, identifier: &str) -> ApiResult<Option<Account>> {
    let identifier = identifier.trim();
    if identifier.contains('@') {
        let by_email: ApiResult<Option<Account>> = store.view(|snap| {
            match snap.get_json::<AccountId>(&email_key(&normalize_email(identifier)))? {
                Some(id) => Ok(snap.get_json::<Account>(&user_key(&id))?),
                None => Ok(None),
            }
        });
        if let Some(account) = by_email? {
            return Ok(Some(account));
        }
    }
    find_by_username(store, identifier)
}

pub(crate) fn load_account(tx: &Transaction<'_>, account_id: &AccountId) -> ApiResult<Account> {
    tx.get_json::<Account>(&user_key(account_id))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Partial update: only the fields present in `update` change. An empty
/// string clears an optional field.
pub fn update_profile(
    store: &Store,
    account_id: &AccountId,
    update: ProfileUpdate,
) -> ApiResult<Account> {
    let username = update.username.as_deref().map(validate_username).transpose()?;
    let bio = update
        .bio
        .as_deref()
        .map(|v| optional_text("Bio", v, MAX_BIO_LENGTH))
        .transpose()?;
    let location = update
        .location
        .as_deref()
        .map(|v| optional_text("Location", v, MAX_LOCATION_LENGTH))
        .transpose()?;
    let website = update
        .website
        .as_deref()
        .map(|v| optional_text("Website", v, MAX_WEBSITE_LENGTH))
        .transpose()?;

    let account: Account = store.transaction(|tx| {
        let mut account = load_account(tx, account_id)?;

        if let Some(new_name) = username {
            if new_name != account.username {
                let new_key = username_key(&new_name);
                let owner: Option<AccountId> = tx.get_json(&new_key)?;
                if owner.is_some_and(|id| id != account.id) {
                    return Err(ApiError::Conflict("Username already exists".to_string()));
                }
                tx.delete(&username_key(&account.username));
                tx.set_json(&new_key, &account.id)?;
                account.username = new_name;
            }
        }
        if let Some(bio) = bio {
            account.profile.bio = bio;
        }
        if let Some(location) = location {
            account.profile.location = location;
        }
        if let Some(website) = website {
            account.profile.website = website;
        }
        if let Some(theme) = update.theme {
            account.profile.theme = theme;
        }
        if let Some(visibility) = update.visibility {
            account.profile.visibility = visibility;
        }
        if let Some(avatar) = update.avatar {
            account.profile.avatar = media_ref(avatar);
        }
        if let Some(cover) = update.cover {
            account.profile.cover = media_ref(cover);
        }

        tx.set_json(&user_key(account_id), &account)?;
        Ok(account)
    })?;

    info!(account_id = %account_id, "profile updated");
    Ok(account)
}

/// Case-insensitive substring match on username, at most `limit` results
/// (capped at MAX_SEARCH_RESULTS), in registration order.
pub fn search(store: &Store, query: &str, limit: usize) -> ApiResult<Vec<PublicProfile>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let limit = limit.clamp(1, MAX_SEARCH_RESULTS);

    store.view(|snap| {
        let users: Vec<AccountId> = snap.get_json(USERS_LIST_KEY)?.unwrap_or_default();
        let mut results = Vec::new();
        for id in users {
            if results.len() >= limit {
                break;
            }
            if let Some(account) = snap.get_json::<Account>(&user_key(&id))? {
                if account.username.to_lowercase().contains(&needle) {
                    results.push(public_profile(&account));
                }
            }
        }
        Ok(results)
    })
}

pub fn public_profile(account: &Account) -> PublicProfile {
    PublicProfile {
        id: account.id,
        username: account.username.clone(),
        bio: account.profile.bio.clone(),
        avatar: account.profile.avatar.clone(),
    }
}

/// Full profile with follower/following ids resolved to usernames.
pub fn profile_view(store: &Store, account: &Account) -> ApiResult<ProfileView> {
    store.view(|snap| {
        Ok(ProfileView {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            is_federated: account.is_federated(),
            profile: account.profile.clone(),
            followers: user_refs(snap, account.followers.iter())?,
            following: user_refs(snap, account.following.iter())?,
            created_at: account.created_at,
        })
    })
}

pub(crate) fn user_ref(snap: &Snapshot<'_>, id: &AccountId) -> ApiResult<Option<UserRef>> {
    Ok(snap
        .get_json::<Account>(&user_key(id))?
        .map(|account| UserRef {
            id: account.id,
            username: account.username,
        }))
}

pub(crate) fn user_refs<'a>(
    snap: &Snapshot<'_>,
    ids: impl Iterator<Item = &'a AccountId>,
) -> ApiResult<Vec<UserRef>> {
    let mut refs = Vec::new();
    for id in ids {
        if let Some(r) = user_ref(snap, id)? {
            refs.push(r);
        }
    }
    refs.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(refs)
}

fn optional_text(field: &str, raw: &str, max: usize) -> ApiResult<Option<String>> {
    let trimmed = raw.trim();
    let cleaned = sanitize_text(trimmed);
    if cleaned.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::InvalidInput(format!(
            "{} too long (max {} chars)",
            field, max
        )));
    }
    Ok(Some(cleaned))
}

fn media_ref(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}
