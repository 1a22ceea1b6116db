use std::collections::HashSet;

use http::StatusCode;
use tracing::info;

use crate::auth::RequestContext;
use crate::config::{like_key, post_likes_key, user_likes_key};
use crate::core::errors::ApiError;
use crate::core::helpers::now_iso;
use crate::core::http::Response;
use crate::core::store::{get_ids, push_front_unique, remove_id, KvStore};
use crate::models::models::{Like, Post};
use crate::posts::get_post;

pub fn liked_post_ids(store: &dyn KvStore, user_id: u64) -> anyhow::Result<HashSet<u64>> {
    Ok(get_ids(store, &user_likes_key(user_id))?.into_iter().collect())
}

pub fn like_count(store: &dyn KvStore, post_id: u64) -> anyhow::Result<usize> {
    Ok(get_ids(store, &post_likes_key(post_id))?.len())
}

/// Get-or-create on the `like:{user}:{post}` row. Returns whether a row was created.
pub fn like_post(store: &dyn KvStore, user_id: u64, post_id: u64) -> anyhow::Result<bool> {
    let like = Like {
        user_id,
        post_id,
        created_at: now_iso(),
    };
    if !store.set_if_absent(&like_key(user_id, post_id), &serde_json::to_vec(&like)?)? {
        return Ok(false);
    }
    push_front_unique(store, &user_likes_key(user_id), post_id)?;
    push_front_unique(store, &post_likes_key(post_id), user_id)?;
    Ok(true)
}

/// Returns whether a row was removed.
pub fn unlike_post(store: &dyn KvStore, user_id: u64, post_id: u64) -> anyhow::Result<bool> {
    let key = like_key(user_id, post_id);
    if !store.exists(&key)? {
        return Ok(false);
    }
    store.delete(&key)?;
    remove_id(store, &user_likes_key(user_id), post_id)?;
    remove_id(store, &post_likes_key(post_id), user_id)?;
    Ok(true)
}

fn require_post(store: &dyn KvStore, post_id: u64) -> Result<Post, ApiError> {
    get_post(store, post_id)?.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

pub fn add_like(store: &dyn KvStore, ctx: &RequestContext, post_id: u64) -> Result<(), ApiError> {
    let user = ctx.require_user()?;
    let post = require_post(store, post_id)?;

    if like_post(store, user.id, post.id)? {
        info!(user_id = user.id, post_id, "post liked");
    }
    Ok(())
}

pub fn remove_like(store: &dyn KvStore, ctx: &RequestContext, post_id: u64) -> Result<(), ApiError> {
    let user = ctx.require_user()?;
    let post = require_post(store, post_id)?;

    if unlike_post(store, user.id, post.id)? {
        info!(user_id = user.id, post_id, "like removed");
    }
    Ok(())
}

// === HTTP Handlers ===

pub fn handle_add_like(store: &dyn KvStore, ctx: &RequestContext, post_id: u64) -> Result<Response, ApiError> {
    add_like(store, ctx, post_id)?;
    Ok(Response::json(StatusCode::OK, &serde_json::json!({"message": "Like added!"})))
}

pub fn handle_remove_like(store: &dyn KvStore, ctx: &RequestContext, post_id: u64) -> Result<Response, ApiError> {
    remove_like(store, ctx, post_id)?;
    Ok(Response::json(StatusCode::OK, &serde_json::json!({"message": "Like removed!"})))
}
