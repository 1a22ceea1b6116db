use http::Method;
use tracing::info;

use crate::auth::RequestContext;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::now_iso;
use crate::core::http::{Request, Response};
use crate::core::store::{get_ids, push_front_unique, remove_id, KvStore};
use crate::models::models::{Follow, User};
use crate::users::find_by_username;

/// Get-or-create on the `follow:{follower}:{followed}` row. Returns whether a
/// row was created.
pub fn follow_user(store: &dyn KvStore, follower_id: u64, followed_id: u64) -> anyhow::Result<bool> {
    let follow = Follow {
        follower_id,
        followed_id,
        created_at: now_iso(),
    };
    if !store.set_if_absent(&follow_key(follower_id, followed_id), &serde_json::to_vec(&follow)?)? {
        return Ok(false);
    }
    push_front_unique(store, &followings_key(follower_id), followed_id)?;
    push_front_unique(store, &followers_key(followed_id), follower_id)?;
    Ok(true)
}

pub fn unfollow_user(store: &dyn KvStore, follower_id: u64, followed_id: u64) -> anyhow::Result<bool> {
    let key = follow_key(follower_id, followed_id);
    if !store.exists(&key)? {
        return Ok(false);
    }
    store.delete(&key)?;
    remove_id(store, &followings_key(follower_id), followed_id)?;
    remove_id(store, &followers_key(followed_id), follower_id)?;
    Ok(true)
}

/// Ids of the accounts `user_id` follows.
pub fn get_followings(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Vec<u64>> {
    get_ids(store, &followings_key(user_id))
}

/// Ids of the accounts following `user_id`.
pub fn get_followers(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Vec<u64>> {
    get_ids(store, &followers_key(user_id))
}

pub fn is_following(store: &dyn KvStore, follower_id: u64, followed_id: u64) -> anyhow::Result<bool> {
    store.exists(&follow_key(follower_id, followed_id))
}

fn resolve_target(
    store: &dyn KvStore,
    ctx: &RequestContext,
    method: &Method,
    target_username: Option<&str>,
) -> Result<(User, User), ApiError> {
    if *method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }
    let current = ctx.require_user()?.clone();

    let target = match target_username {
        Some(name) => find_by_username(store, name)?,
        None => None,
    };
    let target = target.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok((current, target))
}

/// Returns the followed account.
pub fn follow(
    store: &dyn KvStore,
    ctx: &RequestContext,
    method: &Method,
    target_username: Option<&str>,
) -> Result<User, ApiError> {
    let (current, target) = resolve_target(store, ctx, method, target_username)?;
    if follow_user(store, current.id, target.id)? {
        info!(follower_id = current.id, followed_id = target.id, "user followed");
    }
    Ok(target)
}

/// Returns the unfollowed account.
pub fn unfollow(
    store: &dyn KvStore,
    ctx: &RequestContext,
    method: &Method,
    target_username: Option<&str>,
) -> Result<User, ApiError> {
    let (current, target) = resolve_target(store, ctx, method, target_username)?;
    if unfollow_user(store, current.id, target.id)? {
        info!(follower_id = current.id, followed_id = target.id, "user unfollowed");
    }
    Ok(target)
}

// === HTTP Handlers ===

pub fn handle_follow(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let form = req.form();
    let target = follow(store, ctx, &req.method, form.get("userfollow").map(String::as_str))?;
    Ok(Response::redirect(&format!("/profile/{}", target.id)))
}

pub fn handle_unfollow(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let form = req.form();
    let target = unfollow(store, ctx, &req.method, form.get("userfollow").map(String::as_str))?;
    Ok(Response::redirect(&format!("/profile/{}", target.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::users::{register, RegisterForm};

    fn setup() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let alice = register(&store, &RegisterForm::new("alice", "", "pw", "pw")).unwrap();
        let bob = register(&store, &RegisterForm::new("bob", "", "pw", "pw")).unwrap();
        (store, alice, bob)
    }

    #[test]
    fn following_twice_keeps_one_row() {
        let (store, alice, bob) = setup();
        let ctx = RequestContext::for_user(alice.clone());

        let target = follow(&store, &ctx, &Method::POST, Some("bob")).unwrap();
        assert_eq!(target.id, bob.id);
        follow(&store, &ctx, &Method::POST, Some("bob")).unwrap();

        assert_eq!(get_followings(&store, alice.id).unwrap(), vec![bob.id]);
        assert_eq!(get_followers(&store, bob.id).unwrap(), vec![alice.id]);
        assert!(is_following(&store, alice.id, bob.id).unwrap());
        assert!(!is_following(&store, bob.id, alice.id).unwrap());
    }

    #[test]
    fn unfollow_without_relationship_is_a_no_op() {
        let (store, alice, bob) = setup();
        let ctx = RequestContext::for_user(alice.clone());

        let target = unfollow(&store, &ctx, &Method::POST, Some("bob")).unwrap();
        assert_eq!(target.id, bob.id);

        follow(&store, &ctx, &Method::POST, Some("bob")).unwrap();
        unfollow(&store, &ctx, &Method::POST, Some("bob")).unwrap();
        assert!(get_followings(&store, alice.id).unwrap().is_empty());
        assert!(get_followers(&store, bob.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_target_is_not_found() {
        let (store, alice, _) = setup();
        let ctx = RequestContext::for_user(alice);
        assert!(matches!(
            follow(&store, &ctx, &Method::POST, Some("nobody")),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            unfollow(&store, &ctx, &Method::POST, None),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn method_is_checked_before_auth() {
        let (store, _, _) = setup();
        let anon = RequestContext::anonymous();
        assert!(matches!(
            follow(&store, &anon, &Method::GET, Some("bob")),
            Err(ApiError::MethodNotAllowed)
        ));
        assert!(matches!(
            follow(&store, &anon, &Method::POST, Some("bob")),
            Err(ApiError::AuthRequired)
        ));
    }
}
