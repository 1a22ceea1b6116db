use std::collections::HashSet;

use http::Method;
use tracing::{debug, info};

use crate::auth::{session_cookie, start_session, RequestContext};
use crate::config::{user_key, user_posts_key, username_key, USERS_SEQ_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, sanitize_text};
use crate::core::http::{Request, Response};
use crate::core::pagination::Page;
use crate::core::store::{get_ids, JsonStore, KvStore};
use crate::follow::{get_followers, get_followings, is_following};
use crate::models::models::User;
use crate::posts::{load_post_page, PostView};
use crate::templates;

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

impl RegisterForm {
    pub fn new(username: &str, email: &str, password: &str, confirmation: &str) -> Self {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirmation: confirmation.to_string(),
        }
    }

    fn from_request(req: &Request) -> Self {
        let form = req.form();
        let field = |name: &str| form.get(name).cloned().unwrap_or_default();
        RegisterForm {
            username: field("username"),
            email: field("email"),
            password: field("password"),
            confirmation: field("confirmation"),
        }
    }
}

pub struct ProfileView {
    pub user: User,
    pub page: Page<PostView>,
    /// Accounts this user follows
    pub following: Vec<User>,
    pub followers: Vec<User>,
    /// Whether the viewer follows this user
    pub is_following: bool,
    pub liked: HashSet<u64>,
}

pub fn get_user(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Option<User>> {
    store.get_json(&user_key(user_id))
}

pub fn find_by_username(store: &dyn KvStore, username: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<u64>(&username_key(username))? {
        Some(id) => get_user(store, id),
        None => Ok(None),
    }
}

pub fn get_users(store: &dyn KvStore, ids: &[u64]) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = get_user(store, *id)? {
            users.push(user);
        }
    }
    Ok(users)
}

/// Canonical form of a submitted username. Registration and login both go
/// through it.
pub fn normalize_username(raw: &str) -> String {
    sanitize_text(raw).trim().to_string()
}

/// Creates the account. The username is claimed with `set_if_absent` before
/// the user row is written.
pub fn register(store: &dyn KvStore, form: &RegisterForm) -> Result<User, ApiError> {
    if form.password != form.confirmation {
        return Err(ApiError::Validation("Passwords must match.".to_string()));
    }

    let username = normalize_username(&form.username);
    if username.is_empty() || form.password.is_empty() {
        return Err(ApiError::Validation("Username and password are required.".to_string()));
    }

    if store.exists(&username_key(&username))? {
        return Err(ApiError::Conflict("Username already taken.".to_string()));
    }

    let id = store.increment(USERS_SEQ_KEY)?;
    if !store.set_if_absent(&username_key(&username), id.to_string().as_bytes())? {
        return Err(ApiError::Conflict("Username already taken.".to_string()));
    }

    let user = User {
        id,
        username,
        email: form.email.trim().to_string(),
        password: hash_password(&form.password)?,
        created_at: now_iso(),
    };
    store.set_json(&user_key(id), &user)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub fn profile(
    store: &dyn KvStore,
    ctx: &RequestContext,
    user_id: u64,
    page: Option<&str>,
) -> Result<ProfileView, ApiError> {
    let user = get_user(store, user_id)?.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let post_ids = get_ids(store, &user_posts_key(user.id))?;
    let page = load_post_page(store, post_ids, page)?;

    let following = get_users(store, &get_followings(store, user.id)?)?;
    let followers = get_users(store, &get_followers(store, user.id)?)?;
    let viewer_follows = match ctx.user_id() {
        Some(viewer) => is_following(store, viewer, user.id)?,
        None => false,
    };

    let liked = match ctx.user_id() {
        Some(viewer) => crate::likes::liked_post_ids(store, viewer)?,
        None => Default::default(),
    };

    debug!(user_id, page = page.number, "profile loaded");
    Ok(ProfileView {
        user,
        page,
        following,
        followers,
        is_following: viewer_follows,
        liked,
    })
}

// === HTTP Handlers ===

pub fn handle_register(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    if req.method != Method::POST {
        return Ok(templates::render_register(ctx, None)?);
    }

    match register(store, &RegisterForm::from_request(req)) {
        Ok(user) => {
            let token = start_session(store, user.id)?;
            Ok(Response::redirect("/").with_header("Set-Cookie", session_cookie(&token)))
        }
        Err(ApiError::Validation(message)) | Err(ApiError::Conflict(message)) => {
            Ok(templates::render_register(ctx, Some(&message))?)
        }
        Err(err) => Err(err),
    }
}

pub fn handle_profile(
    store: &dyn KvStore,
    ctx: &RequestContext,
    req: &Request,
    user_id: u64,
) -> Result<Response, ApiError> {
    let view = profile(store, ctx, user_id, req.page())?;
    Ok(templates::render_profile(ctx, &view)?)
}
