use http::Method;
use tracing::{debug, info};

use crate::config::{session_key, SESSION_COOKIE};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_token, now_iso, verify_password};
use crate::core::http::{Request, Response};
use crate::core::store::{JsonStore, KvStore};
use crate::models::models::{SessionData, User};
use crate::templates;
use crate::users::{find_by_username, get_user, normalize_username};

/// Who is making the request. Resolved once per request and handed to
/// every handler.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        RequestContext {
            user: Some(user),
            token: None,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user.as_ref().ok_or(ApiError::AuthRequired)
    }
}

/// Builds the context from the session cookie, falling back to a bearer token.
/// Sessions older than `max_age_hours` count as anonymous.
pub fn resolve_context(store: &dyn KvStore, req: &Request, max_age_hours: i64) -> anyhow::Result<RequestContext> {
    let token = match req.cookie(SESSION_COOKIE).or_else(|| req.bearer_token()) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Ok(RequestContext::anonymous()),
    };

    let user = validate_session(store, &token, max_age_hours)?;
    Ok(RequestContext {
        token: user.as_ref().map(|_| token),
        user,
    })
}

pub fn validate_session(store: &dyn KvStore, token: &str, max_age_hours: i64) -> anyhow::Result<Option<User>> {
    let data = match store.get_json::<SessionData>(&session_key(token))? {
        Some(data) => data,
        None => return Ok(None),
    };

    // Check if session is expired
    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let age_hours = (chrono::Utc::now() - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > max_age_hours {
            debug!(user_id = data.user_id, "session expired");
            return Ok(None);
        }
    }

    // Check if user still exists
    get_user(store, data.user_id)
}

pub fn start_session(store: &dyn KvStore, user_id: u64) -> anyhow::Result<String> {
    let token = new_token();
    let data = SessionData {
        user_id,
        created_at: now_iso(),
    };
    store.set_json(&session_key(&token), &data)?;
    Ok(token)
}

pub fn end_session(store: &dyn KvStore, token: &str) -> anyhow::Result<()> {
    store.delete(&session_key(token))
}

pub fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Returns the user when the credentials match.
pub fn authenticate(store: &dyn KvStore, username: &str, password: &str) -> anyhow::Result<Option<User>> {
    let username = normalize_username(username);
    Ok(find_by_username(store, &username)?.filter(|user| verify_password(password, &user.password)))
}

/// Checks credentials and opens a session, returning the user and token.
pub fn login(store: &dyn KvStore, username: &str, password: &str) -> Result<(User, String), ApiError> {
    match authenticate(store, username, password)? {
        Some(user) => {
            let token = start_session(store, user.id)?;
            info!(user_id = user.id, "user logged in");
            Ok((user, token))
        }
        None => {
            debug!(username, "login rejected");
            Err(ApiError::Validation("Invalid username and/or password.".to_string()))
        }
    }
}

/// Tears down the session, if any. Never fails for anonymous callers.
pub fn logout(store: &dyn KvStore, ctx: &RequestContext) -> anyhow::Result<()> {
    if let Some(token) = &ctx.token {
        end_session(store, token)?;
        info!(user_id = ?ctx.user_id(), "user logged out");
    }
    Ok(())
}

// === HTTP Handlers ===

pub fn handle_login(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    if req.method != Method::POST {
        return Ok(templates::render_login(ctx, None)?);
    }

    let form = req.form();
    let username = form.get("username").map(String::as_str).unwrap_or_default();
    let password = form.get("password").map(String::as_str).unwrap_or_default();

    match login(store, username, password) {
        Ok((_, token)) => Ok(Response::redirect("/").with_header("Set-Cookie", session_cookie(&token))),
        Err(ApiError::Validation(message)) => Ok(templates::render_login(ctx, Some(&message))?),
        Err(err) => Err(err),
    }
}

pub fn handle_logout(store: &dyn KvStore, ctx: &RequestContext) -> Result<Response, ApiError> {
    logout(store, ctx)?;
    Ok(Response::redirect("/").with_header("Set-Cookie", expired_session_cookie()))
}
