use tracing::{debug, error};

use crate::auth::{self, RequestContext};
use crate::config::Config;
use crate::core::errors::ApiError;
use crate::core::http::{Request, Response};
use crate::core::store::KvStore;
use crate::{follow, likes, posts, static_server, users};

/// Resolves the session and dispatches to the matching handler. Every error is
/// turned into a response here.
pub fn route(store: &dyn KvStore, config: &Config, req: &Request) -> Response {
    let result = auth::resolve_context(store, req, config.session_expiration_hours)
        .map_err(ApiError::from)
        .and_then(|ctx| dispatch(store, &ctx, req));

    match result {
        Ok(resp) => {
            debug!(method = %req.method, path = %req.path, status = resp.status.as_u16(), "request handled");
            resp
        }
        Err(err) => {
            match &err {
                ApiError::Internal(source) => {
                    error!(method = %req.method, path = %req.path, error = ?source, "request failed")
                }
                other => debug!(method = %req.method, path = %req.path, error = %other, "request rejected"),
            }
            err.into()
        }
    }
}

fn dispatch(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        [""] => posts::handle_index(store, ctx, req),
        ["login"] => auth::handle_login(store, ctx, req),
        ["logout"] => auth::handle_logout(store, ctx),
        ["register"] => users::handle_register(store, ctx, req),
        ["new_post"] => posts::handle_new_post(store, ctx, req),
        ["following"] => posts::handle_following(store, ctx, req),
        ["profile", id] => users::handle_profile(store, ctx, req, parse_id(id, "User")?),
        ["edit", id] => posts::handle_edit(store, ctx, req, parse_id(id, "Post")?),
        ["add_like", id] => likes::handle_add_like(store, ctx, parse_id(id, "Post")?),
        ["remove_like", id] => likes::handle_remove_like(store, ctx, parse_id(id, "Post")?),
        ["follow"] => follow::handle_follow(store, ctx, req),
        ["unfollow"] => follow::handle_unfollow(store, ctx, req),
        ["static", file] => static_server::serve_static(file),
        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}

/// Ids that do not parse cannot exist.
fn parse_id(raw: &str, entity: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::NotFound(format!("{} not found", entity)))
}
