use std::collections::HashSet;

use http::{Method, StatusCode};
use tracing::{debug, info};

use crate::auth::RequestContext;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::now_iso;
use crate::core::http::{Request, Response};
use crate::core::pagination::{Page, Paginator};
use crate::core::store::{get_ids, push_front_unique, JsonStore, KvStore};
use crate::follow::get_followings;
use crate::likes::{like_count, liked_post_ids};
use crate::models::models::Post;
use crate::templates;
use crate::users::get_user;

/// A post with what the feed needs to display it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub post: Post,
    pub author: String,
    pub likes: usize,
}

pub struct FeedView {
    pub page: Page<PostView>,
    /// Post ids the viewer has liked; empty for anonymous viewers
    pub liked: HashSet<u64>,
}

pub fn get_post(store: &dyn KvStore, post_id: u64) -> anyhow::Result<Option<Post>> {
    store.get_json(&post_key(post_id))
}

pub fn create_post(store: &dyn KvStore, user_id: u64, content: &str) -> anyhow::Result<Post> {
    let id = store.increment(POSTS_SEQ_KEY)?;
    let post = Post {
        id,
        user_id,
        content: content.to_string(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(id), &post)?;
    push_front_unique(store, FEED_KEY, id)?;
    push_front_unique(store, &user_posts_key(user_id), id)?;

    Ok(post)
}

/// Paginates `ids` (newest first) and loads only the posts on the chosen page.
pub fn load_post_page(store: &dyn KvStore, ids: Vec<u64>, page: Option<&str>) -> anyhow::Result<Page<PostView>> {
    Paginator::new(ids, POSTS_PER_PAGE)
        .get_page(page)
        .try_map(|id| post_view(store, id))
}

fn post_view(store: &dyn KvStore, post_id: u64) -> anyhow::Result<Option<PostView>> {
    let post = match get_post(store, post_id)? {
        Some(p) => p,
        None => return Ok(None),
    };
    let author = get_user(store, post.user_id)?
        .map(|u| u.username)
        .unwrap_or_default();
    let likes = like_count(store, post.id)?;
    Ok(Some(PostView { post, author, likes }))
}

fn viewer_likes(store: &dyn KvStore, ctx: &RequestContext) -> anyhow::Result<HashSet<u64>> {
    match ctx.user_id() {
        Some(user_id) => liked_post_ids(store, user_id),
        None => Ok(HashSet::new()),
    }
}

/// Every post, newest first.
pub fn index(store: &dyn KvStore, ctx: &RequestContext, page: Option<&str>) -> Result<FeedView, ApiError> {
    let ids = get_ids(store, FEED_KEY)?;
    let page = load_post_page(store, ids, page)?;
    let liked = viewer_likes(store, ctx)?;

    debug!(page = page.number, count = page.count, "index feed loaded");
    Ok(FeedView { page, liked })
}

/// Posts by accounts the current user follows, newest first.
pub fn following(store: &dyn KvStore, ctx: &RequestContext, page: Option<&str>) -> Result<FeedView, ApiError> {
    let user = ctx.require_user()?;

    let mut ids = Vec::new();
    for followed_id in get_followings(store, user.id)? {
        ids.extend(get_ids(store, &user_posts_key(followed_id))?);
    }
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();

    let page = load_post_page(store, ids, page)?;
    let liked = viewer_likes(store, ctx)?;

    debug!(user_id = user.id, page = page.number, count = page.count, "following feed loaded");
    Ok(FeedView { page, liked })
}

pub fn new_post(
    store: &dyn KvStore,
    ctx: &RequestContext,
    method: &Method,
    content: Option<&str>,
) -> Result<Post, ApiError> {
    if *method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }
    let user = ctx.require_user()?;

    let post = create_post(store, user.id, content.unwrap_or_default())?;
    info!(post_id = post.id, user_id = user.id, "post created");
    Ok(post)
}

/// Replaces a post's content. Any signed-in user may edit any post.
pub fn edit(
    store: &dyn KvStore,
    ctx: &RequestContext,
    method: &Method,
    post_id: u64,
    content: Option<&str>,
) -> Result<Post, ApiError> {
    if *method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }
    let user = ctx.require_user()?;

    let mut post = get_post(store, post_id)?.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    let content = content.ok_or_else(|| ApiError::BadRequest("Missing content".to_string()))?;

    if post.user_id != user.id {
        debug!(post_id, author_id = post.user_id, editor_id = user.id, "post edited by non-author");
    }

    post.content = content.to_string();
    post.updated_at = Some(now_iso());
    store.set_json(&post_key(post.id), &post)?;

    info!(post_id = post.id, user_id = user.id, "post edited");
    Ok(post)
}

// === HTTP Handlers ===

pub fn handle_index(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let view = index(store, ctx, req.page())?;
    Ok(templates::render_index(ctx, &view)?)
}

pub fn handle_following(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let view = following(store, ctx, req.page())?;
    Ok(templates::render_following(ctx, &view)?)
}

pub fn handle_new_post(store: &dyn KvStore, ctx: &RequestContext, req: &Request) -> Result<Response, ApiError> {
    let form = req.form();
    new_post(store, ctx, &req.method, form.get("content").map(String::as_str))?;
    Ok(Response::redirect("/"))
}

pub fn handle_edit(
    store: &dyn KvStore,
    ctx: &RequestContext,
    req: &Request,
    post_id: u64,
) -> Result<Response, ApiError> {
    let body = req.json();
    let content = body.as_ref().and_then(|v| v["content"].as_str());
    let post = edit(store, ctx, &req.method, post_id, content)?;

    Ok(Response::json(
        StatusCode::OK,
        &serde_json::json!({"message": "Change successful", "data": post.content}),
    ))
}
