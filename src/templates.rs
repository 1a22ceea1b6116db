use std::collections::HashSet;
use std::sync::OnceLock;

use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use rust_embed::RustEmbed;

use crate::auth::RequestContext;
use crate::core::http::Response;
use crate::core::pagination::Page;
use crate::models::models::User;
use crate::posts::{FeedView, PostView};
use crate::users::ProfileView;

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

fn load(name: &str) -> anyhow::Result<String> {
    let file = Templates::get(name).ok_or_else(|| anyhow::anyhow!("Template {} not found", name))?;
    Ok(String::from_utf8(file.data.to_vec())?)
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("Regex should compile"))
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s<]+").expect("Regex should compile"))
}

/// Substitutes `{{NAME}}` placeholders in a single pass; inserted values are
/// never rescanned. Unknown placeholders render empty.
pub fn fill(template: &str, values: &[(&str, String)]) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Escapes post text and turns bare URLs into links.
pub fn format_content(content: &str) -> String {
    let escaped = encode_text(content);
    url_regex()
        .replace_all(&escaped, |caps: &regex::Captures| {
            let url = &caps[0];
            format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                encode_double_quoted_attribute(url),
                url
            )
        })
        .into_owned()
}

fn nav(ctx: &RequestContext) -> String {
    match &ctx.user {
        Some(user) => format!(
            r#"<a class="brand" href="/">Network</a>
<a href="/profile/{}"><strong>{}</strong></a>
<a href="/">All Posts</a>
<a href="/following">Following</a>
<a href="/logout">Log Out</a>"#,
            user.id,
            encode_text(&user.username)
        ),
        None => r#"<a class="brand" href="/">Network</a>
<a href="/">All Posts</a>
<a href="/login">Log In</a>
<a href="/register">Register</a>"#
            .to_string(),
    }
}

fn layout(ctx: &RequestContext, title: &str, body: String) -> anyhow::Result<Response> {
    let html = fill(
        &load("layout.html")?,
        &[
            ("TITLE", encode_text(title).into_owned()),
            ("NAV", nav(ctx)),
            ("BODY", body),
        ],
    );
    Ok(Response::html(html))
}

fn render_post(ctx: &RequestContext, view: &PostView, liked: bool) -> String {
    let post = &view.post;
    let edited = if post.updated_at.is_some() { " · edited" } else { "" };

    let mut actions = String::new();
    if ctx.user.is_some() {
        actions.push_str(&format!(
            r#"<button class="like-button" data-post-id="{}" data-liked="{}">&#9829; <span class="like-count">{}</span></button>"#,
            post.id, liked, view.likes
        ));
        if ctx.user_id() == Some(post.user_id) {
            actions.push_str(&format!(
                r#"<button class="edit-button" data-post-id="{}">Edit</button>"#,
                post.id
            ));
        }
    } else {
        actions.push_str(&format!(
            r#"<span class="like-total">&#9829; {}</span>"#,
            view.likes
        ));
    }

    format!(
        r#"<article class="post" id="post-{id}">
<a class="post-author" href="/profile/{user_id}">{author}</a>
<div class="post-content" id="content-{id}">{content}</div>
<div class="post-meta">{created}{edited}</div>
<div class="post-actions">{actions}</div>
</article>"#,
        id = post.id,
        user_id = post.user_id,
        author = encode_text(&view.author),
        content = format_content(&post.content),
        created = encode_text(&post.created_at),
        edited = edited,
        actions = actions,
    )
}

fn render_posts(ctx: &RequestContext, page: &Page<PostView>, liked: &HashSet<u64>) -> String {
    if page.items.is_empty() {
        return r#"<p class="empty">No posts yet.</p>"#.to_string();
    }
    page.items
        .iter()
        .map(|view| render_post(ctx, view, liked.contains(&view.post.id)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_pagination<T>(page: &Page<T>, base: &str) -> String {
    if page.num_pages <= 1 {
        return String::new();
    }
    let mut links = String::from(r#"<nav class="pagination">"#);
    if let Some(prev) = page.previous_page_number() {
        links.push_str(&format!(r#"<a href="{}?page={}">Previous</a>"#, base, prev));
    }
    links.push_str(&format!(
        r#"<span class="current">Page {} of {}</span>"#,
        page.number, page.num_pages
    ));
    if let Some(next) = page.next_page_number() {
        links.push_str(&format!(r#"<a href="{}?page={}">Next</a>"#, base, next));
    }
    links.push_str("</nav>");
    links
}

fn render_feed(ctx: &RequestContext, heading: &str, view: &FeedView, base: &str, composer: bool) -> anyhow::Result<Response> {
    let composer = if composer && ctx.user.is_some() {
        r#"<form class="composer" action="/new_post" method="post">
<textarea name="content" placeholder="What's happening?"></textarea>
<button type="submit">Post</button>
</form>"#
            .to_string()
    } else {
        String::new()
    };

    let body = fill(
        &load("feed.html")?,
        &[
            ("HEADING", encode_text(heading).into_owned()),
            ("COMPOSER", composer),
            ("POSTS", render_posts(ctx, &view.page, &view.liked)),
            ("PAGINATION", render_pagination(&view.page, base)),
        ],
    );
    layout(ctx, heading, body)
}

pub fn render_index(ctx: &RequestContext, view: &FeedView) -> anyhow::Result<Response> {
    render_feed(ctx, "All Posts", view, "/", true)
}

pub fn render_following(ctx: &RequestContext, view: &FeedView) -> anyhow::Result<Response> {
    render_feed(ctx, "Following", view, "/following", false)
}

fn user_list(users: &[User]) -> String {
    users
        .iter()
        .map(|u| format!(r#"<li><a href="/profile/{}">{}</a></li>"#, u.id, encode_text(&u.username)))
        .collect::<Vec<_>>()
        .join("")
}

pub fn render_profile(ctx: &RequestContext, view: &ProfileView) -> anyhow::Result<Response> {
    let user = &view.user;

    // Only signed-in visitors looking at someone else get a button
    let follow_form = match ctx.user_id() {
        Some(viewer) if viewer != user.id => {
            let (action, label) = if view.is_following {
                ("/unfollow", "Unfollow")
            } else {
                ("/follow", "Follow")
            };
            format!(
                r#"<form class="follow-form" action="{}" method="post">
<input type="hidden" name="userfollow" value="{}">
<button type="submit">{}</button>
</form>"#,
                action,
                encode_double_quoted_attribute(&user.username),
                label
            )
        }
        _ => String::new(),
    };

    let body = fill(
        &load("profile.html")?,
        &[
            ("PROFILE_USER_ID", user.id.to_string()),
            ("PROFILE_USERNAME", encode_text(&user.username).into_owned()),
            ("FOLLOWER_COUNT", view.followers.len().to_string()),
            ("FOLLOWING_COUNT", view.following.len().to_string()),
            ("FOLLOW_FORM", follow_form),
            ("FOLLOWERS", user_list(&view.followers)),
            ("FOLLOWING", user_list(&view.following)),
            ("POSTS", render_posts(ctx, &view.page, &view.liked)),
            ("PAGINATION", render_pagination(&view.page, &format!("/profile/{}", user.id))),
        ],
    );
    layout(ctx, &user.username, body)
}

fn message_block(message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="alert">{}</div>"#, encode_text(m)))
        .unwrap_or_default()
}

pub fn render_login(ctx: &RequestContext, message: Option<&str>) -> anyhow::Result<Response> {
    let body = fill(&load("login.html")?, &[("MESSAGE", message_block(message))]);
    layout(ctx, "Log In", body)
}

pub fn render_register(ctx: &RequestContext, message: Option<&str>) -> anyhow::Result<Response> {
    let body = fill(&load("register.html")?, &[("MESSAGE", message_block(message))]);
    layout(ctx, "Register", body)
}
