use anyhow::{Context, Result};

pub const POSTS_PER_PAGE: usize = 10;
pub const SESSION_COOKIE: &str = "session";

pub const FEED_KEY: &str = "feed";
pub const USERS_SEQ_KEY: &str = "seq:users";
pub const POSTS_SEQ_KEY: &str = "seq:posts";

// === Key layout ===
pub fn user_key(user_id: u64) -> String {
    format!("user:{}", user_id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn post_key(post_id: u64) -> String {
    format!("post:{}", post_id)
}

pub fn user_posts_key(user_id: u64) -> String {
    format!("user_posts:{}", user_id)
}

pub fn follow_key(follower_id: u64, followed_id: u64) -> String {
    format!("follow:{}:{}", follower_id, followed_id)
}

pub fn followings_key(user_id: u64) -> String {
    format!("followings:{}", user_id)
}

pub fn followers_key(user_id: u64) -> String {
    format!("followers:{}", user_id)
}

pub fn like_key(user_id: u64, post_id: u64) -> String {
    format!("like:{}:{}", user_id, post_id)
}

pub fn user_likes_key(user_id: u64) -> String {
    format!("likes:{}", user_id)
}

pub fn post_likes_key(post_id: u64) -> String {
    format!("post_likes:{}", post_id)
}

pub fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Settings for the native server, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Seed demo users and posts at startup
    pub seed_data: bool,
    /// Sessions older than this are rejected
    pub session_expiration_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            seed_data: false,
            session_expiration_hours: 24,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        let host = std::env::var("NETWORK_HOST").unwrap_or(defaults.host);
        let port = match std::env::var("NETWORK_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("NETWORK_PORT must be a port number, got {:?}", raw))?,
            Err(_) => defaults.port,
        };
        let seed_data = std::env::var("NETWORK_SEED_DATA")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.seed_data);
        let session_expiration_hours = match std::env::var("NETWORK_SESSION_EXPIRATION_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("NETWORK_SESSION_EXPIRATION_HOURS must be a number of hours, got {:?}", raw))?,
            Err(_) => defaults.session_expiration_hours,
        };

        Ok(Config {
            host,
            port,
            seed_data,
            session_expiration_hours,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
