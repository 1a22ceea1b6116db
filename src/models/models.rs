use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// `follower_id` follows `followed_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Follow {
    pub follower_id: u64,
    pub followed_id: u64,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Like {
    pub user_id: u64,
    pub post_id: u64,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: u64,
    pub created_at: String,
}
