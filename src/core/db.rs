use tracing::info;

use crate::core::errors::ApiError;
use crate::core::store::KvStore;
use crate::follow::follow_user;
use crate::posts::create_post;
use crate::users::{find_by_username, register, RegisterForm};

struct DemoUser {
    username: &'static str,
    email: &'static str,
    posts: &'static [&'static str],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "test",
        email: "test@example.com",
        posts: &["This is my first post on Network!"],
    },
    DemoUser {
        username: "alice",
        email: "alice@example.com",
        posts: &[
            "Welcome to my page! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    },
    DemoUser {
        username: "bob",
        email: "bob@example.com",
        posts: &["Hey everyone! Just joined, looking forward to connecting with you all."],
    },
];

/// Seeds demo accounts (password = username), their posts and a test -> bob
/// follow. Accounts that already exist are left alone.
pub fn init_test_data(store: &dyn KvStore) -> anyhow::Result<()> {
    for demo in DEMO_USERS {
        let username = demo.username;
        if find_by_username(store, username)?.is_some() {
            continue;
        }

        let user = match register(store, &RegisterForm::new(username, demo.email, username, username)) {
            Ok(user) => user,
            Err(ApiError::Internal(err)) => return Err(err),
            Err(other) => anyhow::bail!("failed to seed {}: {}", username, other),
        };
        for content in demo.posts {
            create_post(store, user.id, content)?;
        }
        info!(username, "seeded demo user");
    }

    if let (Some(test), Some(bob)) = (find_by_username(store, "test")?, find_by_username(store, "bob")?) {
        follow_user(store, test.id, bob.id)?;
    }

    Ok(())
}
