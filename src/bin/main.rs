#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate network;

    use std::sync::Arc;

    use actix_web::{web, App, HttpServer};
    use anyhow::Context;
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    use network::config::Config;
    use network::core::db::init_test_data;
    use network::core::store::{KvStore, MemoryStore};
    use network::server::{configure, AppState};

    pub async fn run() -> anyhow::Result<()> {
        // .env is optional
        let _ = dotenvy::dotenv();

        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("network=info")),
            )
            .init();

        let config = Config::from_env().context("Failed to load configuration")?;

        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        if config.seed_data {
            init_test_data(store.as_ref()).context("Failed to seed demo data")?;
        }

        let bind_addr = config.bind_addr();
        info!(
            addr = %bind_addr,
            seed_data = config.seed_data,
            session_hours = config.session_expiration_hours,
            "server listening"
        );
        let state = web::Data::new(AppState::new(store, config));

        HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
            .bind(&bind_addr)
            .with_context(|| format!("Failed to bind {}", bind_addr))?
            .run()
            .await?;

        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
