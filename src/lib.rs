pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod handlers;
pub mod likes;
pub mod models;
pub mod posts;
pub mod static_server;
pub mod templates;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

// === Spin component entrypoint ===
#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request, Response};
    use spin_sdk::http_component;

    use crate::config::Config;
    use crate::core::http;
    use crate::core::store::SpinStore;
    use crate::handlers::route;

    fn to_request(req: &Request) -> anyhow::Result<http::Request> {
        let method = ::http::Method::from_bytes(req.method().to_string().as_bytes())?;
        let uri = match req.query() {
            "" => req.path().to_string(),
            query => format!("{}?{}", req.path(), query),
        };

        let mut converted = http::Request::new(method, &uri).with_body(req.body().to_vec());
        for (name, value) in req.headers() {
            if let Some(val_str) = value.as_str() {
                converted = converted.with_header(name, val_str);
            }
        }
        Ok(converted)
    }

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = SpinStore::open_default()?;
        let config = Config::from_env()?;
        let resp = route(&store, &config, &to_request(&req)?);

        let mut builder = Response::builder();
        builder.status(resp.status.as_u16());
        for (name, value) in &resp.headers {
            builder.header(name.as_str(), value.as_str());
        }
        builder.body(resp.body);
        Ok(builder.build())
    }
}
