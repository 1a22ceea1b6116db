//! Native actix-web front end over the shared router.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::core::http::{Request, Response};
use crate::core::store::KvStore;
use crate::handlers::route;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>, config: Config) -> Self {
        AppState {
            store,
            config: Arc::new(config),
        }
    }
}

/// Sends every path through the router. Register `web::Data<AppState>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/{tail:.*}", web::route().to(handle_all));
}

mod adapter {
    use super::*;

    pub fn actix_to_request(req: &HttpRequest, body: web::Bytes) -> anyhow::Result<Request> {
        let method = http::Method::from_bytes(req.method().as_str().as_bytes())?;
        let uri = req.uri().to_string();

        let mut converted = Request::new(method, &uri).with_body(body.to_vec());
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                converted = converted.with_header(name.as_str(), val_str);
            }
        }
        Ok(converted)
    }

    pub fn response_to_actix(resp: Response) -> HttpResponse {
        let status = StatusCode::from_u16(resp.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut builder = HttpResponse::build(status);
        for (name, value) in resp.headers {
            builder.append_header((name, value));
        }
        builder.body(resp.body)
    }
}

async fn handle_all(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let converted = match adapter::actix_to_request(&req, body) {
        Ok(r) => r,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({"error": "Invalid request"}));
        }
    };

    adapter::response_to_actix(route(state.store.as_ref(), &state.config, &converted))
}
