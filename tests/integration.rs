use std::sync::Arc;

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::json;

use network::config::Config;
use network::core::store::{KvStore, MemoryStore};
use network::server::{configure, AppState};

fn new_state() -> web::Data<AppState> {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    web::Data::new(AppState::new(store, Config::default()))
}

fn session_cookie(resp: &ServiceResponse) -> String {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie missing")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("Location missing")
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_text(resp: ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

fn register_request(username: &str) -> test::TestRequest {
    test::TestRequest::post().uri("/register").set_form([
        ("username", username),
        ("email", "a@x.com"),
        ("password", "pw"),
        ("confirmation", "pw"),
    ])
}

/// Asserts a successful registration and returns its session cookie.
fn registered(resp: &ServiceResponse) -> String {
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(resp), "/");
    session_cookie(resp)
}

#[actix_web::test]
async fn test_register_post_and_index_flow() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    let cookie = registered(&test::call_service(&app, register_request("alice").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/new_post")
        .insert_header((header::COOKIE, cookie.clone()))
        .set_form([("content", "hello")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header((header::COOKIE, cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains(r#"id="content-1">hello</div>"#));
    assert!(html.contains("Log Out"));
}

#[actix_web::test]
async fn test_duplicate_registration_rerenders_form() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    registered(&test::call_service(&app, register_request("alice").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/register")
        .set_form([
            ("username", "alice"),
            ("email", "b@x.com"),
            ("password", "pw"),
            ("confirmation", "pw"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(resp).await.contains("Username already taken."));
}

#[actix_web::test]
async fn test_password_mismatch_rerenders_form() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/register")
        .set_form([
            ("username", "alice"),
            ("email", "a@x.com"),
            ("password", "pw"),
            ("confirmation", "other"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Passwords must match."));
}

#[actix_web::test]
async fn test_login_and_logout() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    registered(&test::call_service(&app, register_request("alice").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "alice"), ("password", "wrong")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Invalid username and/or password."));

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "alice"), ("password", "pw")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let cookie = session_cookie(&resp);

    let req = test::TestRequest::get()
        .uri("/logout")
        .insert_header((header::COOKIE, cookie.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    // The old session no longer authenticates
    let req = test::TestRequest::get()
        .uri("/following")
        .insert_header((header::COOKIE, cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_anonymous_following_is_forbidden() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/following").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "User not authenticated"}));
}

#[actix_web::test]
async fn test_new_post_wrong_method() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    let cookie = registered(&test::call_service(&app, register_request("alice").to_request()).await);

    let req = test::TestRequest::get()
        .uri("/new_post")
        .insert_header((header::COOKIE, cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid method");
}

#[actix_web::test]
async fn test_edit_post_returns_new_content() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    let alice = registered(&test::call_service(&app, register_request("alice").to_request()).await);
    let bob = registered(&test::call_service(&app, register_request("bob").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/new_post")
        .insert_header((header::COOKIE, alice))
        .set_form([("content", "first draft")])
        .to_request();
    test::call_service(&app, req).await;

    // Any signed-in user may edit
    let req = test::TestRequest::post()
        .uri("/edit/1")
        .insert_header((header::COOKIE, bob.clone()))
        .set_json(json!({"content": "second draft"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"message": "Change successful", "data": "second draft"}));

    let req = test::TestRequest::post()
        .uri("/edit/99")
        .insert_header((header::COOKIE, bob))
        .set_json(json!({"content": "nothing"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/edit/1")
        .set_json(json!({"content": "anonymous"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_like_endpoints_are_idempotent() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    let cookie = registered(&test::call_service(&app, register_request("alice").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/new_post")
        .insert_header((header::COOKIE, cookie.clone()))
        .set_form([("content", "like me")])
        .to_request();
    test::call_service(&app, req).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/add_like/1")
            .insert_header((header::COOKIE, cookie.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Like added!");
    }

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header((header::COOKIE, cookie.clone()))
        .to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains(r#"data-liked="true">&#9829; <span class="like-count">1</span>"#));

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/remove_like/1")
            .insert_header((header::COOKIE, cookie.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Like removed!");
    }

    let req = test::TestRequest::post()
        .uri("/add_like/42")
        .insert_header((header::COOKIE, cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post().uri("/add_like/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_follow_flow_and_profile() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;
    let alice = registered(&test::call_service(&app, register_request("alice").to_request()).await);
    let bob = registered(&test::call_service(&app, register_request("bob").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/new_post")
        .insert_header((header::COOKIE, bob))
        .set_form([("content", "bob was here")])
        .to_request();
    test::call_service(&app, req).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/follow")
            .insert_header((header::COOKIE, alice.clone()))
            .set_form([("userfollow", "bob")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/2");
    }

    let req = test::TestRequest::get()
        .uri("/profile/2")
        .insert_header((header::COOKIE, alice.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<strong>1</strong> followers"));
    assert!(html.contains(r#"action="/unfollow""#));
    assert!(html.contains("bob was here"));

    let req = test::TestRequest::get()
        .uri("/following")
        .insert_header((header::COOKIE, alice.clone()))
        .to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("bob was here"));

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/unfollow")
            .insert_header((header::COOKIE, alice.clone()))
            .set_form([("userfollow", "bob")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    let req = test::TestRequest::post()
        .uri("/follow")
        .insert_header((header::COOKIE, alice.clone()))
        .set_form([("userfollow", "nobody")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/follow")
        .insert_header((header::COOKIE, alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/profile/77").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_static_assets_are_served() {
    let app = test::init_service(App::new().app_data(new_state()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/static/styles.css").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/css"));
}
