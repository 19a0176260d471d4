//! Handler tests for the users domain
//!
//! The full users API runs against in-memory repositories:
//! - request parsing and validation errors
//! - device token and JWT authentication
//! - admin authorization and pagination
//! - the queued password reset flow

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_helpers::{JwtAuth, JwtConfig};
use chrono::Utc;
use domain_users::error::DUPLICATE_EMAIL;
use domain_users::handlers::RESET_REQUESTED;
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

const SECRET: &str = "handler-test-secret-with-at-least-32-chars";

/// Keeps argon2 out of the tests.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> UserResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}

struct TestApp {
    app: Router,
    repositories: Repositories,
    mailer: Arc<InMemoryMailer>,
    module: UsersModule,
    admin: User,
}

async fn setup() -> TestApp {
    let repositories = Repositories::in_memory();
    let mailer = Arc::new(InMemoryMailer::new());

    let (admin, _) = User::create(
        "admin@example.com",
        Some("plain$admin-secret".into()),
        Some("Ada".into()),
        Some("Admin".into()),
        &["ROLE_ADMIN"],
        Utc::now(),
    )
    .unwrap();
    repositories.users.save(&admin).await.unwrap();

    let deps = UsersDeps::new(
        repositories.clone(),
        JwtAuth::new(&JwtConfig::new(SECRET)),
        SecurityConfig::default(),
    )
    .with_hasher(Arc::new(PlainHasher))
    .with_mailer(mailer.clone());
    let module = UsersModule::build(deps).unwrap();

    let app = Router::new()
        .merge(module.home_router())
        .nest("/api", module.api_router());

    TestApp {
        app,
        repositories,
        mailer,
        module,
        admin,
    }
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

fn registration(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret",
        "password_confirmation": "secret",
        "first_name": "Jane",
        "last_name": "Doe"
    })
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = call(app, "POST", "/api/app/register", None, Some(registration(email))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn login(app: &Router, email: &str, password: &str, device: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/app/login",
        None,
        Some(json!({"email": email, "password": password, "device_name": device})),
    )
    .await
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, "admin@example.com", "admin-secret", "web").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_home_page() {
    let t = setup().await;
    let (status, body) = call(&t.app, "GET", "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the home page.");
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let t = setup().await;
    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/register",
        None,
        Some(registration("jane@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["display_name"], "Jane Doe");
    assert_eq!(body["user"]["roles"], json!(["ROLE_USER"]));
    assert_eq!(body["user"]["role"], "ROLE_USER");
    assert!(body["user"].get("password").is_none());
    assert_eq!(body["token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts_on_email() {
    let t = setup().await;
    register(&t.app, "jane@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/register",
        None,
        Some(registration("jane@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Validation failed.");
    assert_eq!(body["errors"][0]["property"], "email");
    assert_eq!(body["errors"][0]["errors"][0], DUPLICATE_EMAIL);
    assert_eq!(body["errors"][0]["context"], "User");
}

#[tokio::test]
async fn test_register_rejects_bad_payloads() {
    let t = setup().await;

    let (status, body) = call(&t.app, "POST", "/api/app/register", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request content is empty or not valid");

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/register",
        None,
        Some(json!({"email": "jane@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Mandatory key"));

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/register",
        None,
        Some(json!({"email": "", "password": "a", "password_confirmation": "b"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["property"], "email");
    assert_eq!(body["errors"][1]["property"], "passwordConfirmation");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let t = setup().await;
    register(&t.app, "jane@example.com").await;

    let unknown = login(&t.app, "nobody@example.com", "secret", "web").await;
    let wrong = login(&t.app, "jane@example.com", "wrong", "web").await;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.1["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_relogin_on_same_device_invalidates_old_token() {
    let t = setup().await;
    register(&t.app, "jane@example.com").await;

    let (_, first) = login(&t.app, "jane@example.com", "secret", "iphone").await;
    let (_, second) = login(&t.app, "jane@example.com", "secret", "iphone").await;
    let first = first["token"].as_str().unwrap();
    let second = second["token"].as_str().unwrap();

    let (status, body) = call(&t.app, "GET", "/api/app/dashboard", Some(first), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = call(&t.app, "GET", "/api/app/dashboard", Some(second), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Welcome to dashboard. You are logged in.");
    assert_eq!(body["user"]["email"], "jane@example.com");
}

#[tokio::test]
async fn test_missing_credentials() {
    let t = setup().await;
    let (status, body) = call(&t.app, "GET", "/api/web/dashboard", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You must be logged in.");
}

#[tokio::test]
async fn test_logout_single_device_and_sign_out() {
    let t = setup().await;
    let token = register(&t.app, "jane@example.com").await;
    let (_, body) = login(&t.app, "jane@example.com", "secret", "ipad").await;
    let ipad = body["token"].as_str().unwrap().to_string();

    let (_, dashboard) = call(&t.app, "GET", "/api/app/dashboard", Some(&token), None).await;
    let web_id = dashboard["user"]["auth_tokens"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "web")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/app/account/logout/{web_id}");
    let (status, _) = call(&t.app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&t.app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Token not found");

    let (status, _) = call(&t.app, "POST", "/api/web/account/me/sign-out", Some(&ipad), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&t.app, "GET", "/api/app/dashboard", Some(&ipad), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_with_wrong_current_password() {
    let t = setup().await;
    let token = register(&t.app, "jane@example.com").await;

    let (status, body) = call(
        &t.app,
        "PATCH",
        "/api/app/account/me/change-password",
        Some(&token),
        Some(json!({
            "current_password": "wrong",
            "password": "new-secret",
            "password_confirmation": "new-secret"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid credentials");
    assert_eq!(body["errors"][0]["property"], "currentPassword");
    assert_eq!(
        body["errors"][0]["errors"][0],
        "Wrong value for your current password."
    );
}

#[tokio::test]
async fn test_update_profile_and_delete_account() {
    let t = setup().await;
    let token = register(&t.app, "jane@example.com").await;

    let (status, body) = call(
        &t.app,
        "PATCH",
        "/api/app/account/me/update",
        Some(&token),
        Some(json!({"email": "admin@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"][0]["errors"][0], DUPLICATE_EMAIL);

    let (status, body) = call(
        &t.app,
        "PATCH",
        "/api/app/account/me/update",
        Some(&token),
        Some(json!({"email": "jane.doe@example.com", "first_name": "J"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane.doe@example.com");
    assert_eq!(body["user"]["display_name"], "J");

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/account/me/delete-account",
        Some(&token),
        Some(json!({"password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User account deleted successfully");

    let (status, _) = call(&t.app, "GET", "/api/app/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let t = setup().await;
    register(&t.app, "jane@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/forgot-password",
        None,
        Some(json!({"email": "jane@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], RESET_REQUESTED);

    let TestApp {
        app,
        repositories,
        mailer,
        module,
        ..
    } = t;
    // Drains the reset queue.
    module.shutdown().await;

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    let reset_token = repositories
        .reset_tokens
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap()
        .reset_token;
    assert!(sent[0].body.contains(&reset_token));

    let reset = json!({
        "email": "jane@example.com",
        "reset_token": reset_token,
        "password": "brand-new",
        "password_confirmation": "brand-new"
    });
    let (status, _) = call(&app, "POST", "/api/reset-password", None, Some(reset.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/api/reset-password", None, Some(reset)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["message"],
        "Password reset token is invalid or wrong email provided."
    );

    let (status, _) = login(&app, "jane@example.com", "brand-new", "web").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_answers_the_same_for_unknown_email() {
    let t = setup().await;
    let (status, body) = call(
        &t.app,
        "POST",
        "/api/forgot-password",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], RESET_REQUESTED);

    t.module.shutdown().await;
    assert!(t.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_web_jwt_flow() {
    let t = setup().await;
    let (status, _) = call(
        &t.app,
        "POST",
        "/api/web/register",
        None,
        Some(registration("jane@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, pair) = call(
        &t.app,
        "POST",
        "/api/web/login_check",
        None,
        Some(json!({"email": "jane@example.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let jwt = pair["token"].as_str().unwrap();

    let (status, body) = call(&t.app, "GET", "/api/web/dashboard", Some(jwt), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane@example.com");

    let refresh = json!({"refresh_token": pair["refresh_token"]});
    let (status, rotated) = call(&t.app, "POST", "/api/web/token/refresh", None, Some(refresh.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refresh_token"], pair["refresh_token"]);

    let (status, body) = call(&t.app, "POST", "/api/web/token/refresh", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid JWT Refresh Token");

    let (status, body) = call(&t.app, "POST", "/api/web/account/me/logout", Some(jwt), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have successfully logged out");

    let (status, _) = call(
        &t.app,
        "POST",
        "/api/web/token/refresh",
        None,
        Some(json!({"refresh_token": rotated["refresh_token"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let t = setup().await;
    let (status, body) = call(&t.app, "GET", "/api/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You must be logged in.");

    let token = register(&t.app, "jane@example.com").await;
    let (status, body) = call(&t.app, "GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access Denied.");
}

#[tokio::test]
async fn test_admin_list_paginates_active_users() {
    let t = setup().await;
    let now = Utc::now();
    for i in 0..30 {
        let (mut user, _) = User::create(
            &format!("user{i:02}@example.com"),
            None,
            None,
            Some(format!("Last{i:02}")),
            &["ROLE_USER"],
            now,
        )
        .unwrap();
        if i >= 20 {
            user.soft_delete(now);
        }
        t.repositories.users.save(&user).await.unwrap();
    }
    let token = admin_token(&t.app).await;

    let (status, body) = call(&t.app, "GET", "/api/admin/users?limit=10", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalItems"], 21);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);

    let (_, body) = call(
        &t.app,
        "GET",
        "/api/admin/users?limit=10&page=4&withDeleted=true",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["totalItems"], 31);
    assert_eq!(body["totalPages"], 4);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &t.app,
        "GET",
        "/api/admin/users?limit=2&page=18446744073709551615",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalItems"], 21);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_user_lifecycle() {
    let t = setup().await;
    let token = admin_token(&t.app).await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/admin/users",
        Some(&token),
        Some(json!({"email": "bob@example.com", "password": "secret", "role": "ROLE_ADMIN"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "ROLE_ADMIN");
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &t.app,
        "PATCH",
        &format!("/api/admin/user/{id}"),
        Some(&token),
        Some(json!({"email": "bob@example.com", "last_name": "Builder", "role": "ROLE_USER"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["display_name"], "Builder");
    assert_eq!(body["user"]["roles"], json!(["ROLE_USER"]));

    let (status, body) = call(
        &t.app,
        "PATCH",
        &format!("/api/admin/user/delete/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["user"]["deleted_at"].is_null());

    let (status, body) = call(
        &t.app,
        "PATCH",
        &format!("/api/admin/user/restore/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"]["deleted_at"].is_null());

    let (status, body) = call(&t.app, "DELETE", &format!("/api/admin/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User successfully deleted.");

    let (status, body) = call(&t.app, "DELETE", &format!("/api/admin/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_admin_cannot_soft_delete_self() {
    let t = setup().await;
    let token = admin_token(&t.app).await;

    let (status, body) = call(
        &t.app,
        "PATCH",
        &format!("/api/admin/user/delete/{}", t.admin.id()),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User cannot soft-delete self");
}

#[tokio::test]
async fn test_publish_update() {
    let t = setup().await;
    let token = register(&t.app, "jane@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/app/test-mercure",
        Some(&token),
        Some(json!({"topic": "custom::topic", "payload": {"hello": "world"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_dispatched"], "OK");
}
