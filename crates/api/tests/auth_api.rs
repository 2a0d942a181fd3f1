//! HTTP-level integration tests for signup, login, token refresh and logout.

mod common;

use axum::http::StatusCode;
use beheard_api::auth::password::hash_password;
use beheard_db::models::user::CreateUser;
use beheard_db::repositories::UserRepo;
use common::{body_json, get_auth, post_json, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSWORD: &str = "correct-horse-battery";

/// Create a user directly in the database.
async fn create_test_user(pool: &PgPool, email: &str) -> beheard_db::models::user::User {
    let input = CreateUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

// ---------------------------------------------------------------------------
// Signup
// ---------------------------------------------------------------------------

/// Signup returns 201 with both tokens and the new user.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_signup_returns_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = json!({ "email": "Ana@Example.com", "password": PASSWORD, "name": "Ana" });
    let response = post_json(app, "/api/v1/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["data"]["accessToken"].is_string());
    assert!(json["data"]["refreshToken"].is_string());
    assert!(json["data"]["expiresIn"].is_number());
    assert_eq!(json["data"]["user"]["email"], "ana@example.com");
    assert_eq!(json["data"]["user"]["name"], "Ana");
}

/// A second signup with the same email (any case) is a conflict.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_signup_duplicate_email(pool: PgPool) {
    create_test_user(&pool, "dup@example.com").await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "DUP@example.com", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let user = create_test_user(&pool, "login@example.com").await;
    let app = common::build_test_app(pool);

    let body = json!({ "email": "login@example.com", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["id"], user.id);
    assert!(json["data"]["accessToken"].is_string());
}

/// Wrong password and unknown email are indistinguishable.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_failures_share_one_message(pool: PgPool) {
    create_test_user(&pool, "wrongpw@example.com").await;
    let app = common::build_test_app(pool);

    let wrong_password = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "wrongpw@example.com", "password": "not-the-password" }),
    )
    .await;
    let unknown_email = post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": "nobody@example.com", "password": PASSWORD }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a["error"]["message"], b["error"]["message"]);
}

// ---------------------------------------------------------------------------
// Refresh and logout
// ---------------------------------------------------------------------------

/// A refresh token can be used once; the rotated token replaces it.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_refresh_rotates_token(pool: PgPool) {
    create_test_user(&pool, "refresh@example.com").await;
    let app = common::build_test_app(pool);

    let login = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "refresh@example.com", "password": PASSWORD }),
    )
    .await;
    let login = body_json(login).await;
    let refresh_token = login["data"]["refreshToken"].as_str().unwrap().to_string();

    let first = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refreshToken": refresh_token }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_ne!(first["data"]["refreshToken"], login["data"]["refreshToken"]);

    let replay = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refreshToken": refresh_token }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

/// Logout revokes every refresh token of the caller.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_logout_revokes_refresh_tokens(pool: PgPool) {
    let user = create_test_user(&pool, "logout@example.com").await;
    let app = common::build_test_app(pool);

    let login = post_json(
        app.clone(),
        "/api/v1/auth/login",
        json!({ "email": "logout@example.com", "password": PASSWORD }),
    )
    .await;
    let login = body_json(login).await;
    let refresh_token = login["data"]["refreshToken"].as_str().unwrap().to_string();

    let logout = post_json_auth(app.clone(), "/api/v1/auth/logout", json!({}), user.id).await;
    assert_eq!(logout.status(), StatusCode::OK);

    let refresh = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refreshToken": refresh_token }),
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_me_returns_profile(pool: PgPool) {
    let user = create_test_user(&pool, "me@example.com").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/me", user.id).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
}
