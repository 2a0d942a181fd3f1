//! End-to-end session flow: invite, accept, sign the compact and advance.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_session, create_user, get, get_auth, post_json_auth, post_ok};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: creating a session
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_session_starts_invited(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/sessions",
        json!({ "inviteEmail": "sam@example.com" }),
        alex,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["session"]["status"], "INVITED");
    assert_eq!(json["data"]["session"]["createdBy"], alex);
    assert_eq!(json["data"]["invitation"]["status"], "PENDING");
    assert_eq!(json["data"]["emailSent"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cannot_invite_yourself(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/sessions",
        json!({ "inviteEmail": "ALEX@example.com" }),
        alex,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: outsiders cannot see a session
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn non_participant_gets_404(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let eve = create_user(&pool, "eve@example.com").await;
    let app = common::build_test_app(pool);

    let (session_id, _) = create_session(app.clone(), alex, "sam@example.com").await;
    let response = get_auth(app, &format!("/api/v1/sessions/{session_id}"), eve).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: the invitation is public and can be accepted once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn invitation_accept_activates_session(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let sam = create_user(&pool, "sam@example.com").await;
    let app = common::build_test_app(pool);

    let (session_id, invitation_id) = create_session(app.clone(), alex, "sam@example.com").await;

    let public = get(app.clone(), &format!("/api/v1/invitations/{invitation_id}")).await;
    assert_eq!(public.status(), StatusCode::OK);

    let own = post_json_auth(
        app.clone(),
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        alex,
    )
    .await;
    assert_ne!(own.status(), StatusCode::OK, "inviter cannot accept");

    let accepted = post_ok(
        app.clone(),
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        sam,
    )
    .await;
    assert_eq!(accepted["data"]["session"]["id"], session_id);
    assert_eq!(accepted["data"]["session"]["status"], "ACTIVE");

    let again = post_json_auth(
        app,
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        sam,
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Test: stage 0 gating
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn compact_gates_advance_until_both_sign(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let sam = create_user(&pool, "sam@example.com").await;
    let app = common::build_test_app(pool);

    let (session_id, invitation_id) = create_session(app.clone(), alex, "sam@example.com").await;
    let base = format!("/api/v1/sessions/{session_id}");

    // The creator may sign while the invitation is still open.
    let signed = post_ok(
        app.clone(),
        &format!("{base}/compact/sign"),
        json!({ "agreed": true }),
        alex,
    )
    .await;
    assert_eq!(signed["data"]["signed"], true);
    assert_eq!(signed["data"]["partnerSigned"], false);

    let twice = post_json_auth(
        app.clone(),
        &format!("{base}/compact/sign"),
        json!({ "agreed": true }),
        alex,
    )
    .await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);

    post_ok(
        app.clone(),
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        sam,
    )
    .await;

    // Partner has not signed: advance is refused without an error.
    let blocked = post_ok(app.clone(), &format!("{base}/stages/advance"), json!({}), alex).await;
    assert_eq!(blocked["data"]["advanced"], false);
    assert_eq!(blocked["data"]["newStage"], 0);
    assert!(blocked["data"]["blockedReason"].is_string());

    post_ok(
        app.clone(),
        &format!("{base}/compact/sign"),
        json!({ "agreed": true }),
        sam,
    )
    .await;

    let progress = get_auth(app.clone(), &format!("{base}/progress"), alex).await;
    assert_eq!(progress.status(), StatusCode::OK);
    let progress = body_json(progress).await;
    assert_eq!(progress["data"]["stage"], 0);
    assert_eq!(progress["data"]["canAdvance"], true);

    let advanced = post_ok(app.clone(), &format!("{base}/stages/advance"), json!({}), alex).await;
    assert_eq!(advanced["data"]["advanced"], true);
    assert_eq!(advanced["data"]["newStage"], 1);
    assert_eq!(advanced["data"]["newStatus"], "IN_PROGRESS");
    assert_eq!(advanced["data"]["sessionResolved"], false);

    // Stage 0 actions are closed once the caller has moved on.
    let late = post_json_auth(
        app,
        &format!("{base}/compact/sign"),
        json!({ "agreed": true }),
        alex,
    )
    .await;
    assert_eq!(late.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: partner content stays private until shared
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn partner_needs_require_consent(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let sam = create_user(&pool, "sam@example.com").await;
    let app = common::build_test_app(pool);

    let (session_id, invitation_id) = create_session(app.clone(), alex, "sam@example.com").await;
    post_ok(
        app.clone(),
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        sam,
    )
    .await;

    let response = get_auth(
        app,
        &format!("/api/v1/sessions/{session_id}/needs/partner"),
        alex,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONSENT_REQUIRED");
}

// ---------------------------------------------------------------------------
// Test: pausing stops stage work
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn paused_session_rejects_stage_work(pool: PgPool) {
    let alex = create_user(&pool, "alex@example.com").await;
    let sam = create_user(&pool, "sam@example.com").await;
    let app = common::build_test_app(pool);

    let (session_id, invitation_id) = create_session(app.clone(), alex, "sam@example.com").await;
    let base = format!("/api/v1/sessions/{session_id}");
    post_ok(
        app.clone(),
        &format!("/api/v1/invitations/{invitation_id}/accept"),
        json!({}),
        sam,
    )
    .await;

    let paused = post_ok(app.clone(), &format!("{base}/pause"), json!({}), alex).await;
    assert_eq!(paused["data"]["session"]["status"], "PAUSED");

    let response = post_json_auth(
        app.clone(),
        &format!("{base}/compact/sign"),
        json!({ "agreed": true }),
        sam,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "SESSION_NOT_ACTIVE");

    let resumed = post_ok(app, &format!("{base}/resume"), json!({}), sam).await;
    assert_eq!(resumed["data"]["session"]["status"], "ACTIVE");
}
