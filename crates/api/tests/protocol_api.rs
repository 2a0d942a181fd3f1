//! The five-stage protocol over HTTP, from compact to a resolved session.

mod common;

use axum::http::StatusCode;
use beheard_core::types::DbId;
use common::{
    active_session, body_json, create_user, get_auth, get_ok, post_created, post_json_auth,
    post_ok,
};
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Pair {
    app: axum::Router,
    base: String,
    alex: DbId,
    sam: DbId,
}

async fn pair(pool: PgPool) -> Pair {
    let alex = create_user(&pool, "alex@example.com").await;
    let sam = create_user(&pool, "sam@example.com").await;
    let app = common::build_test_app(pool);
    let session_id = active_session(app.clone(), alex, sam, "sam@example.com").await;
    Pair {
        app,
        base: format!("/api/v1/sessions/{session_id}"),
        alex,
        sam,
    }
}

impl Pair {
    async fn post(&self, path: &str, body: Value, user: DbId) -> Value {
        post_ok(self.app.clone(), &format!("{}{path}", self.base), body, user).await
    }

    async fn advance(&self, user: DbId, force: bool) -> Value {
        self.post("/stages/advance", json!({ "force": force }), user).await
    }

    async fn advance_both(&self) {
        for user in [self.alex, self.sam] {
            let advanced = self.advance(user, false).await;
            assert_eq!(advanced["data"]["advanced"], true, "{advanced}");
        }
    }

    async fn through_witness(&self) {
        for user in [self.alex, self.sam] {
            self.post("/compact/sign", json!({ "agreed": true }), user).await;
        }
        self.advance_both().await;
        for user in [self.alex, self.sam] {
            self.post("/feel-heard", json!({ "confirmed": true }), user).await;
        }
        self.advance_both().await;
    }

    async fn share_empathy(&self, user: DbId, content: &str) {
        self.post("/empathy/draft", json!({ "content": content }), user).await;
        self.post("/empathy/consent", json!({ "consent": true }), user).await;
    }

    async fn through_empathy(&self) {
        self.share_empathy(self.alex, "You felt alone with the bills").await;
        self.share_empathy(self.sam, "You felt I did not trust you").await;
        for user in [self.alex, self.sam] {
            self.post("/empathy/validate", json!({ "validated": true }), user).await;
        }
        self.advance_both().await;
    }

    async fn through_needs(&self) {
        for user in [self.alex, self.sam] {
            let created = post_created(
                self.app.clone(),
                &format!("{}/needs", self.base),
                json!({ "category": "FAIRNESS", "need": "Share the household load" }),
                user,
            )
            .await;
            assert_eq!(created["data"]["need"]["category"], "FAIRNESS");
            let need_id = created["data"]["need"]["id"].as_i64().unwrap();
            self.post("/needs/confirm", json!({ "needIds": [need_id] }), user).await;
            let shared = self.post("/needs/share", json!({}), user).await;
            assert_eq!(shared["data"]["shared"], true);
        }
        self.advance_both().await;
    }
}

// ---------------------------------------------------------------------------
// Test: force lifts waiting on the partner, nothing else
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn force_skips_partner_compact_signature(pool: PgPool) {
    let p = pair(pool).await;
    p.post("/compact/sign", json!({ "agreed": true }), p.alex).await;

    let waiting = p.advance(p.alex, false).await;
    assert_eq!(waiting["data"]["advanced"], false);
    assert_eq!(
        waiting["data"]["blockedReason"],
        "Waiting for your partner to sign the compact"
    );

    let forced = p.advance(p.alex, true).await;
    assert_eq!(forced["data"]["advanced"], true);
    assert_eq!(forced["data"]["newStage"], 1);
    assert_eq!(forced["data"]["newStatus"], "IN_PROGRESS");

    // Sam has not signed; force does not lift the own-signature gate.
    let unsigned = p.advance(p.sam, true).await;
    assert_eq!(unsigned["data"]["advanced"], false);
    assert_eq!(unsigned["data"]["newStage"], 0);
    assert_eq!(unsigned["data"]["blockedReason"], "Sign the compact");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn advance_accepts_an_empty_body(pool: PgPool) {
    let p = pair(pool).await;

    let response = common::post_raw_auth(
        p.app.clone(),
        &format!("{}/stages/advance", p.base),
        "",
        p.alex,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["advanced"], false);
}

// ---------------------------------------------------------------------------
// Test: empathy drafts, consent and validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn empathy_attempt_is_shared_then_validated(pool: PgPool) {
    let p = pair(pool).await;
    p.through_witness().await;

    let draft = p
        .post("/empathy/draft", json!({ "content": "You felt unheard" }), p.alex)
        .await;
    assert_eq!(draft["data"]["draft"]["version"], 1);
    let draft = p
        .post(
            "/empathy/draft",
            json!({ "content": "You felt unheard and tired", "readyToShare": true }),
            p.alex,
        )
        .await;
    assert_eq!(draft["data"]["draft"]["version"], 2);

    // Drafts stay private until consent.
    let hidden = get_auth(p.app.clone(), &format!("{}/empathy/partner", p.base), p.sam).await;
    assert_eq!(hidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(hidden).await["error"]["code"], "CONSENT_REQUIRED");

    let shared = p.post("/empathy/consent", json!({ "consent": true }), p.alex).await;
    assert_eq!(shared["data"]["consented"], true);
    assert_eq!(shared["data"]["attempt"]["content"], "You felt unheard and tired");

    let locked = post_json_auth(
        p.app.clone(),
        &format!("{}/empathy/draft", p.base),
        json!({ "content": "Too late" }),
        p.alex,
    )
    .await;
    assert_eq!(locked.status(), StatusCode::CONFLICT);

    let seen = get_ok(p.app.clone(), &format!("{}/empathy/partner", p.base), p.sam).await;
    assert_eq!(seen["data"]["attempt"]["content"], "You felt unheard and tired");
    assert!(seen["data"]["myValidation"].is_null());

    let verdict = p
        .post(
            "/empathy/validate",
            json!({ "validated": true, "feedback": "Spot on", "consentToShareFeedback": true }),
            p.sam,
        )
        .await;
    assert_eq!(verdict["data"]["recorded"], true);
    assert_eq!(verdict["data"]["validation"]["validated"], true);

    let again = post_json_auth(
        p.app.clone(),
        &format!("{}/empathy/validate", p.base),
        json!({ "validated": false }),
        p.sam,
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    // Alex is validated but still has to review Sam's attempt.
    let blocked = p.advance(p.alex, false).await;
    assert_eq!(blocked["data"]["advanced"], false);
    assert_eq!(
        blocked["data"]["blockedReason"],
        "Review your partner's empathy attempt"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rejected_empathy_requires_force(pool: PgPool) {
    let p = pair(pool).await;
    p.through_witness().await;
    p.share_empathy(p.alex, "You felt unheard").await;
    p.share_empathy(p.sam, "You felt rushed").await;

    p.post("/empathy/validate", json!({ "validated": true }), p.sam).await;
    p.post("/empathy/validate", json!({ "validated": false }), p.alex).await;

    let alex = p.advance(p.alex, false).await;
    assert_eq!(alex["data"]["advanced"], true);
    assert_eq!(alex["data"]["newStage"], 3);

    let sam = p.advance(p.sam, false).await;
    assert_eq!(sam["data"]["advanced"], false);
    assert_eq!(
        sam["data"]["blockedReason"],
        "Waiting for your partner to validate your empathy attempt"
    );

    let forced = p.advance(p.sam, true).await;
    assert_eq!(forced["data"]["advanced"], true);
    assert_eq!(forced["data"]["newStage"], 3);
}

// ---------------------------------------------------------------------------
// Test: strategies, agreement and resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn agreed_strategy_resolves_session(pool: PgPool) {
    let p = pair(pool).await;
    p.through_witness().await;
    p.through_empathy().await;

    p.through_needs().await;

    let partner_needs = get_ok(p.app.clone(), &format!("{}/needs/partner", p.base), p.alex).await;
    let partner_needs = partner_needs["data"]["needs"].as_array().unwrap();
    assert_eq!(partner_needs.len(), 1);
    assert_eq!(partner_needs[0]["need"], "Share the household load");
    assert_eq!(partner_needs[0]["confirmed"], true);

    let strategies_uri = format!("{}/strategies", p.base);
    let walk = post_created(
        p.app.clone(),
        &strategies_uri,
        json!({
            "description": "Take a short walk before talking about money",
            "needsAddressed": ["Share the household load"],
        }),
        p.alex,
    )
    .await;
    let walk_id = walk["data"]["strategy"]["id"].as_i64().unwrap();
    let budget = post_created(
        p.app.clone(),
        &strategies_uri,
        json!({
            "description": "Review the budget together every Sunday",
            "needsAddressed": ["Share the household load"],
            "duration": "One month",
        }),
        p.sam,
    )
    .await;
    let budget_id = budget["data"]["strategy"]["id"].as_i64().unwrap();

    let listed = get_ok(p.app.clone(), &strategies_uri, p.sam).await;
    assert_eq!(listed["data"]["strategies"].as_array().unwrap().len(), 2);
    assert!(listed["data"]["strategies"][0].get("proposedBy").is_none());

    let ranking = p
        .post("/strategies/rank", json!({ "rankedIds": [budget_id, walk_id] }), p.alex)
        .await;
    assert_eq!(ranking["data"]["ranking"]["rankedIds"], json!([budget_id, walk_id]));
    p.post("/strategies/rank", json!({ "rankedIds": [walk_id] }), p.sam).await;

    let unknown = post_json_auth(
        p.app.clone(),
        &format!("{}/strategies/rank", p.base),
        json!({ "rankedIds": [walk_id + budget_id + 100] }),
        p.sam,
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let proposed = post_created(
        p.app.clone(),
        &format!("{}/agreements", p.base),
        json!({ "strategyId": budget_id }),
        p.alex,
    )
    .await;
    assert_eq!(proposed["data"]["agreement"]["status"], "PROPOSED");
    let agreement_id = proposed["data"]["agreement"]["id"].as_i64().unwrap();
    let confirm_uri = format!("/agreements/{agreement_id}/confirm");

    let own = post_json_auth(
        p.app.clone(),
        &format!("{}{confirm_uri}", p.base),
        json!({ "confirmed": true }),
        p.alex,
    )
    .await;
    assert_eq!(own.status(), StatusCode::FORBIDDEN);

    let agreed = p.post(&confirm_uri, json!({ "confirmed": true }), p.sam).await;
    assert_eq!(agreed["data"]["agreement"]["status"], "AGREED");
    assert!(agreed["data"]["agreement"]["agreedAt"].is_string());

    let first = p.advance(p.alex, false).await;
    assert_eq!(first["data"]["advanced"], true);
    assert_eq!(first["data"]["newStage"], 4);
    assert_eq!(first["data"]["newStatus"], "COMPLETED");
    assert_eq!(first["data"]["sessionResolved"], false);

    let second = p.advance(p.sam, false).await;
    assert_eq!(second["data"]["advanced"], true);
    assert_eq!(second["data"]["sessionResolved"], true);

    let session = get_ok(p.app.clone(), &p.base, p.alex).await;
    assert_eq!(session["data"]["status"], "RESOLVED");
}
