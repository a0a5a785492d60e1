//! End-to-end tests of the HTTP API over in-memory stores.

mod common;

use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use common::{uuid, TestApp, BASE_URL, PASSWORD};
use connect_governance::MockPdfRenderer;
use serde_json::json;

// ============================================================================
// Sessions and the approval gate
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_session_routes_require_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.get("/facilities", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pending_actor_sees_status_page_only() {
    let app = TestApp::new().await;
    let (email, _) = app.register_bhp().await;
    let token = app.login(&email).await;

    let (status, me) = app.get("/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["approval_status"], "PENDING");
    assert_eq!(me["role"], "BHP");

    for uri in ["/facilities", "/notifications", "/messages", "/facility-applications"] {
        let (status, body) = app.get(uri, &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"], "forbidden");
    }
}

#[tokio::test]
async fn test_approval_takes_effect_without_new_token() {
    let app = TestApp::new().await;
    let (email, actor_id) = app.register_bhp().await;
    let token = app.login(&email).await;

    let (status, _) = app.get("/facilities", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.approve_actor(actor_id).await;

    // The token still says PENDING; the actor is re-resolved per request.
    let (status, body) = app.get("/facilities", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_registration_decided_once() {
    let app = TestApp::new().await;
    let (_, actor_id) = app.register_bhp().await;
    app.approve_actor(actor_id).await;

    let (status, body) = app
        .post(
            &format!("/admin/users/{actor_id}/decision"),
            &app.admin_token,
            json!({ "decision": "REJECT", "reason": "changed my mind" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = TestApp::new().await;
    let (_, actor_id) = app.register_bhp().await;

    let (status, body) = app
        .post(
            &format!("/admin/users/{actor_id}/decision"),
            &app.admin_token,
            json!({ "decision": "REJECT" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "reason");

    let (status, body) = app
        .post(
            &format!("/admin/users/{actor_id}/decision"),
            &app.admin_token,
            json!({ "decision": "REJECT", "reason": "License could not be verified" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approval_status"], "REJECTED");
    assert_eq!(body["rejection_reason"], "License could not be verified");
}

#[tokio::test]
async fn test_admin_routes_reject_other_roles() {
    let app = TestApp::new().await;
    let (token, _, _) = app.approved_bhp().await;

    let (status, _) = app.get("/admin/users/pending", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/admin/audit", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    let (email, _) = app.register_bhp().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register/bhp",
            None,
            Some(json!({
                "email": email.to_uppercase(),
                "password": PASSWORD,
                "display_name": "Someone Else",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_registration_validation_names_field() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register/bhp",
            None,
            Some(json!({
                "email": TestApp::unique_email("short"),
                "password": "short",
                "display_name": "Dr. Short",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "password");
}

#[tokio::test]
async fn test_bhrf_must_pick_an_approved_bhp() {
    let app = TestApp::new().await;
    let (_, pending_bhp) = app.register_bhp().await;

    // Pending BHPs are not offered and cannot be applied to.
    let (status, listing) = app.send(Method::GET, "/auth/bhps", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listing.as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register/bhrf",
            None,
            Some(json!({
                "email": TestApp::unique_email("bhrf"),
                "password": PASSWORD,
                "display_name": "Operator",
                "bhp_id": pending_bhp,
                "facility_name": "Sunrise House",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, _, bhp_profile_id) = app.approved_bhp().await;
    let (_, listing) = app.send(Method::GET, "/auth/bhps", None, None).await;
    assert_eq!(uuid(&listing[0]["bhp_id"]), bhp_profile_id);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = TestApp::new().await;
    let (email, _) = app.register_bhp().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized: Invalid credentials");

    // An unknown email is indistinguishable from a wrong password.
    let (status, unknown) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@connect.test", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, body);
}

#[tokio::test]
async fn test_mfa_enrolment_and_login() {
    let app = TestApp::new().await;
    let (email, _) = app.register_bhp().await;
    let token = app.login(&email).await;

    let (status, setup) = app.post("/me/mfa/setup", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let secret = setup["secret"].as_str().unwrap().to_string();
    assert!(setup["otpauth_uri"].as_str().unwrap().starts_with("otpauth://"));

    let (status, body) = app
        .post("/me/mfa/enable", &token, json!({ "code": "000000" }))
        .await;
    if status != StatusCode::NO_CONTENT {
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "code");
        let code = connect_auth::current_totp_code(&secret).unwrap();
        let (status, _) = app
            .post("/me/mfa/enable", &token, json!({ "code": code }))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized: MFA code required");

    let code = connect_auth::current_totp_code(&secret).unwrap();
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD, "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "Bearer");
}

// ============================================================================
// Facilities and workflow documents
// ============================================================================

#[tokio::test]
async fn test_application_approval_creates_facility() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (status, facilities) = app.get("/facilities", &fx.bhrf_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uuid(&facilities[0]["id"]), fx.facility_id);
    assert_eq!(facilities[0]["name"], "Sunrise House");

    let (_, me) = app.get("/me", &fx.bhrf_token).await;
    assert_eq!(uuid(&me["facility_id"]), fx.facility_id);

    // Another BHP cannot see it at all.
    let (other_token, _, _) = app.approved_bhp().await;
    let (status, _) = app
        .get(&format!("/facilities/{}", fx.facility_id), &other_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_intake_flow() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    // The overseeing BHP reads and decides but never drafts.
    let (status, _) = app
        .post(
            &format!("/facilities/{}/documents", fx.facility_id),
            &fx.bhp_token,
            json!({ "kind": "INTAKE", "subject_name": "J. Doe" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, draft) = app
        .post(
            &format!("/facilities/{}/documents", fx.facility_id),
            &fx.bhrf_token,
            json!({ "kind": "INTAKE", "subject_name": "J. Doe", "content": { "step1": "ok" } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    assert_eq!(draft["status"], "DRAFT");
    let doc_id = uuid(&draft["id"]);

    let (status, saved) = app
        .send(
            Method::PUT,
            &format!("/documents/{doc_id}"),
            Some(&fx.bhrf_token),
            Some(json!({ "content": { "step1": "ok", "step2": "ok" }, "draft_step": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["draft_step"], 2);

    let (status, submitted) = app
        .post(&format!("/documents/{doc_id}/submit"), &fx.bhrf_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "SUBMITTED");

    // Only the overseeing BHP decides.
    let (status, _) = app
        .post(
            &format!("/documents/{doc_id}/decision"),
            &fx.bhrf_token,
            json!({ "outcome": "APPROVED" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &format!("/documents/{doc_id}/decision"),
            &fx.bhp_token,
            json!({ "outcome": "CONDITIONAL" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "reason");

    let (status, decided) = app
        .post(
            &format!("/documents/{doc_id}/decision"),
            &fx.bhp_token,
            json!({ "outcome": "CONDITIONAL", "reason": "Needs updated medication list" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "CONDITIONAL");
    assert_eq!(decided["decision_reason"], "Needs updated medication list");

    // Decided is terminal for submission.
    let (status, _) = app
        .post(&format!("/documents/{doc_id}/submit"), &fx.bhrf_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = app
        .get(
            &format!("/facilities/{}/documents?kind=INTAKE", fx.facility_id),
            &fx.bhp_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_facility_lists_use_page_envelope() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    for kind in ["INTAKE", "ASAM"] {
        let (status, _) = app
            .post(
                &format!("/facilities/{}/documents", fx.facility_id),
                &fx.bhrf_token,
                json!({ "kind": kind, "subject_name": "J. Doe" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app
        .get(
            &format!("/facilities/{}/documents?limit=500", fx.facility_id),
            &fx.bhp_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["limit"], 100);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, page) = app
        .get(
            &format!("/facilities/{}/documents?limit=1&offset=1", fx.facility_id),
            &fx.bhp_token,
        )
        .await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (status, thread) = app
        .get(&format!("/facilities/{}/messages", fx.facility_id), &fx.bhp_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["total"], 0);
    assert!(thread["items"].as_array().unwrap().is_empty());

    let (status, audit) = app.get("/admin/audit?limit=1", &app.admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["limit"], 1);
    assert_eq!(audit["items"].as_array().unwrap().len(), 1);
    assert!(audit["total"].as_i64().unwrap() > 1);
}

#[tokio::test]
async fn test_document_pdf_export() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (_, draft) = app
        .post(
            &format!("/facilities/{}/documents", fx.facility_id),
            &fx.bhrf_token,
            json!({ "kind": "ASAM", "subject_name": "R. Roe", "content": { "dimension1": 2 } }),
        )
        .await;
    let doc_id = uuid(&draft["id"]);

    let (status, bytes) = app
        .send_raw(
            Method::GET,
            &format!("/documents/{doc_id}/pdf"),
            Some(&fx.bhp_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(MockPdfRenderer::MAGIC));

    let calls = app.renderer.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "asam");
    assert_eq!(calls[0].1["subject_name"], "R. Roe");

    // Outsiders cannot export it.
    let (other_token, _, _) = app.approved_bhp().await;
    let (status, _) = app
        .send_raw(
            Method::GET,
            &format!("/documents/{doc_id}/pdf"),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.renderer.calls().await.len(), 1);
}

// ============================================================================
// Artifacts, messages, notifications, audit
// ============================================================================

#[tokio::test]
async fn test_requested_artifact_upload_and_download() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (status, requested) = app
        .post(
            &format!("/facilities/{}/artifacts/requests", fx.facility_id),
            &fx.bhp_token,
            json!({ "title": "Fire inspection", "category": "FACILITY_DOCUMENT" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{requested}");
    assert_eq!(requested["state"], "REQUESTED");
    let artifact_id = uuid(&requested["id"]);

    let (_, notes) = app.get("/notifications", &fx.bhrf_token).await;
    assert!(notes
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["id"] == "bhrf-requested-artifacts"));

    let content = b"%PDF-1.7 inspection";
    let (status, uploaded) = app
        .post(
            &format!("/artifacts/{artifact_id}/upload"),
            &fx.bhrf_token,
            json!({
                "content_base64": STANDARD.encode(content),
                "content_type": "application/pdf",
                "expires_at": Utc::now() + Duration::days(90),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{uploaded}");
    assert_eq!(uploaded["state"], "UPLOADED");

    let (_, listed) = app
        .get(&format!("/facilities/{}/artifacts", fx.facility_id), &fx.bhp_token)
        .await;
    assert_eq!(listed[0]["status"], "VALID");

    let (status, signed) = app
        .get(&format!("/artifacts/{artifact_id}/url"), &fx.bhp_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let url = signed["url"].as_str().unwrap();
    let path = url.strip_prefix(BASE_URL).unwrap();

    let (status, bytes) = app.send_raw(Method::GET, path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, content);

    let tampered = format!("{path}x");
    let (status, _) = app.send_raw(Method::GET, &tampered, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_rejects_bad_base64() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (status, body) = app
        .post(
            &format!("/facilities/{}/artifacts", fx.facility_id),
            &fx.bhrf_token,
            json!({
                "title": "CPR card",
                "category": "EMPLOYEE_DOCUMENT",
                "employee_name": "A. Smith",
                "content_base64": "***",
                "content_type": "image/png",
                "no_expiration": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "content_base64");
}

#[tokio::test]
async fn test_bhp_credentials_are_profile_scoped() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (status, _) = app
        .post(
            "/me/credentials",
            &fx.bhp_token,
            json!({
                "title": "State license",
                "content_base64": STANDARD.encode(b"license"),
                "content_type": "application/pdf",
                "expires_at": Utc::now() - Duration::days(1),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, credentials) = app.get("/me/credentials", &fx.bhp_token).await;
    assert_eq!(credentials[0]["status"], "EXPIRED");

    let (_, notes) = app.get("/notifications", &fx.bhp_token).await;
    assert_eq!(notes[0]["id"], "bhp-expired-credentials");
    assert_eq!(notes[0]["severity"], "urgent");

    let (status, _) = app.get("/me/credentials", &fx.bhrf_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_messages_between_facility_parties() {
    let app = TestApp::new().await;
    let fx = app.facility().await;

    let (status, sent) = app
        .post(
            "/messages",
            &fx.bhrf_token,
            json!({
                "facility_id": fx.facility_id,
                "subject": "Census",
                "body": "Two new residents this week.",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sent}");
    assert_eq!(uuid(&sent["recipient_id"]), fx.bhp_actor_id);
    let message_id = uuid(&sent["id"]);

    let (_, count) = app.get("/messages/unread-count", &fx.bhp_token).await;
    assert_eq!(count["unread"], 1);

    // The sender cannot mark their own message read.
    let (status, _) = app
        .post(&format!("/messages/{message_id}/read"), &fx.bhrf_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, first) = app
        .post(&format!("/messages/{message_id}/read"), &fx.bhp_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app
        .post(&format!("/messages/{message_id}/read"), &fx.bhp_token, json!({}))
        .await;
    assert_eq!(first["read_at"], second["read_at"]);

    let (_, inbox) = app.get("/messages?unread_only=true", &fx.bhp_token).await;
    assert_eq!(inbox["total"], 0);

    let (_, thread) = app
        .get(&format!("/facilities/{}/messages", fx.facility_id), &fx.bhrf_token)
        .await;
    assert_eq!(thread["total"], 1);
    assert_eq!(thread["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_log_records_decisions() {
    let app = TestApp::new().await;
    let (_, actor_id) = app.register_bhp().await;
    app.approve_actor(actor_id).await;

    let (status, entries) = app
        .get(
            &format!("/admin/audit?entity_id={actor_id}"),
            &app.admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries["total"], 2);
    let actions: Vec<_> = entries["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["USER_REGISTERED", "USER_APPROVED"]);

    let (_, pending) = app.get("/admin/users/pending", &app.admin_token).await;
    assert_eq!(pending["total"], 0);
}
