//! Test harness for the HTTP API.
//!
//! Builds the full router over in-memory stores and local file storage in a
//! temp dir, and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use connect_api::{router, Backends, ConnectState, SessionKeys};
use connect_auth::test_keys::{TEST_PRIVATE_KEY, TEST_PUBLIC_KEY};
use connect_auth::PasswordHasher;
use connect_core::ActorId;
use connect_governance::services::{
    InMemoryArtifactStore, InMemoryDirectoryStore, InMemoryMessageStore, InMemoryWorkflowStore,
};
use connect_governance::{
    ActorRecord, ApprovalStatus, InMemoryAuditStore, LocalObjectStorage, MockEmailSender,
    MockPdfRenderer, Role,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";
pub const BASE_URL: &str = "http://connect.test";

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// An approved facility with both parties logged in.
pub struct FacilityFixture {
    pub facility_id: Uuid,
    pub bhp_token: String,
    pub bhp_actor_id: Uuid,
    pub bhrf_token: String,
    pub bhrf_actor_id: Uuid,
}

pub struct TestApp {
    pub router: Router,
    pub directory: InMemoryDirectoryStore,
    pub audit: Arc<InMemoryAuditStore>,
    pub renderer: MockPdfRenderer,
    pub sessions: SessionKeys,
    pub admin_token: String,
    _files: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        init_test_logging();
        let files = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(LocalObjectStorage::new(
            files.path(),
            BASE_URL,
            b"test-signing-secret".to_vec(),
        ));
        let directory = InMemoryDirectoryStore::new();
        let audit = Arc::new(InMemoryAuditStore::new());
        let sessions = SessionKeys::new(TEST_PRIVATE_KEY, TEST_PUBLIC_KEY, 3600);
        let renderer = MockPdfRenderer::new();

        let state = ConnectState::new(
            Backends {
                directory: Arc::new(directory.clone()),
                workflows: Arc::new(InMemoryWorkflowStore::new()),
                artifacts: Arc::new(InMemoryArtifactStore::new()),
                messages: Arc::new(InMemoryMessageStore::new()),
                audit: audit.clone(),
                storage: storage.clone(),
                email: Arc::new(MockEmailSender::new()),
            },
            sessions.clone(),
            Duration::minutes(15),
        )
        .with_files(storage)
        .with_renderer(Arc::new(renderer.clone()))
        .with_password_hasher(PasswordHasher::with_params(1024, 1, 1).expect("params"));

        let admin = admin_record();
        directory.insert_actor(admin.clone()).await;
        let admin_token = sessions.issue(&admin).expect("admin token");

        Self {
            router: router(state),
            directory,
            audit,
            renderer,
            sessions,
            admin_token,
            _files: files,
        }
    }

    /// Send a request and decode the JSON response (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, json)
    }

    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, bytes.to_vec())
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub fn unique_email(prefix: &str) -> String {
        format!("{prefix}-{}@connect.test", Uuid::new_v4())
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().expect("token").to_string()
    }

    /// Register a BHP and return `(email, actor_id)`. Still PENDING.
    pub async fn register_bhp(&self) -> (String, Uuid) {
        let email = Self::unique_email("bhp");
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register/bhp",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "display_name": "Dr. Rivera",
                    "organisation_name": "Desert Behavioral Health",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
        (email, uuid(&body["actor_id"]))
    }

    pub async fn approve_actor(&self, actor_id: Uuid) {
        let (status, body) = self
            .post(
                &format!("/admin/users/{actor_id}/decision"),
                &self.admin_token,
                json!({ "decision": "APPROVE" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approval failed: {body}");
    }

    /// An approved BHP: `(token, actor_id, bhp_profile_id)`.
    pub async fn approved_bhp(&self) -> (String, Uuid, Uuid) {
        let (email, actor_id) = self.register_bhp().await;
        self.approve_actor(actor_id).await;
        let token = self.login(&email).await;
        let (_, me) = self.get("/me", &token).await;
        (token, actor_id, uuid(&me["bhp_profile_id"]))
    }

    /// Register a BHRF applying to `bhp_profile_id`: `(email, actor_id, application_id)`.
    pub async fn register_bhrf(&self, bhp_profile_id: Uuid) -> (String, Uuid, Uuid) {
        let email = Self::unique_email("bhrf");
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register/bhrf",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "display_name": "Sunrise Operator",
                    "bhp_id": bhp_profile_id,
                    "facility_name": "Sunrise House",
                    "address": "12 Mesa Rd",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
        (
            email,
            uuid(&body["actor_id"]),
            uuid(&body["facility_application_id"]),
        )
    }

    /// A BHP overseeing one approved facility.
    pub async fn facility(&self) -> FacilityFixture {
        let (bhp_token, bhp_actor_id, bhp_profile_id) = self.approved_bhp().await;
        let (email, bhrf_actor_id, application_id) = self.register_bhrf(bhp_profile_id).await;
        self.approve_actor(bhrf_actor_id).await;

        let (status, application) = self
            .post(
                &format!("/facility-applications/{application_id}/decision"),
                &bhp_token,
                json!({ "decision": "APPROVE" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "application failed: {application}");

        FacilityFixture {
            facility_id: uuid(&application["facility_id"]),
            bhp_token,
            bhp_actor_id,
            bhrf_token: self.login(&email).await,
            bhrf_actor_id,
        }
    }
}

pub fn uuid(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a uuid: {value}"))
}

fn admin_record() -> ActorRecord {
    let now = Utc::now();
    ActorRecord {
        id: ActorId::new(),
        email: TestApp::unique_email("admin"),
        display_name: "Admin".to_string(),
        password_hash: String::new(),
        role: Role::Admin,
        approval_status: ApprovalStatus::Approved,
        rejection_reason: None,
        bhp_profile_id: None,
        bhrf_profile_id: None,
        active: true,
        mfa_secret: None,
        mfa_enabled: false,
        decided_by: None,
        decided_at: None,
        created_at: now,
        updated_at: now,
    }
}
