//! Router for the BHP Connect API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{
    admin, applications, artifacts, auth, documents, facilities, files, health, me, messages,
    notifications,
};
use crate::middleware::{require_approved, session_middleware};
use crate::state::ConnectState;

/// Base64 inflates the 10 MiB upload cap by a third.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the API router.
///
/// Layering, outermost first:
/// - public routes: registration, BHP listing, login, health, signed files
/// - session routes: any valid session, including PENDING accounts
/// - dashboard routes: APPROVED sessions only
pub fn router(state: ConnectState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register/bhp", post(auth::register_bhp))
        .route("/auth/register/bhrf", post(auth::register_bhrf))
        .route("/auth/bhps", get(auth::available_bhps))
        .route("/auth/login", post(auth::login))
        .route("/files/*key", get(files::download));

    let dashboard = Router::new()
        // Admin
        .route("/admin/users/pending", get(admin::pending_users))
        .route("/admin/users/:id/decision", post(admin::decide_user))
        .route("/admin/audit", get(admin::audit_log))
        // Facility applications
        .route("/facility-applications", get(applications::list_applications))
        .route(
            "/facility-applications/:id/decision",
            post(applications::decide_application),
        )
        // Facilities
        .route("/facilities", get(facilities::list_facilities))
        .route(
            "/facilities/:id",
            get(facilities::get_facility).put(facilities::update_facility),
        )
        // Workflow documents
        .route(
            "/facilities/:id/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/documents/:id",
            get(documents::get_document).put(documents::save_document),
        )
        .route("/documents/:id/submit", post(documents::submit_document))
        .route("/documents/:id/decision", post(documents::decide_document))
        .route("/documents/:id/pdf", get(documents::export_document))
        // Compliance artifacts
        .route(
            "/facilities/:id/artifacts",
            get(artifacts::list_facility_artifacts).post(artifacts::upload_facility_artifact),
        )
        .route(
            "/facilities/:id/artifacts/requests",
            post(artifacts::request_artifact),
        )
        .route("/artifacts/:id", axum::routing::delete(artifacts::delete_artifact))
        .route("/artifacts/:id/upload", post(artifacts::upload_artifact))
        .route("/artifacts/:id/url", get(artifacts::signed_url))
        .route("/artifacts/:id/versions", get(artifacts::artifact_versions))
        .route(
            "/me/credentials",
            get(artifacts::list_credentials).post(artifacts::upload_credential),
        )
        // Messages
        .route(
            "/messages",
            get(messages::inbox).post(messages::send_message),
        )
        .route("/messages/unread-count", get(messages::unread_count))
        .route("/messages/:id/read", post(messages::mark_read))
        .route("/facilities/:id/messages", get(messages::facility_thread))
        // Notifications
        .route("/notifications", get(notifications::notifications))
        .route_layer(middleware::from_fn(require_approved));

    let session = Router::new()
        .route("/me", get(me::me))
        .route("/me/mfa/setup", post(me::mfa_setup))
        .route("/me/mfa/enable", post(me::mfa_enable))
        .merge(dashboard)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(session)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
