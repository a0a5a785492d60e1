//! `OpenAPI` document for the BHP Connect API.

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use connect_api::handlers::{
    admin, applications, artifacts, auth, documents, facilities, files, health, me, messages,
    notifications,
};
use connect_api::models;

/// Security scheme modifier for Bearer authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BHP Connect API",
        version = "0.1.0",
        description = "Oversight portal for Behavioral Health Professionals and residential facilities",
        license(name = "BSL-1.1")
    ),
    servers((url = "http://localhost:8080", description = "Development server")),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Service health"),
        (name = "Auth", description = "Registration and login"),
        (name = "Account", description = "Own status page and MFA"),
        (name = "Admin", description = "Registration decisions and audit log"),
        (name = "Facility Applications", description = "BHRF applications to a BHP"),
        (name = "Facilities", description = "Facilities"),
        (name = "Documents", description = "Intake and ASAM workflow documents"),
        (name = "Artifacts", description = "Compliance documents and credentials"),
        (name = "Messages", description = "Facility messaging"),
        (name = "Notifications", description = "Dashboard notifications"),
        (name = "Files", description = "Signed downloads")
    ),
    paths(
        health::health,
        auth::register_bhp,
        auth::register_bhrf,
        auth::available_bhps,
        auth::login,
        me::me,
        me::mfa_setup,
        me::mfa_enable,
        admin::pending_users,
        admin::decide_user,
        admin::audit_log,
        applications::list_applications,
        applications::decide_application,
        facilities::list_facilities,
        facilities::get_facility,
        facilities::update_facility,
        documents::create_document,
        documents::list_documents,
        documents::get_document,
        documents::save_document,
        documents::submit_document,
        documents::decide_document,
        documents::export_document,
        artifacts::request_artifact,
        artifacts::upload_artifact,
        artifacts::upload_facility_artifact,
        artifacts::list_facility_artifacts,
        artifacts::signed_url,
        artifacts::artifact_versions,
        artifacts::delete_artifact,
        artifacts::list_credentials,
        artifacts::upload_credential,
        messages::send_message,
        messages::inbox,
        messages::unread_count,
        messages::facility_thread,
        messages::mark_read,
        notifications::notifications,
        files::download,
    ),
    components(schemas(
        connect_api::ErrorResponse,
        health::HealthResponse,
        models::RegisterBhpRequest,
        models::RegisterBhrfRequest,
        models::RegistrationResponse,
        models::AvailableBhpResponse,
        models::LoginRequest,
        models::TokenResponse,
        models::MeResponse,
        models::PendingActorResponse,
        models::ActorDecisionResponse,
        models::MfaSetupResponse,
        models::MfaEnableRequest,
        models::DecisionKind,
        models::DecisionRequest,
        models::UpdateFacilityRequest,
        models::CreateDocumentRequest,
        models::SaveDocumentRequest,
        models::DocumentDecisionRequest,
        models::RequestArtifactRequest,
        models::UploadRequest,
        models::NewArtifactUploadRequest,
        models::CredentialUploadRequest,
        models::SendMessageRequest,
        models::UnreadCountResponse,
    ))
)]
pub struct ApiDoc;

/// `GET /openapi.json`.
pub fn openapi_routes() -> Router {
    Router::new().route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
