//! Integration tests for cross-facility isolation.
//!
//! A BHP or BHRF never sees or mutates another owner's facility, documents,
//! artifacts or messages. Reads of foreign records are reported as not found.

mod common;

use connect_governance::services::{
    ArtifactRequest, ListOptions, NewMessage, NewWorkflowDocument, WorkflowFilter,
};
use connect_governance::{
    ApprovalDecision, ArtifactCategory, GovernanceError, RequestMetadata, WorkflowKind,
    WorkflowOutcome,
};

use common::TestContext;

fn intake() -> NewWorkflowDocument {
    NewWorkflowDocument {
        kind: WorkflowKind::Intake,
        subject_id: None,
        subject_name: "Resident".to_string(),
        content: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn test_foreign_bhp_cannot_see_or_decide_documents() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let owner = ctx.approved_bhp(&admin, "Owner").await;
    let stranger = ctx.approved_bhp(&admin, "Stranger").await;
    let (bhrf, facility) = ctx.bhrf_with_facility(&admin, &owner, "Willow Place").await;

    let doc = ctx
        .workflows
        .create_draft(&bhrf, facility.id, intake(), RequestMetadata::default())
        .await
        .unwrap();
    ctx.workflows
        .submit(&bhrf, doc.id, RequestMetadata::default())
        .await
        .unwrap();

    let read = ctx.workflows.get(&stranger, doc.id).await;
    assert!(matches!(read, Err(GovernanceError::NotFound { .. })));

    let decide = ctx
        .workflows
        .decide(&stranger, doc.id, WorkflowOutcome::Approved, None, RequestMetadata::default())
        .await;
    assert!(matches!(decide, Err(GovernanceError::NotFound { .. })));

    let list = ctx
        .workflows
        .list(&stranger, facility.id, WorkflowFilter::default(), &ListOptions::default())
        .await;
    assert!(matches!(list, Err(GovernanceError::NotFound { .. })));

    assert!(ctx.facilities.list(&stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bhrf_sees_only_its_own_facility() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let bhp = ctx.approved_bhp(&admin, "Shared").await;
    let (first, first_facility) = ctx.bhrf_with_facility(&admin, &bhp, "North").await;
    let (_second, second_facility) = ctx.bhrf_with_facility(&admin, &bhp, "South").await;

    let visible = ctx.facilities.list(&first).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, first_facility.id);

    let foreign = ctx
        .workflows
        .create_draft(&first, second_facility.id, intake(), RequestMetadata::default())
        .await;
    assert!(matches!(foreign, Err(GovernanceError::NotFound { .. })));

    // The BHP owning both sees both.
    assert_eq!(ctx.facilities.list(&bhp).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bhrf_cannot_request_artifacts_or_manage_facility() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let bhp = ctx.approved_bhp(&admin, "Manager").await;
    let (bhrf, facility) = ctx.bhrf_with_facility(&admin, &bhp, "Birch Hall").await;

    let request = ctx
        .artifacts
        .request(
            &bhrf,
            facility.id,
            ArtifactRequest {
                title: "Fire inspection".to_string(),
                category: ArtifactCategory::FacilityDocument,
                employee_name: None,
            },
            RequestMetadata::default(),
        )
        .await;
    assert!(matches!(request, Err(GovernanceError::Forbidden(_))));

    let update = ctx
        .facilities
        .update(
            &bhrf,
            facility.id,
            connect_governance::services::FacilityUpdate {
                name: Some("Renamed".to_string()),
                address: None,
            },
            RequestMetadata::default(),
        )
        .await;
    assert!(matches!(update, Err(GovernanceError::Forbidden(_))));
}

#[tokio::test]
async fn test_foreign_bhp_cannot_decide_application() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let target = ctx.approved_bhp(&admin, "Target").await;
    let stranger = ctx.approved_bhp(&admin, "Other").await;

    let registered = ctx
        .actors
        .register_bhrf(
            connect_governance::services::NewBhrf {
                email: "ops@elm.test".to_string(),
                display_name: "Elm Ops".to_string(),
                password_hash: "hash".to_string(),
                bhp_id: target.bhp_profile_id().unwrap(),
                facility_name: "Elm".to_string(),
                address: None,
            },
            RequestMetadata::default(),
        )
        .await
        .unwrap();

    let result = ctx
        .facilities
        .decide_application(
            &stranger,
            registered.application.id,
            ApprovalDecision::Approve,
            RequestMetadata::default(),
        )
        .await;
    assert!(matches!(result, Err(GovernanceError::NotFound { .. })));
}

#[tokio::test]
async fn test_registration_against_pending_bhp_is_refused() {
    let ctx = TestContext::new();
    let pending = ctx.pending_bhp("Unvetted").await;

    let result = ctx
        .actors
        .register_bhrf(
            connect_governance::services::NewBhrf {
                email: "ops@ash.test".to_string(),
                display_name: "Ash Ops".to_string(),
                password_hash: "hash".to_string(),
                bhp_id: pending.bhp_profile_id().unwrap(),
                facility_name: "Ash".to_string(),
                address: None,
            },
            RequestMetadata::default(),
        )
        .await;
    assert!(matches!(result, Err(GovernanceError::NotFound { .. })));
    assert!(ctx.actors.available_bhps().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_messages_reach_only_the_counterpart() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let bhp = ctx.approved_bhp(&admin, "Sender").await;
    let (bhrf, facility) = ctx.bhrf_with_facility(&admin, &bhp, "Aspen").await;
    let stranger = ctx.approved_bhp(&admin, "Eavesdropper").await;

    let sent = ctx
        .messages
        .send(
            &bhp,
            facility.id,
            NewMessage {
                recipient_id: None,
                subject: "Census".to_string(),
                body: "Please send this week's census.".to_string(),
            },
            RequestMetadata::default(),
        )
        .await
        .unwrap();
    assert_eq!(sent.recipient_id, bhrf.id());

    let wrong_recipient = ctx
        .messages
        .send(
            &bhrf,
            facility.id,
            NewMessage {
                recipient_id: Some(stranger.id()),
                subject: "Hi".to_string(),
                body: "Wrong person".to_string(),
            },
            RequestMetadata::default(),
        )
        .await;
    assert!(matches!(wrong_recipient, Err(GovernanceError::Validation { .. })));

    let snoop = ctx.messages.mark_read(&stranger, sent.id).await;
    assert!(matches!(snoop, Err(GovernanceError::NotFound { .. })));
    let sender_read = ctx.messages.mark_read(&bhp, sent.id).await;
    assert!(matches!(sender_read, Err(GovernanceError::NotFound { .. })));

    assert_eq!(ctx.messages.unread_count(bhrf.id()).await.unwrap(), 1);
    ctx.messages.mark_read(&bhrf, sent.id).await.unwrap();
    assert_eq!(ctx.messages.unread_count(bhrf.id()).await.unwrap(), 0);

    let (inbox, total) = ctx
        .messages
        .inbox(&stranger, false, &ListOptions::default())
        .await
        .unwrap();
    assert!(inbox.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_admin_has_no_facility_access() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let bhp = ctx.approved_bhp(&admin, "Provider").await;
    let (_bhrf, facility) = ctx.bhrf_with_facility(&admin, &bhp, "Hemlock").await;

    let result = ctx
        .facilities
        .load_for(&admin, facility.id, connect_governance::Action::Read)
        .await;
    assert!(matches!(result, Err(GovernanceError::NotFound { .. })));
}

#[tokio::test]
async fn test_active_document_elsewhere_does_not_block_or_leak() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let owner = ctx.approved_bhp(&admin, "Owner").await;
    let other = ctx.approved_bhp(&admin, "Other").await;
    let (first_bhrf, first_facility) = ctx.bhrf_with_facility(&admin, &owner, "Larch").await;
    let (second_bhrf, second_facility) = ctx.bhrf_with_facility(&admin, &other, "Spruce").await;

    let submitted = ctx
        .workflows
        .create_draft(&first_bhrf, first_facility.id, intake(), RequestMetadata::default())
        .await
        .unwrap();
    ctx.workflows
        .submit(&first_bhrf, submitted.id, RequestMetadata::default())
        .await
        .unwrap();

    // Reusing a foreign subject id answers exactly like a fresh one.
    let reused = NewWorkflowDocument {
        subject_id: Some(submitted.subject_id),
        ..intake()
    };
    let draft = ctx
        .workflows
        .create_draft(&second_bhrf, second_facility.id, reused, RequestMetadata::default())
        .await
        .unwrap();
    let own = ctx
        .workflows
        .submit(&second_bhrf, draft.id, RequestMetadata::default())
        .await
        .unwrap();
    assert_eq!(own.facility_id, second_facility.id);
    assert_eq!(own.status, connect_governance::WorkflowStatus::Submitted);
}
