//! Integration tests for the PostgreSQL stores.
//!
//! These tests require a running PostgreSQL instance.
//! Run with: `cargo test -p connect-db --features integration`
//!
//! The database URL is read from `TEST_DATABASE_URL`.

#![cfg(feature = "integration")]

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use connect_core::{ActorId, ArtifactId, ArtifactVersionId, MessageId, SubjectId};
use connect_db::{PgArtifactStore, PgAuditStore, PgMessageStore, PgWorkflowStore};
use connect_governance::services::artifact::UploadRecord;
use connect_governance::services::{
    ActorFilter, ArtifactFilter, ArtifactScope, ArtifactStore, ArtifactVersion,
    ComplianceArtifact, DirectoryStore, ListOptions, Message, MessageFilter, MessageStore,
    NewBhp, WorkflowFilter, WorkflowStore,
};
use connect_governance::{
    ApprovalStatus, ArtifactCategory, ArtifactState, AuditAction, AuditFilter, AuditInput,
    AuditStore, Decided, GovernanceError, RequestMetadata, Role, WorkflowDocument, WorkflowKind,
    WorkflowStatus,
};

use common::TestContext;

#[tokio::test]
async fn test_connection_pool() {
    let ctx = TestContext::new().await;
    ctx.pool.ping().await.expect("ping");
}

// ============================================================================
// Directory
// ============================================================================

#[tokio::test]
async fn test_duplicate_email_is_conflict_case_insensitive() {
    let ctx = TestContext::new().await;
    let email = TestContext::unique_email("dup");
    let new_bhp = |email: String| NewBhp {
        email,
        display_name: "Dup".to_string(),
        password_hash: "hash".to_string(),
        organisation_name: None,
        phone: None,
    };

    ctx.directory.create_bhp(new_bhp(email.clone())).await.unwrap();
    let err = ctx
        .directory
        .create_bhp(new_bhp(email.to_uppercase()))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}

#[tokio::test]
async fn test_created_bhp_resolves_with_profile() {
    let ctx = TestContext::new().await;
    let (actor, profile) = ctx.bhp().await;

    let loaded = ctx.directory.get_actor(actor.id).await.unwrap().unwrap();
    assert_eq!(loaded.role, Role::Bhp);
    assert_eq!(loaded.approval_status, ApprovalStatus::Pending);
    assert_eq!(loaded.bhp_profile_id, Some(profile.id));

    let by_email = ctx
        .directory
        .find_actor_by_email(&actor.email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, actor.id);
}

#[tokio::test]
async fn test_decide_actor_is_compare_and_set() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let (bhp, profile) = ctx.bhp().await;
    let decided = Decided {
        status: ApprovalStatus::Approved,
        reason: None,
    };

    let first = ctx
        .directory
        .decide_actor(bhp.id, &decided, admin.id, Utc::now())
        .await
        .unwrap()
        .expect("first decision applies");
    assert_eq!(first.approval_status, ApprovalStatus::Approved);
    assert_eq!(first.bhp_profile_id, Some(profile.id));
    assert_eq!(first.decided_by, Some(admin.id));

    let second = ctx
        .directory
        .decide_actor(bhp.id, &decided, admin.id, Utc::now())
        .await
        .unwrap();
    assert!(second.is_none());

    let available = ctx.directory.list_available_bhps().await.unwrap();
    assert!(available.iter().any(|b| b.bhp_profile_id == profile.id));
}

#[tokio::test]
async fn test_pending_filter_lists_new_registration() {
    let ctx = TestContext::new().await;
    let (bhp, _) = ctx.bhp().await;

    let filter = ActorFilter {
        role: Some(Role::Bhp),
        status: Some(ApprovalStatus::Pending),
    };
    let count = ctx.directory.count_actors(&filter).await.unwrap();
    let listed = ctx
        .directory
        .list_actors(
            &filter,
            &ListOptions {
                limit: 10_000,
                offset: 0,
            },
        )
        .await
        .unwrap();
    assert!(count >= 1);
    assert!(listed.iter().any(|a| a.id == bhp.id));
    assert!(listed
        .iter()
        .all(|a| a.role == Role::Bhp && a.approval_status == ApprovalStatus::Pending));
}

#[tokio::test]
async fn test_bhrf_against_unknown_bhp_is_not_found() {
    let ctx = TestContext::new().await;
    let (_, mut profile) = ctx.bhp().await;
    profile.id = connect_core::BhpProfileId::new();

    let result = ctx
        .directory
        .create_bhrf(connect_governance::services::NewBhrf {
            email: TestContext::unique_email("orphan"),
            display_name: "Orphan".to_string(),
            password_hash: "hash".to_string(),
            bhp_id: profile.id,
            facility_name: "Nowhere".to_string(),
            address: None,
        })
        .await;
    assert!(matches!(result, Err(GovernanceError::NotFound { .. })));
}

#[tokio::test]
async fn test_concurrent_application_approvals_create_one_facility() {
    let ctx = Arc::new(TestContext::new().await);
    let (bhp, profile) = ctx.bhp().await;
    let registered = ctx.bhrf(&profile).await;
    let application_id = registered.application.id;
    let decided_by = bhp.id;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            ctx.directory
                .approve_application(application_id, decided_by, Utc::now())
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let facility_id = ctx
        .directory
        .facility_for_bhrf(registered.profile.id)
        .await
        .unwrap()
        .expect("facility created");
    let application = ctx
        .directory
        .get_application(application_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(application.status, ApprovalStatus::Approved);
    assert_eq!(application.facility_id, Some(facility_id));
}

// ============================================================================
// Workflow
// ============================================================================

#[tokio::test]
async fn test_one_active_document_per_subject() {
    let ctx = TestContext::new().await;
    let store = PgWorkflowStore::new(ctx.pool.clone());
    let (bhp, profile) = ctx.bhp().await;
    let registered = ctx.bhrf(&profile).await;
    let (_, facility) = ctx
        .directory
        .approve_application(registered.application.id, bhp.id, Utc::now())
        .await
        .unwrap()
        .unwrap();

    let subject = SubjectId::new();
    let draft = |now| {
        WorkflowDocument::new_draft(
            WorkflowKind::Intake,
            facility.id,
            subject,
            "J. Doe",
            registered.actor.id,
            serde_json::json!({"step": 1}),
            now,
        )
    };

    let first = draft(Utc::now());
    assert!(store.insert_if_no_active(&first).await.unwrap());

    let mut submitted = first.clone();
    submitted.status = WorkflowStatus::Submitted;
    submitted.submitted_at = Some(Utc::now());
    submitted.updated_at = Utc::now();
    assert!(store
        .replace(&submitted, WorkflowStatus::Draft)
        .await
        .unwrap()
        .is_some());

    // Stale expected status loses.
    assert!(store
        .replace(&submitted, WorkflowStatus::Draft)
        .await
        .unwrap()
        .is_none());

    assert!(!store.insert_if_no_active(&draft(Utc::now())).await.unwrap());

    // A second draft inserted before the first was submitted cannot also be submitted.
    let other_subject = SubjectId::new();
    let a = WorkflowDocument::new_draft(
        WorkflowKind::Asam,
        facility.id,
        other_subject,
        "R. Roe",
        registered.actor.id,
        serde_json::json!({}),
        Utc::now(),
    );
    let mut b = a.clone();
    b.id = connect_core::WorkflowDocumentId::new();
    assert!(store.insert_if_no_active(&a).await.unwrap());
    assert!(store.insert_if_no_active(&b).await.unwrap());

    let mut a_submitted = a.clone();
    a_submitted.status = WorkflowStatus::Submitted;
    let mut b_submitted = b.clone();
    b_submitted.status = WorkflowStatus::Submitted;
    store
        .replace(&a_submitted, WorkflowStatus::Draft)
        .await
        .unwrap();
    let err = store
        .replace(&b_submitted, WorkflowStatus::Draft)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));

    let in_facility = WorkflowFilter {
        facility_id: Some(facility.id),
        ..WorkflowFilter::default()
    };
    assert_eq!(store.count(&in_facility).await.unwrap(), 3);
    let drafts = WorkflowFilter {
        status: Some(WorkflowStatus::Draft),
        ..in_facility
    };
    assert_eq!(store.count(&drafts).await.unwrap(), 1);
}

// ============================================================================
// Artifacts
// ============================================================================

#[tokio::test]
async fn test_upload_deactivate_and_purge() {
    let ctx = TestContext::new().await;
    let store = PgArtifactStore::new(ctx.pool.clone());
    let (bhp, profile) = ctx.bhp().await;
    let now = Utc::now();

    let artifact = ComplianceArtifact {
        id: ArtifactId::new(),
        scope: ArtifactScope::BhpProfile(profile.id),
        category: ArtifactCategory::Credential,
        title: "CPR".to_string(),
        employee_name: None,
        state: ArtifactState::Requested,
        storage_key: None,
        content_type: None,
        expires_at: None,
        no_expiration: false,
        requested_by: Some(bhp.id),
        uploaded_by: None,
        created_at: now,
        updated_at: now,
    };
    store.insert(&artifact).await.unwrap();

    let upload = |key: &str| UploadRecord {
        version: ArtifactVersion {
            id: ArtifactVersionId::new(),
            artifact_id: artifact.id,
            storage_key: key.to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 4,
            uploaded_by: bhp.id,
            expires_at: Some(now - Duration::days(1)),
            created_at: Utc::now(),
        },
        expires_at: Some(now - Duration::days(1)),
        no_expiration: false,
    };
    let first_key = format!("{}/{}/{}", profile.id, artifact.id, ArtifactVersionId::new());
    let second_key = format!("{}/{}/{}", profile.id, artifact.id, ArtifactVersionId::new());
    store
        .record_upload(artifact.id, &upload(&first_key), Utc::now())
        .await
        .unwrap()
        .expect("upload recorded");
    let latest = store
        .record_upload(artifact.id, &upload(&second_key), Utc::now())
        .await
        .unwrap()
        .expect("upload recorded");
    assert_eq!(latest.state, ArtifactState::Uploaded);
    assert_eq!(latest.storage_key.as_deref(), Some(second_key.as_str()));
    assert_eq!(store.versions(artifact.id).await.unwrap().len(), 2);

    let expired = store
        .count(&ArtifactFilter {
            scope: Some(ArtifactScope::BhpProfile(profile.id)),
            category: Some(ArtifactCategory::Credential),
            active_only: true,
            expires_before: Some(now),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(expired, 1);

    store
        .deactivate(artifact.id, Utc::now())
        .await
        .unwrap()
        .expect("deactivated");
    assert!(store
        .deactivate(artifact.id, Utc::now())
        .await
        .unwrap()
        .is_none());
    assert!(store
        .record_upload(artifact.id, &upload("late"), Utc::now())
        .await
        .unwrap()
        .is_none());

    let purged = store.purge_inactive().await.unwrap();
    let ours = purged
        .iter()
        .find(|p| p.id == artifact.id)
        .expect("artifact purged");
    assert_eq!(ours.storage_keys, vec![first_key, second_key]);
    assert!(store.get(artifact.id).await.unwrap().is_none());
    assert!(store.versions(artifact.id).await.unwrap().is_empty());
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_mark_read_is_idempotent_and_recipient_only() {
    let ctx = TestContext::new().await;
    let store = PgMessageStore::new(ctx.pool.clone());
    let (bhp, profile) = ctx.bhp().await;
    let registered = ctx.bhrf(&profile).await;
    let (_, facility) = ctx
        .directory
        .approve_application(registered.application.id, bhp.id, Utc::now())
        .await
        .unwrap()
        .unwrap();

    let message = Message {
        id: MessageId::new(),
        facility_id: facility.id,
        sender_id: bhp.id,
        recipient_id: registered.actor.id,
        subject: "Census".to_string(),
        body: "Please send this week's census.".to_string(),
        read_at: None,
        created_at: Utc::now(),
    };
    store.insert(&message).await.unwrap();

    let unread = MessageFilter {
        recipient_id: Some(registered.actor.id),
        unread_only: true,
        ..Default::default()
    };
    assert_eq!(store.count(&unread).await.unwrap(), 1);

    assert!(store
        .mark_read(message.id, ActorId::new(), Utc::now())
        .await
        .unwrap()
        .is_none());
    let first = store
        .mark_read(message.id, registered.actor.id, Utc::now())
        .await
        .unwrap()
        .unwrap();
    let again = store
        .mark_read(message.id, registered.actor.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.read_at, again.read_at);
    assert_eq!(store.count(&unread).await.unwrap(), 0);
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test]
async fn test_audit_log_is_append_only_and_ordered() {
    let ctx = TestContext::new().await;
    let store = PgAuditStore::new(ctx.pool.clone());
    let entity = uuid::Uuid::new_v4();

    for action in [AuditAction::IntakeCreated, AuditAction::IntakeSubmitted] {
        store
            .append(AuditInput {
                actor_id: None,
                action,
                entity_type: "WorkflowDocument".to_string(),
                entity_id: Some(entity),
                details: None,
                metadata: RequestMetadata::default(),
            })
            .await
            .unwrap();
    }

    let entries = store
        .query(&AuditFilter {
            entity_id: Some(entity),
            ..Default::default()
        })
        .await
        .unwrap();
    let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::IntakeCreated, AuditAction::IntakeSubmitted]
    );
    assert_eq!(entries[0].ip_address, "unknown");

    // The total ignores paging.
    let one_page = AuditFilter {
        entity_id: Some(entity),
        limit: Some(1),
        ..Default::default()
    };
    assert_eq!(store.query(&one_page).await.unwrap().len(), 1);
    assert_eq!(store.count_matching(&one_page).await.unwrap(), 2);

    let update = sqlx::query("UPDATE audit_log SET action = 'USER_APPROVED' WHERE entity_id = $1")
        .bind(entity)
        .execute(ctx.pool.inner())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM audit_log WHERE entity_id = $1")
        .bind(entity)
        .execute(ctx.pool.inner())
        .await;
    assert!(delete.is_err());
}
