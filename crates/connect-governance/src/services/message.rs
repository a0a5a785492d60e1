//! Facility messages between a BHP and the BHRF operating the facility.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use connect_core::{ActorId, FacilityId, MessageId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::directory::DirectoryStore;
use super::ListOptions;
use crate::actor::Actor;
use crate::audit::{AuditAction, AuditInput, AuditRecorder, RequestMetadata};
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize_visible, Action, DenyReason, Target};

/// Longest accepted message body, in characters.
pub const MAX_BODY_CHARS: usize = 10_000;

// ============================================================================
// Domain Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub facility_id: FacilityId,
    pub sender_id: ActorId,
    pub recipient_id: ActorId,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Must name the facility's counterpart when given.
    #[serde(default)]
    pub recipient_id: Option<ActorId>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub facility_id: Option<FacilityId>,
    pub recipient_id: Option<ActorId>,
    pub unread_only: bool,
}

impl MessageFilter {
    fn matches(&self, m: &Message) -> bool {
        self.facility_id.is_none_or(|id| m.facility_id == id)
            && self.recipient_id.is_none_or(|id| m.recipient_id == id)
            && (!self.unread_only || m.read_at.is_none())
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for messages.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &Message) -> Result<()>;

    async fn get(&self, id: MessageId) -> Result<Option<Message>>;

    /// Newest first.
    async fn list(&self, filter: &MessageFilter, options: &ListOptions) -> Result<Vec<Message>>;

    async fn count(&self, filter: &MessageFilter) -> Result<i64>;

    /// Set `read_at` if unset and `recipient` matches. Idempotent.
    async fn mark_read(
        &self,
        id: MessageId,
        recipient: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<Message>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory message store for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<MessageId, Message>>>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &Message) -> Result<()> {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &MessageFilter, options: &ListOptions) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut results: Vec<_> = messages
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &MessageFilter) -> Result<i64> {
        let messages = self.messages.read().await;
        Ok(messages.values().filter(|m| filter.matches(m)).count() as i64)
    }

    async fn mark_read(
        &self,
        id: MessageId,
        recipient: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let mut messages = self.messages.write().await;
        Ok(match messages.get_mut(&id) {
            Some(m) if m.recipient_id == recipient => {
                m.read_at.get_or_insert(now);
                Some(m.clone())
            }
            _ => None,
        })
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for facility messages.
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn DirectoryStore>,
    audit: AuditRecorder,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn DirectoryStore>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
        }
    }

    /// Send a message to the other side of a facility.
    pub async fn send(
        &self,
        actor: &Actor,
        facility_id: FacilityId,
        input: NewMessage,
        metadata: RequestMetadata,
    ) -> Result<Message> {
        if input.subject.trim().is_empty() {
            return Err(GovernanceError::validation("subject", "Must not be empty"));
        }
        if input.body.trim().is_empty() {
            return Err(GovernanceError::validation("body", "Must not be empty"));
        }
        if input.body.chars().count() > MAX_BODY_CHARS {
            return Err(GovernanceError::validation(
                "body",
                format!("Must be at most {MAX_BODY_CHARS} characters"),
            ));
        }

        let facility = self
            .directory
            .get_facility(facility_id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Facility", facility_id))?;
        authorize_visible(
            actor,
            Action::Write,
            &Target::Facility(facility.gate_ref()),
            "Facility",
            facility_id,
        )?;

        let recipient_id = match actor {
            Actor::Bhp(_) => self
                .directory
                .get_bhrf_profile(facility.bhrf_profile_id)
                .await?
                .map(|p| p.actor_id),
            Actor::Bhrf(_) => self
                .directory
                .get_bhp_profile(facility.bhp_id)
                .await?
                .map(|p| p.actor_id),
            Actor::Admin(_) => return Err(GovernanceError::Forbidden(DenyReason::AdminScope)),
        }
        .ok_or_else(|| GovernanceError::Storage("Facility counterpart profile missing".to_string()))?;
        if input.recipient_id.is_some_and(|id| id != recipient_id) {
            return Err(GovernanceError::validation(
                "recipient_id",
                "Recipient is not the facility's counterpart",
            ));
        }

        let message = Message {
            id: MessageId::new(),
            facility_id,
            sender_id: actor.id(),
            recipient_id,
            subject: input.subject.trim().to_string(),
            body: input.body,
            read_at: None,
            created_at: Utc::now(),
        };
        self.store.insert(&message).await?;

        tracing::info!(
            message_id = %message.id,
            facility_id = %facility_id,
            sender_id = %message.sender_id,
            recipient_id = %message.recipient_id,
            "Message sent"
        );
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::MessageSent,
                entity_type: "Message".to_string(),
                entity_id: Some(message.id.into_inner()),
                details: Some(serde_json::json!({
                    "facility_id": facility_id,
                    "recipient_id": recipient_id,
                })),
                metadata,
            })
            .await;
        Ok(message)
    }

    /// Messages addressed to the actor, newest first.
    pub async fn inbox(
        &self,
        actor: &Actor,
        unread_only: bool,
        options: &ListOptions,
    ) -> Result<(Vec<Message>, i64)> {
        if !actor.is_approved() {
            return Err(GovernanceError::Forbidden(DenyReason::NotApproved));
        }
        let filter = MessageFilter {
            recipient_id: Some(actor.id()),
            unread_only,
            ..Default::default()
        };
        let items = self.store.list(&filter, options).await?;
        let total = self.store.count(&filter).await?;
        Ok((items, total))
    }

    /// Whole conversation of a facility, newest first, with its size.
    pub async fn thread(
        &self,
        actor: &Actor,
        facility_id: FacilityId,
        options: &ListOptions,
    ) -> Result<(Vec<Message>, i64)> {
        let facility = self
            .directory
            .get_facility(facility_id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Facility", facility_id))?;
        authorize_visible(
            actor,
            Action::Read,
            &Target::Facility(facility.gate_ref()),
            "Facility",
            facility_id,
        )?;
        let filter = MessageFilter {
            facility_id: Some(facility_id),
            ..Default::default()
        };
        let items = self.store.list(&filter, options).await?;
        let total = self.store.count(&filter).await?;
        Ok((items, total))
    }

    /// Mark a message read. Only its recipient may; anyone else gets not found.
    pub async fn mark_read(&self, actor: &Actor, id: MessageId) -> Result<Message> {
        if !actor.is_approved() {
            return Err(GovernanceError::Forbidden(DenyReason::NotApproved));
        }
        self.store
            .mark_read(id, actor.id(), Utc::now())
            .await?
            .ok_or_else(|| GovernanceError::not_found("Message", id))
    }

    /// Unread messages addressed to `recipient`.
    pub async fn unread_count(&self, recipient: ActorId) -> Result<i64> {
        self.store
            .count(&MessageFilter {
                recipient_id: Some(recipient),
                unread_only: true,
                ..Default::default()
            })
            .await
    }
}
