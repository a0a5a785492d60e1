//! PostgreSQL message store.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, FacilityId, MessageId};
use connect_governance::services::{ListOptions, Message, MessageFilter, MessageStore};
use connect_governance::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::query;
use crate::pool::DbPool;

const COLUMNS: &str = "id, facility_id, sender_id, recipient_id, subject, body, read_at, created_at";

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    facility_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    subject: String,
    body: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: MessageId::from_uuid(row.id),
            facility_id: FacilityId::from_uuid(row.facility_id),
            sender_id: ActorId::from_uuid(row.sender_id),
            recipient_id: ActorId::from_uuid(row.recipient_id),
            subject: row.subject,
            body: row.body,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

fn conditions(filter: &MessageFilter) -> (String, i32) {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    if filter.facility_id.is_some() {
        conditions.push(format!("facility_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.recipient_id.is_some() {
        conditions.push(format!("recipient_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.unread_only {
        conditions.push("read_at IS NULL".to_string());
    }
    (conditions.join(" AND "), param_idx)
}

/// PostgreSQL implementation of [`MessageStore`].
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO messages
                (id, facility_id, sender_id, recipient_id, subject, body, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(message.id.into_inner())
        .bind(message.facility_id.into_inner())
        .bind(message.sender_id.into_inner())
        .bind(message.recipient_id.into_inner())
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.read_at)
        .bind(message.created_at)
        .execute(self.pool.inner())
        .await
        .map_err(query)?;
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        let sql = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(row.map(Message::from))
    }

    async fn list(&self, filter: &MessageFilter, options: &ListOptions) -> Result<Vec<Message>> {
        let (where_clause, param_idx) = conditions(filter);
        let sql = format!(
            r"
            SELECT {COLUMNS} FROM messages
            WHERE {where_clause}
            ORDER BY created_at DESC
            LIMIT ${} OFFSET ${}
            ",
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, MessageRow>(&sql);
        if let Some(facility_id) = filter.facility_id {
            q = q.bind(facility_id.into_inner());
        }
        if let Some(recipient_id) = filter.recipient_id {
            q = q.bind(recipient_id.into_inner());
        }
        let rows = q
            .bind(options.limit)
            .bind(options.offset)
            .fetch_all(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn count(&self, filter: &MessageFilter) -> Result<i64> {
        let (where_clause, _) = conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM messages WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(facility_id) = filter.facility_id {
            q = q.bind(facility_id.into_inner());
        }
        if let Some(recipient_id) = filter.recipient_id {
            q = q.bind(recipient_id.into_inner());
        }
        q.fetch_one(self.pool.inner()).await.map_err(query)
    }

    async fn mark_read(
        &self,
        id: MessageId,
        recipient: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let sql = format!(
            r"
            UPDATE messages
            SET read_at = COALESCE(read_at, $3)
            WHERE id = $1 AND recipient_id = $2
            RETURNING {COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id.into_inner())
            .bind(recipient.into_inner())
            .bind(now)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(row.map(Message::from))
    }
}
