//! PostgreSQL audit log.
//!
//! The table is append-only: a trigger rejects UPDATE and DELETE, and this
//! store only ever inserts.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, AuditEntryId};
use connect_governance::audit::UNKNOWN;
use connect_governance::{AuditEntry, AuditFilter, AuditInput, AuditStore, GovernanceError, Result};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{decode, query};
use crate::pool::DbPool;

const COLUMNS: &str =
    "id, actor_id, action, entity_type, entity_id, details, ip_address, user_agent, created_at";

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    actor_id: Option<Uuid>,
    action: String,
    entity_type: String,
    entity_id: Option<Uuid>,
    details: Option<serde_json::Value>,
    ip_address: String,
    user_agent: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = GovernanceError;

    fn try_from(row: AuditRow) -> Result<Self> {
        Ok(Self {
            id: AuditEntryId::from_uuid(row.id),
            actor_id: row.actor_id.map(ActorId::from_uuid),
            action: decode("action", &row.action)?,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details: row.details,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL implementation of [`AuditStore`].
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: DbPool,
}

impl PgAuditStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn conditions(filter: &AuditFilter) -> (String, i32) {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    if filter.actor_id.is_some() {
        conditions.push(format!("actor_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.action.is_some() {
        conditions.push(format!("action = ${param_idx}"));
        param_idx += 1;
    }
    if filter.entity_type.is_some() {
        conditions.push(format!("entity_type = ${param_idx}"));
        param_idx += 1;
    }
    if filter.entity_id.is_some() {
        conditions.push(format!("entity_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.from.is_some() {
        conditions.push(format!("created_at >= ${param_idx}"));
        param_idx += 1;
    }
    if filter.to.is_some() {
        conditions.push(format!("created_at <= ${param_idx}"));
        param_idx += 1;
    }
    (conditions.join(" AND "), param_idx)
}

#[async_trait::async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, input: AuditInput) -> Result<AuditEntry> {
        let sql = format!(
            r"
            INSERT INTO audit_log
                (id, actor_id, action, entity_type, entity_id, details, ip_address,
                 user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "
        );
        sqlx::query_as::<_, AuditRow>(&sql)
            .bind(AuditEntryId::new().into_inner())
            .bind(input.actor_id.map(ActorId::into_inner))
            .bind(input.action.as_str())
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.details)
            .bind(input.metadata.ip_address.as_deref().unwrap_or(UNKNOWN))
            .bind(input.metadata.user_agent.as_deref().unwrap_or(UNKNOWN))
            .bind(Utc::now())
            .fetch_one(self.pool.inner())
            .await
            .map_err(query)?
            .try_into()
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let (where_clause, param_idx) = conditions(filter);
        let sql = format!(
            r"
            SELECT {COLUMNS} FROM audit_log
            WHERE {where_clause}
            ORDER BY seq
            LIMIT ${} OFFSET ${}
            ",
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(actor_id) = filter.actor_id {
            q = q.bind(actor_id.into_inner());
        }
        if let Some(action) = filter.action {
            q = q.bind(action.as_str());
        }
        if let Some(entity_type) = &filter.entity_type {
            q = q.bind(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            q = q.bind(entity_id);
        }
        if let Some(from) = filter.from {
            q = q.bind(from);
        }
        if let Some(to) = filter.to {
            q = q.bind(to);
        }

        // LIMIT NULL means no limit.
        let limit = filter.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let offset = filter
            .offset
            .map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
        q.bind(limit)
            .bind(offset)
            .fetch_all(self.pool.inner())
            .await
            .map_err(query)?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }

    async fn count_matching(&self, filter: &AuditFilter) -> Result<i64> {
        let (where_clause, _) = conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_log WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(actor_id) = filter.actor_id {
            q = q.bind(actor_id.into_inner());
        }
        if let Some(action) = filter.action {
            q = q.bind(action.as_str());
        }
        if let Some(entity_type) = &filter.entity_type {
            q = q.bind(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            q = q.bind(entity_id);
        }
        if let Some(from) = filter.from {
            q = q.bind(from);
        }
        if let Some(to) = filter.to {
            q = q.bind(to);
        }
        q.fetch_one(self.pool.inner()).await.map_err(query)
    }
}
