//! PostgreSQL workflow document store.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, FacilityId, SubjectId, WorkflowDocumentId};
use connect_governance::services::{
    active_document_conflict, ListOptions, WorkflowFilter, WorkflowStore,
};
use connect_governance::{GovernanceError, Result, WorkflowDocument, WorkflowKind, WorkflowStatus};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{decode, query, DbError};
use crate::pool::DbPool;

const COLUMNS: &str = r"
    id, kind, facility_id, subject_id, subject_name, status, draft_step, content,
    author_id, submitted_at, decided_by, decided_at, decision_reason, created_at, updated_at
";

#[derive(Debug, FromRow)]
struct WorkflowRow {
    id: Uuid,
    kind: String,
    facility_id: Uuid,
    subject_id: Uuid,
    subject_name: String,
    status: String,
    draft_step: i32,
    content: serde_json::Value,
    author_id: Uuid,
    submitted_at: Option<DateTime<Utc>>,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    decision_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowRow> for WorkflowDocument {
    type Error = GovernanceError;

    fn try_from(row: WorkflowRow) -> Result<Self> {
        Ok(Self {
            id: WorkflowDocumentId::from_uuid(row.id),
            kind: decode("kind", &row.kind)?,
            facility_id: FacilityId::from_uuid(row.facility_id),
            subject_id: SubjectId::from_uuid(row.subject_id),
            subject_name: row.subject_name,
            status: decode("status", &row.status)?,
            draft_step: row.draft_step,
            content: row.content,
            author_id: ActorId::from_uuid(row.author_id),
            submitted_at: row.submitted_at,
            decided_by: row.decided_by.map(ActorId::from_uuid),
            decided_at: row.decided_at,
            decision_reason: row.decision_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of [`WorkflowStore`].
///
/// The one-active-per-subject rule is also enforced by a partial unique
/// index on `(facility_id, kind, subject_id)`, so a submit that would make
/// a second active document surfaces as `Conflict`.
#[derive(Debug, Clone)]
pub struct PgWorkflowStore {
    pool: DbPool,
}

impl PgWorkflowStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn conditions(filter: &WorkflowFilter) -> (String, i32) {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    if filter.facility_id.is_some() {
        conditions.push(format!("facility_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.kind.is_some() {
        conditions.push(format!("kind = ${param_idx}"));
        param_idx += 1;
    }
    if filter.subject_id.is_some() {
        conditions.push(format!("subject_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.status.is_some() {
        conditions.push(format!("status = ${param_idx}"));
        param_idx += 1;
    }
    (conditions.join(" AND "), param_idx)
}

fn active_conflict(kind: WorkflowKind) -> impl FnOnce(sqlx::Error) -> GovernanceError {
    move |err| {
        let err = DbError::QueryFailed(err);
        if err.is_unique_violation() {
            active_document_conflict(kind)
        } else {
            err.into()
        }
    }
}

#[async_trait::async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn insert_if_no_active(&self, doc: &WorkflowDocument) -> Result<bool> {
        let inserted = sqlx::query(
            r"
            INSERT INTO workflow_documents
                (id, kind, facility_id, subject_id, subject_name, status, draft_step,
                 content, author_id, submitted_at, decided_by, decided_at,
                 decision_reason, created_at, updated_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
            WHERE NOT EXISTS (
                SELECT 1 FROM workflow_documents
                WHERE facility_id = $3 AND kind = $2 AND subject_id = $4
                  AND status IN ('SUBMITTED', 'APPROVED', 'CONDITIONAL')
            )
            ",
        )
        .bind(doc.id.into_inner())
        .bind(doc.kind.as_str())
        .bind(doc.facility_id.into_inner())
        .bind(doc.subject_id.into_inner())
        .bind(&doc.subject_name)
        .bind(doc.status.as_str())
        .bind(doc.draft_step)
        .bind(&doc.content)
        .bind(doc.author_id.into_inner())
        .bind(doc.submitted_at)
        .bind(doc.decided_by.map(ActorId::into_inner))
        .bind(doc.decided_at)
        .bind(&doc.decision_reason)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(self.pool.inner())
        .await
        .map_err(active_conflict(doc.kind))?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn get(&self, id: WorkflowDocumentId) -> Result<Option<WorkflowDocument>> {
        let sql = format!("SELECT {COLUMNS} FROM workflow_documents WHERE id = $1");
        sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(WorkflowDocument::try_from)
            .transpose()
    }

    async fn list(
        &self,
        filter: &WorkflowFilter,
        options: &ListOptions,
    ) -> Result<Vec<WorkflowDocument>> {
        let (where_clause, param_idx) = conditions(filter);
        let sql = format!(
            r"
            SELECT {COLUMNS} FROM workflow_documents
            WHERE {where_clause}
            ORDER BY updated_at DESC
            LIMIT ${} OFFSET ${}
            ",
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, WorkflowRow>(&sql);
        if let Some(facility_id) = filter.facility_id {
            q = q.bind(facility_id.into_inner());
        }
        if let Some(kind) = filter.kind {
            q = q.bind(kind.as_str());
        }
        if let Some(subject_id) = filter.subject_id {
            q = q.bind(subject_id.into_inner());
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        q.bind(options.limit)
            .bind(options.offset)
            .fetch_all(self.pool.inner())
            .await
            .map_err(query)?
            .into_iter()
            .map(WorkflowDocument::try_from)
            .collect()
    }

    async fn count(&self, filter: &WorkflowFilter) -> Result<i64> {
        let (where_clause, _) = conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM workflow_documents WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(facility_id) = filter.facility_id {
            q = q.bind(facility_id.into_inner());
        }
        if let Some(kind) = filter.kind {
            q = q.bind(kind.as_str());
        }
        if let Some(subject_id) = filter.subject_id {
            q = q.bind(subject_id.into_inner());
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        q.fetch_one(self.pool.inner()).await.map_err(query)
    }

    async fn replace(
        &self,
        doc: &WorkflowDocument,
        expected: WorkflowStatus,
    ) -> Result<Option<WorkflowDocument>> {
        let sql = format!(
            r"
            UPDATE workflow_documents
            SET status = $3, draft_step = $4, content = $5, subject_name = $6,
                submitted_at = $7, decided_by = $8, decided_at = $9,
                decision_reason = $10, updated_at = $11
            WHERE id = $1 AND status = $2
            RETURNING {COLUMNS}
            "
        );
        sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(doc.id.into_inner())
            .bind(expected.as_str())
            .bind(doc.status.as_str())
            .bind(doc.draft_step)
            .bind(&doc.content)
            .bind(&doc.subject_name)
            .bind(doc.submitted_at)
            .bind(doc.decided_by.map(ActorId::into_inner))
            .bind(doc.decided_at)
            .bind(&doc.decision_reason)
            .bind(doc.updated_at)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(active_conflict(doc.kind))?
            .map(WorkflowDocument::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_follow_bind_order() {
        let (clause, next) = conditions(&WorkflowFilter {
            facility_id: Some(FacilityId::new()),
            kind: Some(WorkflowKind::Asam),
            subject_id: None,
            status: Some(WorkflowStatus::Submitted),
        });
        assert_eq!(clause, "TRUE AND facility_id = $1 AND kind = $2 AND status = $3");
        assert_eq!(next, 4);
    }
}
