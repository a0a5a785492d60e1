//! PostgreSQL compliance artifact store.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, ArtifactId, ArtifactVersionId, BhpProfileId, FacilityId};
use connect_governance::services::artifact::{PurgedArtifact, UploadRecord};
use connect_governance::services::{
    ArtifactFilter, ArtifactScope, ArtifactStore, ArtifactVersion, ComplianceArtifact,
};
use connect_governance::{GovernanceError, Result};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{decode, query, DbError};
use crate::pool::DbPool;

const COLUMNS: &str = r"
    id, facility_id, bhp_profile_id, category, title, employee_name, state,
    storage_key, content_type, expires_at, no_expiration, requested_by,
    uploaded_by, created_at, updated_at
";

const VERSION_COLUMNS: &str =
    "id, artifact_id, storage_key, content_type, size_bytes, uploaded_by, expires_at, created_at";

#[derive(Debug, FromRow)]
struct ArtifactRow {
    id: Uuid,
    facility_id: Option<Uuid>,
    bhp_profile_id: Option<Uuid>,
    category: String,
    title: String,
    employee_name: Option<String>,
    state: String,
    storage_key: Option<String>,
    content_type: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    no_expiration: bool,
    requested_by: Option<Uuid>,
    uploaded_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArtifactRow> for ComplianceArtifact {
    type Error = GovernanceError;

    fn try_from(row: ArtifactRow) -> Result<Self> {
        let scope = match (row.facility_id, row.bhp_profile_id) {
            (Some(id), None) => ArtifactScope::Facility(FacilityId::from_uuid(id)),
            (None, Some(id)) => ArtifactScope::BhpProfile(BhpProfileId::from_uuid(id)),
            _ => {
                return Err(DbError::Decode(format!("artifact {} has no single scope", row.id)).into())
            }
        };
        Ok(Self {
            id: ArtifactId::from_uuid(row.id),
            scope,
            category: decode("category", &row.category)?,
            title: row.title,
            employee_name: row.employee_name,
            state: decode("state", &row.state)?,
            storage_key: row.storage_key,
            content_type: row.content_type,
            expires_at: row.expires_at,
            no_expiration: row.no_expiration,
            requested_by: row.requested_by.map(ActorId::from_uuid),
            uploaded_by: row.uploaded_by.map(ActorId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct VersionRow {
    id: Uuid,
    artifact_id: Uuid,
    storage_key: String,
    content_type: String,
    size_bytes: i64,
    uploaded_by: Uuid,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<VersionRow> for ArtifactVersion {
    fn from(row: VersionRow) -> Self {
        Self {
            id: ArtifactVersionId::from_uuid(row.id),
            artifact_id: ArtifactId::from_uuid(row.artifact_id),
            storage_key: row.storage_key,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            uploaded_by: ActorId::from_uuid(row.uploaded_by),
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

fn scope_columns(scope: ArtifactScope) -> (Option<Uuid>, Option<Uuid>) {
    match scope {
        ArtifactScope::Facility(id) => (Some(id.into_inner()), None),
        ArtifactScope::BhpProfile(id) => (None, Some(id.into_inner())),
    }
}

/// Build the WHERE clause for `filter`, numbering parameters from `$1`.
fn conditions(filter: &ArtifactFilter) -> String {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    match filter.scope {
        Some(ArtifactScope::Facility(_)) => {
            conditions.push(format!("facility_id = ${param_idx}"));
            param_idx += 1;
        }
        Some(ArtifactScope::BhpProfile(_)) => {
            conditions.push(format!("bhp_profile_id = ${param_idx}"));
            param_idx += 1;
        }
        None => {}
    }
    if filter.category.is_some() {
        conditions.push(format!("category = ${param_idx}"));
        param_idx += 1;
    }
    if filter.state.is_some() {
        conditions.push(format!("state = ${param_idx}"));
        param_idx += 1;
    }
    if filter.active_only {
        conditions.push("state <> 'INACTIVE'".to_string());
    }
    if filter.expires_before.is_some() || filter.expires_from.is_some() {
        conditions.push("NOT no_expiration AND expires_at IS NOT NULL".to_string());
    }
    if filter.expires_before.is_some() {
        conditions.push(format!("expires_at < ${param_idx}"));
        param_idx += 1;
    }
    if filter.expires_from.is_some() {
        conditions.push(format!("expires_at >= ${param_idx}"));
    }
    conditions.join(" AND ")
}

/// Binds filter values in the order [`conditions`] numbers them.
macro_rules! bind_filter {
    ($q:expr, $filter:expr) => {{
        let mut q = $q;
        if let Some(scope) = $filter.scope {
            q = q.bind(scope.uuid());
        }
        if let Some(category) = $filter.category {
            q = q.bind(category.as_str());
        }
        if let Some(state) = $filter.state {
            q = q.bind(state.as_str());
        }
        if let Some(before) = $filter.expires_before {
            q = q.bind(before);
        }
        if let Some(from) = $filter.expires_from {
            q = q.bind(from);
        }
        q
    }};
}

/// PostgreSQL implementation of [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct PgArtifactStore {
    pool: DbPool,
}

impl PgArtifactStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_artifact<'e, E>(executor: E, artifact: &ComplianceArtifact) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let (facility_id, bhp_profile_id) = scope_columns(artifact.scope);
        sqlx::query(
            r"
            INSERT INTO compliance_artifacts
                (id, facility_id, bhp_profile_id, category, title, employee_name, state,
                 storage_key, content_type, expires_at, no_expiration, requested_by,
                 uploaded_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(artifact.id.into_inner())
        .bind(facility_id)
        .bind(bhp_profile_id)
        .bind(artifact.category.as_str())
        .bind(&artifact.title)
        .bind(&artifact.employee_name)
        .bind(artifact.state.as_str())
        .bind(&artifact.storage_key)
        .bind(&artifact.content_type)
        .bind(artifact.expires_at)
        .bind(artifact.no_expiration)
        .bind(artifact.requested_by.map(ActorId::into_inner))
        .bind(artifact.uploaded_by.map(ActorId::into_inner))
        .bind(artifact.created_at)
        .bind(artifact.updated_at)
        .execute(executor)
        .await
        .map_err(query)?;
        Ok(())
    }

    async fn insert_version<'e, E>(executor: E, version: &ArtifactVersion) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r"
            INSERT INTO artifact_versions
                (id, artifact_id, storage_key, content_type, size_bytes, uploaded_by,
                 expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(version.id.into_inner())
        .bind(version.artifact_id.into_inner())
        .bind(&version.storage_key)
        .bind(&version.content_type)
        .bind(version.size_bytes)
        .bind(version.uploaded_by.into_inner())
        .bind(version.expires_at)
        .bind(version.created_at)
        .execute(executor)
        .await
        .map_err(query)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn insert(&self, artifact: &ComplianceArtifact) -> Result<()> {
        Self::insert_artifact(self.pool.inner(), artifact).await
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<ComplianceArtifact>> {
        let sql = format!("SELECT {COLUMNS} FROM compliance_artifacts WHERE id = $1");
        sqlx::query_as::<_, ArtifactRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ComplianceArtifact::try_from)
            .transpose()
    }

    async fn list(&self, filter: &ArtifactFilter) -> Result<Vec<ComplianceArtifact>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM compliance_artifacts WHERE {} ORDER BY created_at",
            conditions(filter)
        );
        bind_filter!(sqlx::query_as::<_, ArtifactRow>(&sql), filter)
            .fetch_all(self.pool.inner())
            .await
            .map_err(query)?
            .into_iter()
            .map(ComplianceArtifact::try_from)
            .collect()
    }

    async fn count(&self, filter: &ArtifactFilter) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM compliance_artifacts WHERE {}",
            conditions(filter)
        );
        bind_filter!(sqlx::query_scalar::<_, i64>(&sql), filter)
            .fetch_one(self.pool.inner())
            .await
            .map_err(query)
    }

    async fn record_upload(
        &self,
        id: ArtifactId,
        upload: &UploadRecord,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>> {
        let mut tx = self.pool.inner().begin().await.map_err(query)?;

        let sql = format!(
            r"
            UPDATE compliance_artifacts
            SET state = 'UPLOADED', storage_key = $2, content_type = $3, expires_at = $4,
                no_expiration = $5, uploaded_by = $6, updated_at = $7
            WHERE id = $1 AND state <> 'INACTIVE'
            RETURNING {COLUMNS}
            "
        );
        let Some(row) = sqlx::query_as::<_, ArtifactRow>(&sql)
            .bind(id.into_inner())
            .bind(&upload.version.storage_key)
            .bind(&upload.version.content_type)
            .bind(upload.expires_at)
            .bind(upload.no_expiration)
            .bind(upload.version.uploaded_by.into_inner())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query)?
        else {
            return Ok(None);
        };

        Self::insert_version(&mut *tx, &upload.version).await?;
        tx.commit().await.map_err(query)?;
        Ok(Some(row.try_into()?))
    }

    async fn insert_uploaded(
        &self,
        artifact: &ComplianceArtifact,
        version: &ArtifactVersion,
    ) -> Result<()> {
        let mut tx = self.pool.inner().begin().await.map_err(query)?;
        Self::insert_artifact(&mut *tx, artifact).await?;
        Self::insert_version(&mut *tx, version).await?;
        tx.commit().await.map_err(query)?;
        Ok(())
    }

    async fn versions(&self, id: ArtifactId) -> Result<Vec<ArtifactVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM artifact_versions WHERE artifact_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(id.into_inner())
            .fetch_all(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(rows.into_iter().map(ArtifactVersion::from).collect())
    }

    async fn deactivate(
        &self,
        id: ArtifactId,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>> {
        let sql = format!(
            r"
            UPDATE compliance_artifacts
            SET state = 'INACTIVE', updated_at = $2
            WHERE id = $1 AND state <> 'INACTIVE'
            RETURNING {COLUMNS}
            "
        );
        sqlx::query_as::<_, ArtifactRow>(&sql)
            .bind(id.into_inner())
            .bind(now)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ComplianceArtifact::try_from)
            .transpose()
    }

    async fn purge_inactive(&self) -> Result<Vec<PurgedArtifact>> {
        let mut tx = self.pool.inner().begin().await.map_err(query)?;

        let keys: Vec<(Uuid, Option<String>)> = sqlx::query_as(
            r"
            SELECT a.id, v.storage_key
            FROM compliance_artifacts a
            LEFT JOIN artifact_versions v ON v.artifact_id = a.id
            WHERE a.state = 'INACTIVE'
            ORDER BY a.id, v.created_at
            FOR UPDATE OF a
            ",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(query)?;

        let mut purged: Vec<PurgedArtifact> = Vec::new();
        for (id, key) in keys {
            let id = ArtifactId::from_uuid(id);
            match purged.last_mut() {
                Some(last) if last.id == id => last.storage_keys.extend(key),
                _ => purged.push(PurgedArtifact {
                    id,
                    storage_keys: key.into_iter().collect(),
                }),
            }
        }

        let ids: Vec<Uuid> = purged.iter().map(|p| p.id.into_inner()).collect();
        sqlx::query("DELETE FROM compliance_artifacts WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(query)?;

        tx.commit().await.map_err(query)?;
        Ok(purged)
    }
}
