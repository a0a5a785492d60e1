//! PostgreSQL directory store: actors, profiles, facilities, applications.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, BhpProfileId, BhrfProfileId, FacilityApplicationId, FacilityId};
use connect_governance::approval::Decided;
use connect_governance::services::{
    ActorFilter, ApplicationFilter, DirectoryStore, Facility, FacilityApplication,
    FacilityFilter, FacilityUpdate, ListOptions, NewBhp, NewBhrf, RegisteredBhrf,
};
use connect_governance::{
    ActorRecord, ApprovalStatus, AvailableBhp, BhpProfile, BhrfProfile, GovernanceError, Result,
    Role,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{decode, query, DbError};
use crate::pool::DbPool;

// ============================================================================
// Rows
// ============================================================================

const ACTOR_COLUMNS: &str = r"
    a.id, a.email, a.display_name, a.password_hash, a.role, a.approval_status,
    a.rejection_reason, a.active, a.mfa_secret, a.mfa_enabled, a.decided_by,
    a.decided_at, a.created_at, a.updated_at,
    bp.id AS bhp_profile_id, rp.id AS bhrf_profile_id
";

const ACTOR_JOINS: &str = r"
    LEFT JOIN bhp_profiles bp ON bp.actor_id = a.id
    LEFT JOIN bhrf_profiles rp ON rp.actor_id = a.id
";

#[derive(Debug, FromRow)]
struct ActorRow {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    role: String,
    approval_status: String,
    rejection_reason: Option<String>,
    active: bool,
    mfa_secret: Option<String>,
    mfa_enabled: bool,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    bhp_profile_id: Option<Uuid>,
    bhrf_profile_id: Option<Uuid>,
}

impl TryFrom<ActorRow> for ActorRecord {
    type Error = GovernanceError;

    fn try_from(row: ActorRow) -> Result<Self> {
        Ok(Self {
            id: ActorId::from_uuid(row.id),
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            role: decode("role", &row.role)?,
            approval_status: decode("approval_status", &row.approval_status)?,
            rejection_reason: row.rejection_reason,
            bhp_profile_id: row.bhp_profile_id.map(BhpProfileId::from_uuid),
            bhrf_profile_id: row.bhrf_profile_id.map(BhrfProfileId::from_uuid),
            active: row.active,
            mfa_secret: row.mfa_secret,
            mfa_enabled: row.mfa_enabled,
            decided_by: row.decided_by.map(ActorId::from_uuid),
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BhpProfileRow {
    id: Uuid,
    actor_id: Uuid,
    organisation_name: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BhpProfileRow> for BhpProfile {
    fn from(row: BhpProfileRow) -> Self {
        Self {
            id: BhpProfileId::from_uuid(row.id),
            actor_id: ActorId::from_uuid(row.actor_id),
            organisation_name: row.organisation_name,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BhrfProfileRow {
    id: Uuid,
    actor_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BhrfProfileRow> for BhrfProfile {
    fn from(row: BhrfProfileRow) -> Self {
        Self {
            id: BhrfProfileId::from_uuid(row.id),
            actor_id: ActorId::from_uuid(row.actor_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AvailableBhpRow {
    id: Uuid,
    display_name: String,
    organisation_name: Option<String>,
}

const FACILITY_COLUMNS: &str =
    "id, bhp_id, bhrf_profile_id, name, address, created_at, updated_at";

#[derive(Debug, FromRow)]
struct FacilityRow {
    id: Uuid,
    bhp_id: Uuid,
    bhrf_profile_id: Uuid,
    name: String,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Self {
            id: FacilityId::from_uuid(row.id),
            bhp_id: BhpProfileId::from_uuid(row.bhp_id),
            bhrf_profile_id: BhrfProfileId::from_uuid(row.bhrf_profile_id),
            name: row.name,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const APPLICATION_COLUMNS: &str = r"
    id, bhp_id, bhrf_profile_id, applicant_actor_id, facility_name, address,
    status, rejection_reason, decided_by, decided_at, facility_id, created_at
";

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    bhp_id: Uuid,
    bhrf_profile_id: Uuid,
    applicant_actor_id: Uuid,
    facility_name: String,
    address: Option<String>,
    status: String,
    rejection_reason: Option<String>,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    facility_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for FacilityApplication {
    type Error = GovernanceError;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Self {
            id: FacilityApplicationId::from_uuid(row.id),
            bhp_id: BhpProfileId::from_uuid(row.bhp_id),
            bhrf_profile_id: BhrfProfileId::from_uuid(row.bhrf_profile_id),
            applicant_actor_id: ActorId::from_uuid(row.applicant_actor_id),
            facility_name: row.facility_name,
            address: row.address,
            status: decode("status", &row.status)?,
            rejection_reason: row.rejection_reason,
            decided_by: row.decided_by.map(ActorId::from_uuid),
            decided_at: row.decided_at,
            facility_id: row.facility_id.map(FacilityId::from_uuid),
            created_at: row.created_at,
        })
    }
}

fn email_conflict(err: sqlx::Error) -> GovernanceError {
    let err = DbError::QueryFailed(err);
    if err.is_unique_violation() {
        GovernanceError::Conflict("Email already registered".to_string())
    } else {
        err.into()
    }
}

// ============================================================================
// Store
// ============================================================================

/// PostgreSQL implementation of [`DirectoryStore`].
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: DbPool,
}

impl PgDirectoryStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_actor<'e, E>(
        executor: E,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<ActorId>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let id = ActorId::new();
        sqlx::query(
            r"
            INSERT INTO actors
                (id, email, display_name, password_hash, role, approval_status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $6)
            ",
        )
        .bind(id.into_inner())
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(now)
        .execute(executor)
        .await
        .map_err(email_conflict)?;
        Ok(id)
    }

    fn pending_record(
        id: ActorId,
        email: String,
        display_name: String,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> ActorRecord {
        ActorRecord {
            id,
            email,
            display_name,
            password_hash,
            role,
            approval_status: ApprovalStatus::Pending,
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

    /// Insert an actor record as-is. Used to bootstrap the first admin.
    pub async fn insert_record(&self, record: &ActorRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO actors
                (id, email, display_name, password_hash, role, approval_status,
                 active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(record.id.into_inner())
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(&record.password_hash)
        .bind(record.role.as_str())
        .bind(record.approval_status.as_str())
        .bind(record.active)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool.inner())
        .await
        .map_err(email_conflict)?;
        Ok(())
    }
}

fn actor_conditions(filter: &ActorFilter) -> (String, i32) {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    if filter.role.is_some() {
        conditions.push(format!("a.role = ${param_idx}"));
        param_idx += 1;
    }
    if filter.status.is_some() {
        conditions.push(format!("a.approval_status = ${param_idx}"));
        param_idx += 1;
    }
    (conditions.join(" AND "), param_idx)
}

fn application_conditions(filter: &ApplicationFilter) -> (String, i32) {
    let mut conditions = vec!["TRUE".to_string()];
    let mut param_idx = 1;

    if filter.bhp_id.is_some() {
        conditions.push(format!("bhp_id = ${param_idx}"));
        param_idx += 1;
    }
    if filter.status.is_some() {
        conditions.push(format!("status = ${param_idx}"));
        param_idx += 1;
    }
    (conditions.join(" AND "), param_idx)
}

#[async_trait::async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn create_bhp(&self, input: NewBhp) -> Result<(ActorRecord, BhpProfile)> {
        let now = Utc::now();
        let mut tx = self.pool.inner().begin().await.map_err(query)?;

        let actor_id = Self::insert_actor(
            &mut *tx,
            &input.email,
            &input.display_name,
            &input.password_hash,
            Role::Bhp,
            now,
        )
        .await?;

        let profile = BhpProfile {
            id: BhpProfileId::new(),
            actor_id,
            organisation_name: input.organisation_name,
            phone: input.phone,
            created_at: now,
        };
        sqlx::query(
            r"
            INSERT INTO bhp_profiles (id, actor_id, organisation_name, phone, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(profile.id.into_inner())
        .bind(actor_id.into_inner())
        .bind(&profile.organisation_name)
        .bind(&profile.phone)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(query)?;

        tx.commit().await.map_err(query)?;

        let mut actor = Self::pending_record(
            actor_id,
            input.email,
            input.display_name,
            input.password_hash,
            Role::Bhp,
            now,
        );
        actor.bhp_profile_id = Some(profile.id);
        Ok((actor, profile))
    }

    async fn create_bhrf(&self, input: NewBhrf) -> Result<RegisteredBhrf> {
        let now = Utc::now();
        let mut tx = self.pool.inner().begin().await.map_err(query)?;

        let bhp_exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM bhp_profiles WHERE id = $1")
                .bind(input.bhp_id.into_inner())
                .fetch_optional(&mut *tx)
                .await
                .map_err(query)?;
        if bhp_exists.is_none() {
            return Err(GovernanceError::not_found("BhpProfile", input.bhp_id));
        }

        let actor_id = Self::insert_actor(
            &mut *tx,
            &input.email,
            &input.display_name,
            &input.password_hash,
            Role::Bhrf,
            now,
        )
        .await?;

        let profile = BhrfProfile {
            id: BhrfProfileId::new(),
            actor_id,
            created_at: now,
        };
        sqlx::query("INSERT INTO bhrf_profiles (id, actor_id, created_at) VALUES ($1, $2, $3)")
            .bind(profile.id.into_inner())
            .bind(actor_id.into_inner())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query)?;

        let application = FacilityApplication {
            id: FacilityApplicationId::new(),
            bhp_id: input.bhp_id,
            bhrf_profile_id: profile.id,
            applicant_actor_id: actor_id,
            facility_name: input.facility_name,
            address: input.address,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            decided_by: None,
            decided_at: None,
            facility_id: None,
            created_at: now,
        };
        sqlx::query(
            r"
            INSERT INTO facility_applications
                (id, bhp_id, bhrf_profile_id, applicant_actor_id, facility_name,
                 address, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7)
            ",
        )
        .bind(application.id.into_inner())
        .bind(application.bhp_id.into_inner())
        .bind(profile.id.into_inner())
        .bind(actor_id.into_inner())
        .bind(&application.facility_name)
        .bind(&application.address)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(query)?;

        tx.commit().await.map_err(query)?;

        let mut actor = Self::pending_record(
            actor_id,
            input.email,
            input.display_name,
            input.password_hash,
            Role::Bhrf,
            now,
        );
        actor.bhrf_profile_id = Some(profile.id);
        Ok(RegisteredBhrf {
            actor,
            profile,
            application,
        })
    }

    async fn get_actor(&self, id: ActorId) -> Result<Option<ActorRecord>> {
        let sql = format!("SELECT {ACTOR_COLUMNS} FROM actors a {ACTOR_JOINS} WHERE a.id = $1");
        sqlx::query_as::<_, ActorRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ActorRecord::try_from)
            .transpose()
    }

    async fn find_actor_by_email(&self, email: &str) -> Result<Option<ActorRecord>> {
        let sql = format!(
            "SELECT {ACTOR_COLUMNS} FROM actors a {ACTOR_JOINS} WHERE lower(a.email) = lower($1)"
        );
        sqlx::query_as::<_, ActorRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ActorRecord::try_from)
            .transpose()
    }

    async fn list_actors(
        &self,
        filter: &ActorFilter,
        options: &ListOptions,
    ) -> Result<Vec<ActorRecord>> {
        let (where_clause, param_idx) = actor_conditions(filter);
        let sql = format!(
            r"
            SELECT {ACTOR_COLUMNS} FROM actors a {ACTOR_JOINS}
            WHERE {where_clause}
            ORDER BY a.created_at
            LIMIT ${} OFFSET ${}
            ",
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, ActorRow>(&sql);
        if let Some(role) = filter.role {
            q = q.bind(role.as_str());
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
            .map(ActorRecord::try_from)
            .collect()
    }

    async fn count_actors(&self, filter: &ActorFilter) -> Result<i64> {
        let (where_clause, _) = actor_conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM actors a WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(role) = filter.role {
            q = q.bind(role.as_str());
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        q.fetch_one(self.pool.inner()).await.map_err(query)
    }

    async fn decide_actor(
        &self,
        id: ActorId,
        decided: &Decided,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<ActorRecord>> {
        let sql = format!(
            r"
            WITH a AS (
                UPDATE actors
                SET approval_status = $2, rejection_reason = $3, decided_by = $4,
                    decided_at = $5, updated_at = $5
                WHERE id = $1 AND approval_status = 'PENDING'
                RETURNING *
            )
            SELECT {ACTOR_COLUMNS} FROM a {ACTOR_JOINS}
            "
        );
        sqlx::query_as::<_, ActorRow>(&sql)
            .bind(id.into_inner())
            .bind(decided.status.as_str())
            .bind(&decided.reason)
            .bind(decided_by.into_inner())
            .bind(now)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ActorRecord::try_from)
            .transpose()
    }

    async fn set_mfa(
        &self,
        id: ActorId,
        secret: Option<String>,
        enabled: bool,
    ) -> Result<Option<ActorRecord>> {
        let sql = format!(
            r"
            WITH a AS (
                UPDATE actors
                SET mfa_secret = $2, mfa_enabled = $3, updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT {ACTOR_COLUMNS} FROM a {ACTOR_JOINS}
            "
        );
        sqlx::query_as::<_, ActorRow>(&sql)
            .bind(id.into_inner())
            .bind(secret)
            .bind(enabled)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(ActorRecord::try_from)
            .transpose()
    }

    async fn get_bhp_profile(&self, id: BhpProfileId) -> Result<Option<BhpProfile>> {
        let row = sqlx::query_as::<_, BhpProfileRow>(
            "SELECT id, actor_id, organisation_name, phone, created_at FROM bhp_profiles WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(query)?;
        Ok(row.map(BhpProfile::from))
    }

    async fn list_available_bhps(&self) -> Result<Vec<AvailableBhp>> {
        let rows = sqlx::query_as::<_, AvailableBhpRow>(
            r"
            SELECT bp.id, a.display_name, bp.organisation_name
            FROM bhp_profiles bp
            JOIN actors a ON a.id = bp.actor_id
            WHERE a.active AND a.approval_status = 'APPROVED'
            ORDER BY a.display_name
            ",
        )
        .fetch_all(self.pool.inner())
        .await
        .map_err(query)?;

        Ok(rows
            .into_iter()
            .map(|row| AvailableBhp {
                bhp_profile_id: BhpProfileId::from_uuid(row.id),
                display_name: row.display_name,
                organisation_name: row.organisation_name,
            })
            .collect())
    }

    async fn get_bhrf_profile(&self, id: BhrfProfileId) -> Result<Option<BhrfProfile>> {
        let row = sqlx::query_as::<_, BhrfProfileRow>(
            "SELECT id, actor_id, created_at FROM bhrf_profiles WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(query)?;
        Ok(row.map(BhrfProfile::from))
    }

    async fn facility_for_bhrf(&self, id: BhrfProfileId) -> Result<Option<FacilityId>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM facilities WHERE bhrf_profile_id = $1")
                .bind(id.into_inner())
                .fetch_optional(self.pool.inner())
                .await
                .map_err(query)?;
        Ok(id.map(FacilityId::from_uuid))
    }

    async fn get_facility(&self, id: FacilityId) -> Result<Option<Facility>> {
        let sql = format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE id = $1");
        let row = sqlx::query_as::<_, FacilityRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(row.map(Facility::from))
    }

    async fn list_facilities(&self, filter: &FacilityFilter) -> Result<Vec<Facility>> {
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_idx = 1;
        if filter.bhp_id.is_some() {
            conditions.push(format!("bhp_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.facility_id.is_some() {
            conditions.push(format!("id = ${param_idx}"));
        }

        let sql = format!(
            "SELECT {FACILITY_COLUMNS} FROM facilities WHERE {} ORDER BY name",
            conditions.join(" AND ")
        );
        let mut q = sqlx::query_as::<_, FacilityRow>(&sql);
        if let Some(bhp_id) = filter.bhp_id {
            q = q.bind(bhp_id.into_inner());
        }
        if let Some(facility_id) = filter.facility_id {
            q = q.bind(facility_id.into_inner());
        }
        let rows = q.fetch_all(self.pool.inner()).await.map_err(query)?;
        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn update_facility(
        &self,
        id: FacilityId,
        update: FacilityUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Facility>> {
        let sql = format!(
            r"
            UPDATE facilities
            SET name = COALESCE($2, name), address = COALESCE($3, address), updated_at = $4
            WHERE id = $1
            RETURNING {FACILITY_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, FacilityRow>(&sql)
            .bind(id.into_inner())
            .bind(update.name)
            .bind(update.address)
            .bind(now)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?;
        Ok(row.map(Facility::from))
    }

    async fn get_application(
        &self,
        id: FacilityApplicationId,
    ) -> Result<Option<FacilityApplication>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM facility_applications WHERE id = $1");
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(FacilityApplication::try_from)
            .transpose()
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        options: &ListOptions,
    ) -> Result<Vec<FacilityApplication>> {
        let (where_clause, param_idx) = application_conditions(filter);
        let sql = format!(
            r"
            SELECT {APPLICATION_COLUMNS} FROM facility_applications
            WHERE {where_clause}
            ORDER BY created_at
            LIMIT ${} OFFSET ${}
            ",
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, ApplicationRow>(&sql);
        if let Some(bhp_id) = filter.bhp_id {
            q = q.bind(bhp_id.into_inner());
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
            .map(FacilityApplication::try_from)
            .collect()
    }

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64> {
        let (where_clause, _) = application_conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM facility_applications WHERE {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(bhp_id) = filter.bhp_id {
            q = q.bind(bhp_id.into_inner());
        }
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        q.fetch_one(self.pool.inner()).await.map_err(query)
    }

    async fn approve_application(
        &self,
        id: FacilityApplicationId,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<(FacilityApplication, Facility)>> {
        let mut tx = self.pool.inner().begin().await.map_err(query)?;

        let sql = format!(
            r"
            UPDATE facility_applications
            SET status = 'APPROVED', decided_by = $2, decided_at = $3
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {APPLICATION_COLUMNS}
            "
        );
        let Some(row) = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id.into_inner())
            .bind(decided_by.into_inner())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query)?
        else {
            return Ok(None);
        };

        let facility_sql = format!(
            r"
            INSERT INTO facilities (id, bhp_id, bhrf_profile_id, name, address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {FACILITY_COLUMNS}
            "
        );
        let facility: Facility = sqlx::query_as::<_, FacilityRow>(&facility_sql)
            .bind(Uuid::new_v4())
            .bind(row.bhp_id)
            .bind(row.bhrf_profile_id)
            .bind(&row.facility_name)
            .bind(&row.address)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(query)?
            .into();

        let link_sql = format!(
            "UPDATE facility_applications SET facility_id = $2 WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        );
        let application = sqlx::query_as::<_, ApplicationRow>(&link_sql)
            .bind(id.into_inner())
            .bind(facility.id.into_inner())
            .fetch_one(&mut *tx)
            .await
            .map_err(query)?;

        tx.commit().await.map_err(query)?;
        Ok(Some((application.try_into()?, facility)))
    }

    async fn reject_application(
        &self,
        id: FacilityApplicationId,
        reason: &str,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<FacilityApplication>> {
        let sql = format!(
            r"
            UPDATE facility_applications
            SET status = 'REJECTED', rejection_reason = $2, decided_by = $3, decided_at = $4
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {APPLICATION_COLUMNS}
            "
        );
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id.into_inner())
            .bind(reason)
            .bind(decided_by.into_inner())
            .bind(now)
            .fetch_optional(self.pool.inner())
            .await
            .map_err(query)?
            .map(FacilityApplication::try_from)
            .transpose()
    }
}
