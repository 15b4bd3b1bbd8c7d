//! Database layer: migrations, queries and the guarded status updates.
//!
//! Every write that changes a donation's status is a conditional
//! `UPDATE … WHERE id = ? AND status = ?` inside a transaction. When the row
//! moved underneath us the update matches nothing, the transaction is rolled
//! back and the caller gets [`ApiError::Conflict`]. Reward credit and
//! technician availability ride in the same transaction.

use std::str::FromStr;

use raee_rules::{releases_technician, DonationPatch, DonationStatus, RewardRule, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::models::{
    CategoryRecord, ConditionRecord, CreateDonationRequest, DeviceTypeCount, DonationRow,
    InstitutionProfileInput, InstitutionProfileUpdate, InstitutionRecord, InstitutionStats, Page,
    RegisterRequest, StatusCounts, TechnicianProfileInput, TechnicianProfileUpdate,
    TechnicianRecord, TechnicianStats, UserRecord,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // An in-memory database lives and dies with its connection.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

fn unique_violation(err: sqlx::Error, what: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict(format!("{what} already registered"))
        }
        _ => ApiError::Database(err),
    }
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

// ─────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────

pub async fn get_categories(pool: &SqlitePool) -> Result<Vec<CategoryRecord>> {
    let rows = sqlx::query_as::<_, CategoryRecord>(
        "SELECT id, name, base_points FROM categories WHERE active = 1 ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_conditions(pool: &SqlitePool) -> Result<Vec<ConditionRecord>> {
    let rows = sqlx::query_as::<_, ConditionRecord>(
        "SELECT id, name, multiplier FROM conditions WHERE active = 1 ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Build the reward table from the catalog. Inactive rows still count:
/// a donation registered before a category was retired keeps its value.
pub async fn load_reward_rule(pool: &SqlitePool) -> Result<RewardRule> {
    let bases: Vec<(i64, i64)> = sqlx::query_as("SELECT id, base_points FROM categories")
        .fetch_all(pool)
        .await?;
    let multipliers: Vec<(i64, f64)> = sqlx::query_as("SELECT id, multiplier FROM conditions")
        .fetch_all(pool)
        .await?;

    let rule = RewardRule::new(
        bases
            .into_iter()
            .filter_map(|(id, base)| u32::try_from(base).ok().map(|b| (id, b))),
        multipliers,
    );
    info!(
        "Reward table loaded: {} categories, {} conditions",
        rule.category_count(),
        rule.condition_count()
    );
    Ok(rule)
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, dni, first_name, last_name, email, password_hash, phone, \
                            province, municipality, role, points, created_at";

/// Create the account and its role-specific profile in one transaction.
pub async fn insert_user(
    pool: &SqlitePool,
    req: &RegisterRequest,
    password_hash: &str,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users
            (dni, first_name, last_name, email, password_hash, phone, province, municipality, role)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(req.dni.trim())
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(req.phone.trim())
    .bind(req.province.trim())
    .bind(req.municipality.trim())
    .bind(req.role.as_str())
    .execute(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, "DNI or email"))?
    .last_insert_rowid();

    match req.role {
        Role::Technician => {
            let profile = req.technician.clone().unwrap_or_default();
            insert_technician_profile(&mut tx, user_id, &profile).await?;
        }
        Role::Institution => {
            let profile = req.institution.clone().unwrap_or_default();
            insert_institution_profile(&mut tx, user_id, &profile).await?;
        }
        Role::Citizen | Role::Admin => {}
    }

    tx.commit().await?;
    Ok(user_id)
}

async fn insert_technician_profile(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    user_id: i64,
    profile: &TechnicianProfileInput,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO technicians
            (user_id, workshop_address, specialties, certifications, opening_hours, services,
             description)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(user_id)
    .bind(&profile.workshop_address)
    .bind(Json(&profile.specialties))
    .bind(Json(&profile.certifications))
    .bind(&profile.opening_hours)
    .bind(Json(&profile.services))
    .bind(&profile.description)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_institution_profile(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    user_id: i64,
    profile: &InstitutionProfileInput,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO institutions
            (user_id, name, kind, address, postal_code, contact_phone, contact_email,
             manager_name, programs_description)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(user_id)
    .bind(profile.name.trim())
    .bind(&profile.kind)
    .bind(&profile.address)
    .bind(&profile.postal_code)
    .bind(&profile.contact_phone)
    .bind(&profile.contact_email)
    .bind(&profile.manager_name)
    .bind(&profile.programs_description)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<UserRecord>> {
    let row =
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn get_user_by_dni(pool: &SqlitePool, dni: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE dni = ?1"
    ))
    .bind(dni.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn user_points(pool: &SqlitePool, id: i64) -> Result<i64> {
    let points: Option<i64> = sqlx::query_scalar("SELECT points FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(points.unwrap_or(0))
}

/// Create the bootstrap admin unless an account with that DNI already exists.
pub async fn ensure_admin(pool: &SqlitePool, dni: &str, password_hash: &str) -> Result<bool> {
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO users
            (dni, first_name, last_name, email, password_hash, phone, province, municipality, role)
        VALUES (?1, 'Admin', 'RAEE', ?2, ?3, '', '', '', 'admin')
        "#,
    )
    .bind(dni)
    .bind(format!("admin+{dni}@raee.local"))
    .bind(password_hash)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(inserted > 0)
}

// ─────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────

const DONATION_COLUMNS: &str = "id, owner_id, assigned_technician_id, status, category_id, \
                                condition_id, device_type, brand, model, description, \
                                weight_kg, quantity, notes, processed_date, points_awarded, \
                                created_at, updated_at";

/// Which donations a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationScope {
    All,
    OwnedBy(i64),
    AssignedTo(i64),
    /// Pending and not yet claimed by any technician.
    Open,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub category_id: Option<i64>,
}

pub async fn insert_donation(
    pool: &SqlitePool,
    owner_id: i64,
    req: &CreateDonationRequest,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO donations
            (owner_id, status, category_id, condition_id, device_type, brand, model,
             description, weight_kg, quantity)
        VALUES (?1, 'pending', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(owner_id)
    .bind(req.category_id)
    .bind(req.condition_id)
    .bind(req.device_type.trim())
    .bind(req.brand.trim())
    .bind(req.model.trim())
    .bind(req.description.as_deref())
    .bind(req.weight_kg)
    .bind(req.quantity)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn get_donation(pool: &SqlitePool, id: i64) -> Result<Option<DonationRow>> {
    let row = sqlx::query_as::<_, DonationRow>(&format!(
        "SELECT {DONATION_COLUMNS} FROM donations WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

fn push_donation_conditions(
    qb: &mut QueryBuilder<'_, Sqlite>,
    scope: DonationScope,
    filter: DonationFilter,
) {
    qb.push(" WHERE 1 = 1");
    match scope {
        DonationScope::All => {}
        DonationScope::OwnedBy(id) => {
            qb.push(" AND owner_id = ").push_bind(id);
        }
        DonationScope::AssignedTo(id) => {
            qb.push(" AND assigned_technician_id = ").push_bind(id);
        }
        DonationScope::Open => {
            qb.push(" AND status = 'pending' AND assigned_technician_id IS NULL");
        }
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
}

/// One page of donations, newest first, plus the total match count.
pub async fn list_donations(
    pool: &SqlitePool,
    scope: DonationScope,
    filter: DonationFilter,
    page: Page,
) -> Result<(Vec<DonationRow>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM donations");
    push_donation_conditions(&mut count, scope, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut rows =
        QueryBuilder::<Sqlite>::new(format!("SELECT {DONATION_COLUMNS} FROM donations"));
    push_donation_conditions(&mut rows, scope, filter);
    rows.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let data = rows.build_query_as::<DonationRow>().fetch_all(pool).await?;

    Ok((data, total))
}

/// Donations per status within `scope`.
pub async fn status_counts(pool: &SqlitePool, scope: DonationScope) -> Result<StatusCounts> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT COUNT(*)                                    AS total,
               COALESCE(SUM(status = 'pending'), 0)        AS pending,
               COALESCE(SUM(status = 'assigned'), 0)       AS assigned,
               COALESCE(SUM(status = 'in_process'), 0)     AS in_process,
               COALESCE(SUM(status = 'completed'), 0)      AS completed,
               COALESCE(SUM(status = 'cancelled'), 0)      AS cancelled
        FROM   donations
        "#,
    );
    push_donation_conditions(&mut qb, scope, DonationFilter::default());
    let counts = qb.build_query_as::<StatusCounts>().fetch_one(pool).await?;
    Ok(counts)
}

/// Donation count per device type within `scope`, most frequent first.
pub async fn device_type_counts(
    pool: &SqlitePool,
    scope: DonationScope,
) -> Result<Vec<DeviceTypeCount>> {
    let mut qb =
        QueryBuilder::<Sqlite>::new("SELECT device_type, COUNT(*) AS total FROM donations");
    push_donation_conditions(&mut qb, scope, DonationFilter::default());
    qb.push(" GROUP BY device_type ORDER BY total DESC, device_type ASC");
    let rows = qb.build_query_as::<DeviceTypeCount>().fetch_all(pool).await?;
    Ok(rows)
}

/// Apply an already-authorized patch to a donation.
///
/// `expected` is the status the caller's decision was based on. When the
/// patch completes the donation, `reward` is credited to `owner_id` in the
/// same transaction; when it releases the technician, their availability
/// flag is reset.
pub async fn apply_donation_patch(
    pool: &SqlitePool,
    id: i64,
    expected: DonationStatus,
    owner_id: i64,
    technician_id: Option<i64>,
    patch: &DonationPatch,
    reward: Option<u64>,
) -> Result<()> {
    let reward = reward
        .map(i64::try_from)
        .transpose()
        .map_err(|_| ApiError::Validation("reward out of range".to_string()))?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE donations SET
            device_type    = COALESCE(?1, device_type),
            brand          = COALESCE(?2, brand),
            model          = COALESCE(?3, model),
            description    = COALESCE(?4, description),
            category_id    = COALESCE(?5, category_id),
            condition_id   = COALESCE(?6, condition_id),
            weight_kg      = COALESCE(?7, weight_kg),
            quantity       = COALESCE(?8, quantity),
            status         = COALESCE(?9, status),
            notes          = COALESCE(?10, notes),
            processed_date = COALESCE(?11, processed_date),
            points_awarded = COALESCE(?12, points_awarded),
            updated_at     = strftime('%s', 'now')
        WHERE id = ?13 AND status = ?14
        "#,
    )
    .bind(patch.device_type.as_deref())
    .bind(patch.brand.as_deref())
    .bind(patch.model.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.category_id)
    .bind(patch.condition_id)
    .bind(patch.weight_kg)
    .bind(patch.quantity)
    .bind(patch.status.map(|s| s.as_str()))
    .bind(patch.notes.as_deref())
    .bind(patch.processed_date.as_deref())
    .bind(reward)
    .bind(id)
    .bind(expected.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Err(ApiError::Conflict(format!(
            "donation {id} is no longer {expected}"
        )));
    }

    if let Some(points) = reward {
        sqlx::query("UPDATE users SET points = points + ?1 WHERE id = ?2")
            .bind(points)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
    }

    if let (Some(next), Some(technician)) = (patch.status, technician_id) {
        if releases_technician(expected, next) {
            set_technician_available(&mut tx, technician, true).await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Claim a pending donation for `technician_id` and mark them busy.
pub async fn assign_donation(pool: &SqlitePool, id: i64, technician_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    let busy = sqlx::query(
        "UPDATE technicians SET available = 0 WHERE user_id = ?1 AND available = 1",
    )
    .bind(technician_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if busy == 0 {
        tx.rollback().await?;
        return Err(ApiError::Conflict(format!(
            "technician {technician_id} is not available"
        )));
    }

    let claimed = sqlx::query(
        r#"
        UPDATE donations
        SET    assigned_technician_id = ?1, status = 'assigned', updated_at = strftime('%s', 'now')
        WHERE  id = ?2 AND status = 'pending' AND assigned_technician_id IS NULL
        "#,
    )
    .bind(technician_id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if claimed == 0 {
        tx.rollback().await?;
        return Err(ApiError::Conflict(format!("donation {id} was already claimed")));
    }

    tx.commit().await?;
    Ok(())
}

async fn set_technician_available(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    technician_id: i64,
    available: bool,
) -> Result<()> {
    sqlx::query("UPDATE technicians SET available = ?1 WHERE user_id = ?2")
        .bind(available)
        .bind(technician_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Technicians
// ─────────────────────────────────────────────────────────

const TECHNICIAN_FROM: &str = r#"
    FROM   technicians t
    JOIN   users u ON u.id = t.user_id
"#;

const TECHNICIAN_COLUMNS: &str = r#"
    SELECT t.user_id, u.first_name, u.last_name, u.email, u.phone, u.province, u.municipality,
           t.workshop_address, t.specialties, t.certifications, t.opening_hours, t.services,
           t.description, t.available
"#;

/// Directory filters; empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct TechnicianFilter {
    pub available: Option<bool>,
    pub province: Option<String>,
    pub specialty: Option<String>,
    pub search: Option<String>,
}

fn push_technician_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TechnicianFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(flag) = filter.available {
        qb.push(" AND t.available = ").push_bind(flag);
    }
    if let Some(province) = &filter.province {
        qb.push(" AND u.province = ").push_bind(province.trim().to_string());
    }
    if let Some(specialty) = &filter.specialty {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(t.specialties) WHERE json_each.value = ")
            .push_bind(specialty.trim().to_string())
            .push(")");
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (u.first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.specialties LIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.workshop_address LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn get_technician(pool: &SqlitePool, user_id: i64) -> Result<Option<TechnicianRecord>> {
    let row = sqlx::query_as::<_, TechnicianRecord>(&format!(
        "{TECHNICIAN_COLUMNS} {TECHNICIAN_FROM} WHERE t.user_id = ?1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_technicians(
    pool: &SqlitePool,
    filter: &TechnicianFilter,
    page: Page,
) -> Result<(Vec<TechnicianRecord>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) {TECHNICIAN_FROM}"));
    push_technician_conditions(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut rows = QueryBuilder::<Sqlite>::new(format!("{TECHNICIAN_COLUMNS} {TECHNICIAN_FROM}"));
    push_technician_conditions(&mut rows, filter);
    rows.push(" ORDER BY u.last_name ASC, u.first_name ASC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let data = rows.build_query_as::<TechnicianRecord>().fetch_all(pool).await?;
    Ok((data, total))
}

pub async fn update_technician(
    pool: &SqlitePool,
    user_id: i64,
    update: &TechnicianProfileUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE technicians SET
            workshop_address = COALESCE(?1, workshop_address),
            specialties      = COALESCE(?2, specialties),
            certifications   = COALESCE(?3, certifications),
            opening_hours    = COALESCE(?4, opening_hours),
            services         = COALESCE(?5, services),
            description      = COALESCE(?6, description),
            available        = COALESCE(?7, available)
        WHERE user_id = ?8
        "#,
    )
    .bind(update.workshop_address.as_deref())
    .bind(update.specialties.as_ref().map(Json))
    .bind(update.certifications.as_ref().map(Json))
    .bind(update.opening_hours.as_deref())
    .bind(update.services.as_ref().map(Json))
    .bind(update.description.as_deref())
    .bind(update.available)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Work summary for one technician.
pub async fn technician_stats(pool: &SqlitePool, user_id: i64) -> Result<TechnicianStats> {
    let scope = DonationScope::AssignedTo(user_id);
    let jobs = status_counts(pool, scope).await?;
    Ok(TechnicianStats {
        user_id,
        jobs,
        completion_rate: jobs.completion_rate(),
        points: user_points(pool, user_id).await?,
        device_types: device_type_counts(pool, scope).await?,
    })
}

// ─────────────────────────────────────────────────────────
// Institutions
// ─────────────────────────────────────────────────────────

const INSTITUTION_FROM: &str = r#"
    FROM   institutions i
    JOIN   users u ON u.id = i.user_id
"#;

const INSTITUTION_COLUMNS: &str = r#"
    SELECT i.user_id, u.email, u.province, u.municipality, i.name, i.kind, i.address,
           i.postal_code, i.contact_phone, i.contact_email, i.manager_name, i.programs_description
"#;

/// Directory filters; empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct InstitutionFilter {
    pub kind: Option<String>,
    pub province: Option<String>,
    pub search: Option<String>,
}

fn push_institution_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &InstitutionFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(kind) = &filter.kind {
        qb.push(" AND i.kind = ").push_bind(kind.trim().to_string());
    }
    if let Some(province) = &filter.province {
        qb.push(" AND u.province = ").push_bind(province.trim().to_string());
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (i.name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.manager_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.contact_email LIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.address LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn get_institution(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<InstitutionRecord>> {
    let row = sqlx::query_as::<_, InstitutionRecord>(&format!(
        "{INSTITUTION_COLUMNS} {INSTITUTION_FROM} WHERE i.user_id = ?1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_institutions(
    pool: &SqlitePool,
    filter: &InstitutionFilter,
    page: Page,
) -> Result<(Vec<InstitutionRecord>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) {INSTITUTION_FROM}"));
    push_institution_conditions(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut rows =
        QueryBuilder::<Sqlite>::new(format!("{INSTITUTION_COLUMNS} {INSTITUTION_FROM}"));
    push_institution_conditions(&mut rows, filter);
    rows.push(" ORDER BY i.name ASC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let data = rows.build_query_as::<InstitutionRecord>().fetch_all(pool).await?;
    Ok((data, total))
}

pub async fn update_institution(
    pool: &SqlitePool,
    user_id: i64,
    update: &InstitutionProfileUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE institutions SET
            name                 = COALESCE(?1, name),
            kind                 = COALESCE(?2, kind),
            address              = COALESCE(?3, address),
            postal_code          = COALESCE(?4, postal_code),
            contact_phone        = COALESCE(?5, contact_phone),
            contact_email        = COALESCE(?6, contact_email),
            manager_name         = COALESCE(?7, manager_name),
            programs_description = COALESCE(?8, programs_description)
        WHERE user_id = ?9
        "#,
    )
    .bind(update.name.as_deref())
    .bind(update.kind.as_deref())
    .bind(update.address.as_deref())
    .bind(update.postal_code.as_deref())
    .bind(update.contact_phone.as_deref())
    .bind(update.contact_email.as_deref())
    .bind(update.manager_name.as_deref())
    .bind(update.programs_description.as_deref())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Donation summary for one institution.
pub async fn institution_stats(pool: &SqlitePool, user_id: i64) -> Result<InstitutionStats> {
    let scope = DonationScope::OwnedBy(user_id);
    Ok(InstitutionStats {
        user_id,
        donations: status_counts(pool, scope).await?,
        points: user_points(pool, user_id).await?,
        device_types: device_type_counts(pool, scope).await?,
    })
}
