//! Donation handlers.
//!
//! Every read and write of a single donation goes through the rules gate
//! before touching the database; the gate's decision is then enforced a
//! second time by the conditional update in [`db::apply_donation_patch`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use raee_rules::{
    awards_points, can_accept, can_access, Action, DonationPatch, DonationStatus, Role,
};
use tracing::{debug, info};

use crate::api::ApiState;
use crate::auth::Caller;
use crate::db::{self, DonationFilter, DonationScope};
use crate::errors::{ApiError, Result};
use crate::models::{
    AcceptRequest, CreateDonationRequest, DonationListQuery, DonationRow, ListResponse, Page,
    Pagination, StatusUpdateRequest,
};
use crate::validate;

async fn load(state: &ApiState, id: i64) -> Result<DonationRow> {
    db::get_donation(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("donation {id}")))
}

async fn page_of(
    state: &ApiState,
    scope: DonationScope,
    query: DonationListQuery,
) -> Result<Json<ListResponse<DonationRow>>> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    );
    let filter = DonationFilter {
        status: query.status,
        category_id: query.category_id,
    };
    let (data, total) = db::list_donations(&state.pool, scope, filter, page).await?;
    Ok(Json(ListResponse {
        data,
        pagination: Pagination::new(page, total),
    }))
}

/// `POST /donations`
///
/// Registers a new pending donation owned by the caller.
pub async fn create_donation(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Json(req): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<DonationRow>)> {
    if !principal.role.is_donor() {
        return Err(ApiError::Forbidden(format!(
            "role {} cannot register donations",
            principal.role
        )));
    }
    validate::new_donation(&req)?;

    let id = db::insert_donation(&state.pool, principal.id, &req).await?;
    info!("Donation {id} registered by user {}", principal.id);
    Ok((StatusCode::CREATED, Json(load(&state, id).await?)))
}

/// `GET /donations`
///
/// Admins see everything, technicians what is assigned to them, donors their own.
pub async fn list_donations(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Query(query): Query<DonationListQuery>,
) -> Result<Json<ListResponse<DonationRow>>> {
    let scope = match principal.role {
        Role::Admin => DonationScope::All,
        Role::Technician => DonationScope::AssignedTo(principal.id),
        Role::Citizen | Role::Institution => DonationScope::OwnedBy(principal.id),
    };
    page_of(&state, scope, query).await
}

/// `GET /donations/user`
pub async fn list_user_donations(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Query(query): Query<DonationListQuery>,
) -> Result<Json<ListResponse<DonationRow>>> {
    page_of(&state, DonationScope::OwnedBy(principal.id), query).await
}

/// `GET /donations/open`
///
/// Pending donations nobody has claimed yet.
pub async fn list_open_donations(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    Query(query): Query<DonationListQuery>,
) -> Result<Json<ListResponse<DonationRow>>> {
    caller.require(&[Role::Technician, Role::Admin])?;
    page_of(&state, DonationScope::Open, query).await
}

/// `GET /donations/:id`
pub async fn get_donation(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Path(id): Path<i64>,
) -> Result<Json<DonationRow>> {
    let row = load(&state, id).await?;
    can_access(&principal, &row.to_record()?, Action::Read, &DonationPatch::default())
        .into_result()
        .map_err(|reason| ApiError::denied(reason, format!("donation {id}")))?;
    Ok(Json(row))
}

/// `PUT /donations/:id`
///
/// Fields outside the caller's allowlist are dropped. Moving the donation to
/// `completed` credits the owner's reward in the same transaction.
pub async fn update_donation(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Path(id): Path<i64>,
    Json(payload): Json<DonationPatch>,
) -> Result<Json<DonationRow>> {
    let row = load(&state, id).await?;
    let record = row.to_record()?;

    let decision = can_access(&principal, &record, Action::Write, &payload);
    if !decision.dropped.is_empty() {
        debug!(
            "Dropped {:?} from user {}'s write to donation {id}",
            decision.dropped, principal.id
        );
    }
    let mut patch = decision.into_result().map_err(|reason| {
        ApiError::denied(reason, format!("donation {id}: {}", record.status))
    })?;
    validate::patch(&patch)?;

    if patch.is_empty() {
        return Ok(Json(row));
    }

    let reward = match patch.status {
        Some(next) if awards_points(record.status, next) => {
            if patch.processed_date.is_none() {
                patch.processed_date = Some(chrono::Utc::now().to_rfc3339());
            }
            Some(state.rewards.compute_reward(
                patch.category_id.or(record.category_id),
                patch.condition_id.or(record.condition_id),
                patch.weight_kg.unwrap_or(record.weight_kg),
                patch.quantity.unwrap_or(record.quantity),
            ))
        }
        _ => None,
    };

    db::apply_donation_patch(
        &state.pool,
        id,
        record.status,
        record.owner_id,
        record.assigned_technician_id,
        &patch,
        reward,
    )
    .await?;

    if let Some(next) = patch.status {
        info!("Donation {id}: {} -> {next}", record.status);
    }
    if let Some(points) = reward {
        info!("Awarded {points} points to user {} for donation {id}", record.owner_id);
    }

    Ok(Json(load(&state, id).await?))
}

/// `PUT /donations/:id/status`
pub async fn update_status(
    state: State<Arc<ApiState>>,
    caller: Caller,
    path: Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<DonationRow>> {
    update_donation(state, caller, path, Json(req.into())).await
}

/// `POST /donations/:id/accept`
///
/// A technician claims a pending donation. Admins assign on behalf of the
/// technician named in the body.
pub async fn accept_donation(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Path(id): Path<i64>,
    body: Option<Json<AcceptRequest>>,
) -> Result<Json<DonationRow>> {
    let row = load(&state, id).await?;
    can_accept(&principal, &row.to_record()?)
        .map_err(|reason| ApiError::denied(reason, format!("donation {id}")))?;

    let technician_id = match principal.role {
        Role::Admin => body
            .and_then(|Json(req)| req.technician_id)
            .ok_or_else(|| ApiError::Validation("technician_id is required".to_string()))?,
        _ => principal.id,
    };
    if db::get_technician(&state.pool, technician_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("technician {technician_id}")));
    }

    db::assign_donation(&state.pool, id, technician_id).await?;
    info!(
        "Donation {id}: {} -> {} (technician {technician_id})",
        DonationStatus::Pending,
        DonationStatus::Assigned
    );
    Ok(Json(load(&state, id).await?))
}
