//! Technician and institution directories and self-service profiles.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use raee_rules::{Principal, Role};

use crate::api::ApiState;
use crate::auth::Caller;
use crate::db::{self, DonationScope, InstitutionFilter, TechnicianFilter};
use crate::errors::{ApiError, Result};
use crate::models::{
    InstitutionListQuery, InstitutionProfileUpdate, InstitutionRecord, InstitutionStats,
    ListResponse, Page, Pagination, TechnicianListQuery, TechnicianProfileUpdate,
    TechnicianRecord, TechnicianStats,
};
use crate::validate;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Statistics are visible to the profile's owner and to admins.
fn require_self_or_admin(principal: &Principal, user_id: i64) -> Result<()> {
    if principal.role == Role::Admin || principal.id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("statistics of user {user_id}")))
    }
}

/// `GET /technicians`
pub async fn list_technicians(
    State(state): State<Arc<ApiState>>,
    _caller: Caller,
    Query(query): Query<TechnicianListQuery>,
) -> Result<Json<ListResponse<TechnicianRecord>>> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    );
    let filter = TechnicianFilter {
        available: query.available,
        province: non_empty(query.province),
        specialty: non_empty(query.specialty),
        search: non_empty(query.search),
    };
    let (data, total) = db::list_technicians(&state.pool, &filter, page).await?;
    Ok(Json(ListResponse {
        data,
        pagination: Pagination::new(page, total),
    }))
}

/// `GET /technician/profile`
pub async fn technician_profile(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<TechnicianRecord>> {
    caller.require(&[Role::Technician])?;
    let id = caller.0.id;
    let profile = db::get_technician(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("technician {id}")))?;
    Ok(Json(profile))
}

/// `PUT /technician/profile`
pub async fn update_technician_profile(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    Json(update): Json<TechnicianProfileUpdate>,
) -> Result<Json<TechnicianRecord>> {
    caller.require(&[Role::Technician])?;
    if let Some(address) = &update.workshop_address {
        validate::text("workshop_address", address, 0, 255)?;
    }
    let id = caller.0.id;
    // availability comes back on its own once the open job is closed
    if update.available == Some(true)
        && db::status_counts(&state.pool, DonationScope::AssignedTo(id))
            .await?
            .open()
            > 0
    {
        return Err(ApiError::Conflict(
            "cannot mark yourself available with an open assignment".to_string(),
        ));
    }
    db::update_technician(&state.pool, id, &update).await?;
    let profile = db::get_technician(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("technician {id}")))?;
    Ok(Json(profile))
}

/// `GET /technicians/:id/stats`
pub async fn technician_stats(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Path(id): Path<i64>,
) -> Result<Json<TechnicianStats>> {
    require_self_or_admin(&principal, id)?;
    if db::get_technician(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("technician {id}")));
    }
    Ok(Json(db::technician_stats(&state.pool, id).await?))
}

/// `GET /institutions`
pub async fn list_institutions(
    State(state): State<Arc<ApiState>>,
    _caller: Caller,
    Query(query): Query<InstitutionListQuery>,
) -> Result<Json<ListResponse<InstitutionRecord>>> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        state.config.default_page_size,
        state.config.max_page_size,
    );
    let filter = InstitutionFilter {
        kind: non_empty(query.kind),
        province: non_empty(query.province),
        search: non_empty(query.search),
    };
    let (data, total) = db::list_institutions(&state.pool, &filter, page).await?;
    Ok(Json(ListResponse {
        data,
        pagination: Pagination::new(page, total),
    }))
}

/// `GET /institution/profile`
pub async fn institution_profile(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<InstitutionRecord>> {
    caller.require(&[Role::Institution])?;
    let id = caller.0.id;
    let profile = db::get_institution(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("institution {id}")))?;
    Ok(Json(profile))
}

/// `PUT /institution/profile`
pub async fn update_institution_profile(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    Json(update): Json<InstitutionProfileUpdate>,
) -> Result<Json<InstitutionRecord>> {
    caller.require(&[Role::Institution])?;
    if let Some(name) = &update.name {
        validate::text("name", name, 2, 100)?;
    }
    if let Some(contact) = &update.contact_email {
        validate::email(contact)?;
    }
    let id = caller.0.id;
    db::update_institution(&state.pool, id, &update).await?;
    let profile = db::get_institution(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("institution {id}")))?;
    Ok(Json(profile))
}

/// `GET /institutions/:id/stats`
pub async fn institution_stats(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
    Path(id): Path<i64>,
) -> Result<Json<InstitutionStats>> {
    require_self_or_admin(&principal, id)?;
    if db::get_institution(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("institution {id}")));
    }
    Ok(Json(db::institution_stats(&state.pool, id).await?))
}
