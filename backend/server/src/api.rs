//! Axum router, shared state and the account/catalog handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use raee_rules::{Principal, RewardRule, Role};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{self, Caller};
use crate::config::Config;
use crate::db;
use crate::directory;
use crate::donations;
use crate::errors::{ApiError, Result};
use crate::models::{
    CategoryRecord, ConditionRecord, HealthResponse, LoginRequest, LoginResponse, MessageResponse,
    PointsResponse, RegisterRequest, RegisterResponse, UserRecord,
};
use crate::validate;

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    /// Loaded once at startup; read-only afterwards.
    pub rewards: RewardRule,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/user/points", get(points))
        .route("/categories", get(categories))
        .route("/states", get(states))
        .route(
            "/donations",
            post(donations::create_donation).get(donations::list_donations),
        )
        .route("/donations/user", get(donations::list_user_donations))
        .route("/donations/open", get(donations::list_open_donations))
        .route(
            "/donations/:id",
            get(donations::get_donation).put(donations::update_donation),
        )
        .route("/donations/:id/status", put(donations::update_status))
        .route("/donations/:id/accept", post(donations::accept_donation))
        .route("/technicians", get(directory::list_technicians))
        .route("/technicians/:id/stats", get(directory::technician_stats))
        .route(
            "/technician/profile",
            get(directory::technician_profile).put(directory::update_technician_profile),
        )
        .route("/institutions", get(directory::list_institutions))
        .route("/institutions/:id/stats", get(directory::institution_stats))
        .route(
            "/institution/profile",
            get(directory::institution_profile).put(directory::update_institution_profile),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /register`
///
/// Creates the account and, for technicians and institutions, the matching
/// profile row in the same transaction.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    if req.role == Role::Admin {
        return Err(ApiError::Forbidden(
            "admin accounts cannot be self-registered".to_string(),
        ));
    }
    validate::registration(&req)?;

    let hash = auth::hash_password(&req.password)?;
    let user_id = db::insert_user(&state.pool, &req, &hash).await?;
    info!("Registered {} account {user_id}", req.role);

    Ok(Json(RegisterResponse {
        user_id,
        role: req.role,
    }))
}

/// `POST /login`
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let bad_credentials = || ApiError::Unauthorized("invalid credentials".to_string());

    let user = db::get_user_by_dni(&state.pool, &req.dni)
        .await?
        .ok_or_else(bad_credentials)?;
    if !auth::verify_password(&user.password_hash, &req.password) {
        warn!("Failed login for user {}", user.id);
        return Err(bad_credentials());
    }

    let principal = Principal::new(user.id, user.role()?);
    let token = auth::issue_token(
        &state.config.jwt_secret,
        &principal,
        state.config.token_ttl_secs,
    )?;
    Ok(Json(LoginResponse { token, user }))
}

/// `POST /logout`
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(_caller: Caller) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "logged out",
    })
}

/// `GET /profile`
pub async fn profile(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
) -> Result<Json<UserRecord>> {
    let user = db::get_user(&state.pool, principal.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", principal.id)))?;
    Ok(Json(user))
}

/// `GET /user/points`
pub async fn points(
    State(state): State<Arc<ApiState>>,
    Caller(principal): Caller,
) -> Result<Json<PointsResponse>> {
    let user = db::get_user(&state.pool, principal.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", principal.id)))?;
    Ok(Json(PointsResponse {
        user_id: user.id,
        points: user.points,
    }))
}

/// `GET /categories`
pub async fn categories(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<CategoryRecord>>> {
    Ok(Json(db::get_categories(&state.pool).await?))
}

/// `GET /states`
///
/// Device conditions and their reward multipliers.
pub async fn states(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<ConditionRecord>>> {
    Ok(Json(db::get_conditions(&state.pool).await?))
}
