use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skyhold_core::flight::Flight;
use skyhold_core::overbooking::{NewOverbookingConfig, OverbookingConfig};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/flights/{id}", put(upsert_flight))
        .route("/v1/admin/overbooking-configs", post(create_config))
        .route("/v1/admin/overbooking-configs/{id}/deactivate", post(deactivate_config))
        .route("/v1/admin/sweeps/holds", post(sweep_holds))
        .route("/v1/admin/sweeps/offers", post(sweep_offers))
}

// ============================================================================
// Flights
// ============================================================================

/// PUT /v1/admin/flights/{id}
async fn upsert_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(flight): Json<Flight>,
) -> Result<Json<Flight>, AppError> {
    if flight.id != id {
        return Err(AppError::BadRequest("flight id does not match path".to_string()));
    }
    Ok(Json(state.engine.upsert_flight(flight).await?))
}

// ============================================================================
// Overbooking configs
// ============================================================================

/// POST /v1/admin/overbooking-configs
async fn create_config(
    State(state): State<AppState>,
    Json(req): Json<NewOverbookingConfig>,
) -> Result<(StatusCode, Json<OverbookingConfig>), AppError> {
    let config = state.engine.create_overbooking_config(req).await?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// POST /v1/admin/overbooking-configs/{id}/deactivate
async fn deactivate_config(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.engine.deactivate_overbooking_config(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Sweeps
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub expired: usize,
}

/// POST /v1/admin/sweeps/holds
async fn sweep_holds(State(state): State<AppState>) -> Result<Json<SweepResponse>, AppError> {
    let expired = state.engine.expire_old_holds().await?;
    Ok(Json(SweepResponse { expired }))
}

/// POST /v1/admin/sweeps/offers
async fn sweep_offers(State(state): State<AppState>) -> Result<Json<SweepResponse>, AppError> {
    let expired = state.engine.expire_waitlist_offers().await?;
    Ok(Json(SweepResponse { expired }))
}
