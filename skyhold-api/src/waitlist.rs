use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use skyhold_core::hold::HoldResult;
use skyhold_core::waitlist::{RemovalReason, WaitlistEntry};
use skyhold_core::CabinClass;
use skyhold_inventory::WaitlistPlacement;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/waitlist", post(add_to_waitlist))
        .route("/v1/waitlist/{id}", get(get_entry))
        .route("/v1/waitlist/{id}/remove", post(remove_from_waitlist))
        .route("/v1/waitlist/{id}/claim", post(claim_offer))
}

#[derive(Debug, Deserialize)]
pub struct AddToWaitlistRequest {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub owner_id: String,
}

/// POST /v1/waitlist
async fn add_to_waitlist(
    State(state): State<AppState>,
    Json(req): Json<AddToWaitlistRequest>,
) -> Result<(StatusCode, Json<WaitlistPlacement>), AppError> {
    let placement = state
        .engine
        .add_to_waitlist(req.flight_id, req.cabin_class, req.seats, &req.owner_id)
        .await?;
    Ok((StatusCode::CREATED, Json(placement)))
}

/// GET /v1/waitlist/{id}
async fn get_entry(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<WaitlistEntry>, AppError> {
    Ok(Json(state.engine.get_waitlist_entry(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub reason: RemovalReason,
}

/// POST /v1/waitlist/{id}/remove
async fn remove_from_waitlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<WaitlistEntry>, AppError> {
    Ok(Json(state.engine.remove_from_waitlist(id, req.reason).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub session_id: String,
}

/// POST /v1/waitlist/{id}/claim
async fn claim_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimRequest>,
) -> Result<(StatusCode, Json<HoldResult>), AppError> {
    let result = state.engine.claim_offer(id, &req.session_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}
