use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use skyhold_core::hold::{AllocationRequest, HoldResult, SeatHold};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(allocate_seats))
        .route("/v1/holds/{id}", get(get_hold))
        .route("/v1/holds/{id}/release", post(release_hold))
        .route("/v1/holds/{id}/convert", post(convert_hold))
}

/// POST /v1/holds
///
/// 201 when a hold was created, 202 when the whole request went to the waitlist.
async fn allocate_seats(
    State(state): State<AppState>,
    Json(req): Json<AllocationRequest>,
) -> Result<(StatusCode, Json<HoldResult>), AppError> {
    let result = state.engine.allocate_seats(req).await?;
    let status = if result.hold_id.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(result)))
}

/// GET /v1/holds/{id}
async fn get_hold(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SeatHold>, AppError> {
    Ok(Json(state.engine.get_hold(id).await?))
}

/// POST /v1/holds/{id}/release
async fn release_hold(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SeatHold>, AppError> {
    Ok(Json(state.engine.release_hold(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub booking_id: Uuid,
}

/// POST /v1/holds/{id}/convert
async fn convert_hold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<SeatHold>, AppError> {
    Ok(Json(state.engine.convert_hold(id, req.booking_id).await?))
}
