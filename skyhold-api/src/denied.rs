use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use skyhold_core::denied_boarding::{DeniedBoardingRecord, DeniedBoardingStatus, NewDeniedBoarding, Resolution};
use skyhold_core::CabinClass;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/denied-boarding/resolve", post(resolve))
        .route("/v1/denied-boarding", post(record))
        .route("/v1/denied-boarding/{id}/status", post(update_status))
        .route("/v1/flights/{flight_id}/denied-boarding", get(list_for_flight))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats_needed: i32,
}

/// POST /v1/denied-boarding/resolve
async fn resolve(State(state): State<AppState>, Json(req): Json<ResolveRequest>) -> Result<Json<Resolution>, AppError> {
    let resolution = state
        .engine
        .handle_denied_boarding(req.flight_id, req.cabin_class, req.seats_needed)
        .await?;
    Ok(Json(resolution))
}

/// POST /v1/denied-boarding
async fn record(
    State(state): State<AppState>,
    Json(req): Json<NewDeniedBoarding>,
) -> Result<(StatusCode, Json<DeniedBoardingRecord>), AppError> {
    let record = state.engine.record_denied_boarding(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: DeniedBoardingStatus,
}

/// POST /v1/denied-boarding/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<DeniedBoardingRecord>, AppError> {
    Ok(Json(state.engine.update_denied_boarding_status(id, req.status).await?))
}

/// GET /v1/flights/{flight_id}/denied-boarding
async fn list_for_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<DeniedBoardingRecord>>, AppError> {
    Ok(Json(state.engine.list_denied_boardings(flight_id).await?))
}
