use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skyhold_core::flight::FlightCabinCapacity;
use skyhold_core::forecast::ForecastPoint;
use skyhold_core::overbooking::{OverbookingParams, OverbookingRecommendation};
use skyhold_core::status::InventoryStatus;
use skyhold_core::CabinClass;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/inventory/{flight_id}/{cabin}", get(get_status))
        .route("/v1/inventory/{flight_id}/{cabin}/overbooking", get(get_overbooking))
        .route("/v1/inventory/{flight_id}/{cabin}/cancellations", post(record_cancellation))
        .route("/v1/inventory/{flight_id}/{cabin}/waitlist/process", post(process_waitlist))
        .route("/v1/flights/{flight_id}/forecast", get(forecast))
}

pub(crate) fn parse_cabin(raw: &str) -> Result<CabinClass, AppError> {
    raw.parse().map_err(|e: skyhold_shared::ParseCabinError| AppError::BadRequest(e.to_string()))
}

/// GET /v1/inventory/{flight_id}/{cabin}
async fn get_status(
    State(state): State<AppState>,
    Path((flight_id, cabin)): Path<(Uuid, String)>,
) -> Result<Json<InventoryStatus>, AppError> {
    let cabin = parse_cabin(&cabin)?;
    Ok(Json(state.engine.get_inventory_status(flight_id, cabin).await?))
}

#[derive(Debug, Serialize)]
pub struct OverbookingResponse {
    pub params: OverbookingParams,
    pub overbooking_limit: i32,
    pub capacity: FlightCabinCapacity,
    pub oversold_seats: i32,
    pub recommendation: OverbookingRecommendation,
}

/// GET /v1/inventory/{flight_id}/{cabin}/overbooking
async fn get_overbooking(
    State(state): State<AppState>,
    Path((flight_id, cabin)): Path<(Uuid, String)>,
) -> Result<Json<OverbookingResponse>, AppError> {
    let cabin = parse_cabin(&cabin)?;
    let (params, limit) = state.engine.get_overbooking_params(flight_id, cabin).await?;
    let capacity = state.engine.get_capacity(flight_id, cabin).await?;
    let recommendation = state.engine.recommend_overbooking(flight_id, cabin).await?;

    Ok(Json(OverbookingResponse {
        params,
        overbooking_limit: limit,
        oversold_seats: capacity.oversold_seats(),
        capacity,
        recommendation,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CancellationRequest {
    pub seats: i32,
}

#[derive(Debug, Serialize)]
pub struct CancellationResponse {
    pub sold_seats: i32,
}

/// POST /v1/inventory/{flight_id}/{cabin}/cancellations
async fn record_cancellation(
    State(state): State<AppState>,
    Path((flight_id, cabin)): Path<(Uuid, String)>,
    Json(req): Json<CancellationRequest>,
) -> Result<Json<CancellationResponse>, AppError> {
    let cabin = parse_cabin(&cabin)?;
    let sold_seats = state.engine.record_cancellation(flight_id, cabin, req.seats).await?;
    Ok(Json(CancellationResponse { sold_seats }))
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub seats_offered: i32,
}

/// POST /v1/inventory/{flight_id}/{cabin}/waitlist/process
async fn process_waitlist(
    State(state): State<AppState>,
    Path((flight_id, cabin)): Path<(Uuid, String)>,
) -> Result<Json<ProcessResponse>, AppError> {
    let cabin = parse_cabin(&cabin)?;
    let seats_offered = state.engine.process_waitlist(flight_id, cabin).await?;
    Ok(Json(ProcessResponse { seats_offered }))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

fn default_days_ahead() -> u32 {
    30
}

/// GET /v1/flights/{flight_id}/forecast?days_ahead=N
async fn forecast(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastPoint>>, AppError> {
    Ok(Json(state.engine.forecast_demand(flight_id, query.days_ahead).await?))
}
