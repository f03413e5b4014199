use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights/{flight_id}/events", get(flight_events))
}

/// GET /v1/flights/{flight_id}/events
///
/// Server-sent stream of inventory events for one flight. Lagging subscribers skip
/// what they missed.
async fn flight_events(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.flight_id() == flight_id => {
            Some(Event::default().event(event.topic()).json_data(&event))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
