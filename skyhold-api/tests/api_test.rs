use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use skyhold_api::{app, AppState};
use skyhold_core::clock::SystemClock;
use skyhold_core::rules::EngineRules;
use skyhold_inventory::{BroadcastPublisher, InventoryEngine, MemoryStore};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let events = BroadcastPublisher::new(64);
    let engine = Arc::new(InventoryEngine::new(
        store.clone(),
        Arc::new(events.clone()),
        Arc::new(SystemClock),
        EngineRules::default(),
    ));
    TestApp {
        router: app(AppState { engine, events }),
        store,
    }
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn flight(&self, economy: i32) -> Uuid {
        let id = Uuid::new_v4();
        let (status, _) = self
            .call(
                "PUT",
                &format!("/v1/admin/flights/{}", id),
                Some(json!({
                    "id": id,
                    "flight_number": "SK300",
                    "airline_id": "SK",
                    "origin_id": "CPH",
                    "destination_id": "OSL",
                    "departure_time": Utc::now() + Duration::days(14),
                    "status": "scheduled",
                    "economy_seats": economy,
                    "business_seats": 0
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}

fn allocation(flight_id: Uuid, seats: i32, owner: &str) -> Value {
    json!({
        "flight_id": flight_id,
        "cabin_class": "economy",
        "seats": seats,
        "owner_id": owner,
        "session_id": format!("session-{}", owner)
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = app.call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_hold_lifecycle_over_http() {
    let app = test_app();
    let flight_id = app.flight(2).await;

    let (status, body) = app.call("POST", "/v1/holds", Some(allocation(flight_id, 2, "a"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["allocated"], 2);
    let hold_id = body["hold_id"].as_str().unwrap().to_string();

    let (status, body) = app.call("POST", "/v1/holds", Some(allocation(flight_id, 1, "b"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["allocated"], 0);
    assert_eq!(body["waitlist_position"], 1);
    let entry_id = body["waitlist_id"].as_str().unwrap().to_string();

    let (status, body) = app.call("GET", &format!("/v1/inventory/{}/economy", flight_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["held_seats"], 2);
    assert_eq!(body["status"], "waitlist_only");

    let (status, body) = app.call("POST", &format!("/v1/holds/{}/release", hold_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "released");

    let (status, body) = app.call("GET", &format!("/v1/waitlist/{}", entry_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "offered");

    let (status, body) = app
        .call(
            "POST",
            &format!("/v1/waitlist/{}/claim", entry_id),
            Some(json!({ "session_id": "session-b" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let claimed_hold = body["hold_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            "POST",
            &format!("/v1/holds/{}/convert", claimed_hold),
            Some(json!({ "booking_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "converted");

    let (status, body) = app
        .call(
            "POST",
            &format!("/v1/holds/{}/convert", claimed_hold),
            Some(json!({ "booking_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state_transition");
}

#[tokio::test]
async fn test_error_mapping() {
    let app = test_app();
    let flight_id = app.flight(1).await;

    let (status, body) = app.call("GET", &format!("/v1/holds/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = app.call("GET", &format!("/v1/inventory/{}/first", flight_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.call("POST", "/v1/holds", Some(allocation(flight_id, 0, "a"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let (status, body) = app
        .call("POST", "/v1/holds", Some(allocation(flight_id, i32::MAX, "a")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    app.store.set_online(false);
    let (status, body) = app.call("GET", &format!("/v1/inventory/{}/economy", flight_id), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "persistence_unavailable");
    app.store.set_online(true);
}

#[tokio::test]
async fn test_exhausted_when_waitlist_full() {
    let app = test_app();
    let flight_id = app.flight(1).await;
    let (status, _) = app.call("POST", "/v1/holds", Some(allocation(flight_id, 1, "a"))).await;
    assert_eq!(status, StatusCode::CREATED);

    for i in 0..50 {
        let (status, _) = app
            .call(
                "POST",
                "/v1/waitlist",
                Some(json!({
                    "flight_id": flight_id,
                    "cabin_class": "economy",
                    "seats": 1,
                    "owner_id": format!("w{}", i)
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.call("POST", "/v1/holds", Some(allocation(flight_id, 1, "late"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "inventory_exhausted");
}

#[tokio::test]
async fn test_overbooking_admin_and_denied_boarding() {
    let app = test_app();
    let flight_id = app.flight(100).await;

    let (status, config) = app
        .call(
            "POST",
            "/v1/admin/overbooking-configs",
            Some(json!({
                "airline_id": "SK",
                "origin_id": "CPH",
                "destination_id": "OSL",
                "economy_rate": 0.10,
                "business_rate": 0.0,
                "max_overbooking": 20,
                "historical_no_show_rate": 0.07
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call("GET", &format!("/v1/inventory/{}/economy/overbooking", flight_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overbooking_limit"], 10);
    assert_eq!(body["params"]["scope"], "route");

    let config_id = config["id"].as_str().unwrap();
    let (status, _) = app
        .call("POST", &format!("/v1/admin/overbooking-configs/{}/deactivate", config_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .call(
            "POST",
            "/v1/denied-boarding/resolve",
            Some(json!({ "flight_id": flight_id, "cabin_class": "economy", "seats_needed": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compensation_amount"], 40000);

    let (status, record) = app
        .call(
            "POST",
            "/v1/denied-boarding",
            Some(json!({
                "flight_id": flight_id,
                "booking_id": Uuid::new_v4(),
                "user_id": "user-x",
                "boarding_type": "involuntary",
                "compensation_amount": 40000,
                "compensation_type": "voucher",
                "alternative_flight_id": null
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"], "pending");

    let record_id = record["id"].as_str().unwrap();
    let (status, _) = app
        .call(
            "POST",
            &format!("/v1/denied-boarding/{}/status", record_id),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call("GET", &format!("/v1/flights/{}/denied-boarding", flight_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sweeps_and_forecast() {
    let app = test_app();
    let flight_id = app.flight(50).await;

    let (status, body) = app.call("POST", "/v1/admin/sweeps/holds", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 0);

    let (status, body) = app.call("POST", "/v1/admin/sweeps/offers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 0);

    let (status, body) = app
        .call("GET", &format!("/v1/flights/{}/forecast?days_ahead=3", flight_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}
