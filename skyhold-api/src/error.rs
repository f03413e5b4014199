use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skyhold_core::InventoryError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Anyhow(anyhow::Error),
}

fn classify(err: &InventoryError) -> (StatusCode, &'static str) {
    match err {
        InventoryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        InventoryError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, "invalid_state_transition"),
        InventoryError::InventoryExhausted(_) => (StatusCode::UNPROCESSABLE_ENTITY, "inventory_exhausted"),
        InventoryError::PersistenceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "persistence_unavailable"),
        InventoryError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            AppError::Anyhow(err) => match err.downcast_ref::<InventoryError>() {
                Some(inventory) => {
                    let (status, code) = classify(inventory);
                    if status == StatusCode::SERVICE_UNAVAILABLE {
                        tracing::warn!("Storage unavailable: {}", inventory);
                    }
                    (status, code, inventory.to_string())
                }
                None => {
                    tracing::error!("Internal Server Error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal",
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyhold_core::{CabinClass, PartitionKey};
    use uuid::Uuid;

    #[test]
    fn test_inventory_errors_map_to_status_codes() {
        let key = PartitionKey::new(Uuid::new_v4(), CabinClass::Economy);
        let cases = vec![
            (InventoryError::NotFound("hold".into()), StatusCode::NOT_FOUND),
            (
                InventoryError::InvalidStateTransition { from: "released".into(), to: "converted".into() },
                StatusCode::CONFLICT,
            ),
            (InventoryError::InventoryExhausted(key), StatusCode::UNPROCESSABLE_ENTITY),
            (InventoryError::PersistenceUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (InventoryError::Validation("seats".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_unknown_errors_are_internal() {
        let response = AppError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
