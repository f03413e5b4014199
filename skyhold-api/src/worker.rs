use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skyhold_core::rules::EngineRules;
use skyhold_core::{CabinClass, InventoryError};
use skyhold_inventory::InventoryEngine;
use skyhold_store::app_config::KafkaConfig;

/// Spawn the hold and offer sweepers. They run until the runtime shuts down; a failed
/// pass is logged and retried on the next tick.
pub fn start_sweepers(engine: Arc<InventoryEngine>, rules: &EngineRules) -> Vec<JoinHandle<()>> {
    let hold_period = Duration::from_secs(rules.hold_sweep_interval_secs.max(1));
    let offer_period = Duration::from_secs(rules.offer_sweep_interval_secs.max(1));

    let holds = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut ticker = interval(hold_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Hold sweeper started, every {:?}", hold_period);
            loop {
                ticker.tick().await;
                match engine.expire_old_holds().await {
                    Ok(0) => debug!("Hold sweep: nothing overdue"),
                    Ok(n) => info!("Hold sweep expired {} hold(s)", n),
                    Err(e) => error!("Hold sweep failed: {}", e),
                }
            }
        })
    };

    let offers = tokio::spawn(async move {
        let mut ticker = interval(offer_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Offer sweeper started, every {:?}", offer_period);
        loop {
            ticker.tick().await;
            match engine.expire_waitlist_offers().await {
                Ok(0) => debug!("Offer sweep: nothing lapsed"),
                Ok(n) => info!("Offer sweep expired {} offer(s)", n),
                Err(e) => error!("Offer sweep failed: {}", e),
            }
        }
    });

    vec![holds, offers]
}

#[derive(Debug, Deserialize)]
pub struct BookingConfirmed {
    pub hold_id: Uuid,
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BookingCancelled {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingMessageError {
    #[error("No handler for topic {0}")]
    UnknownTopic(String),
    #[error("Malformed payload on {topic}: {source}")]
    Malformed {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Apply one booking event to the engine.
pub async fn handle_booking_message(
    engine: &InventoryEngine,
    kafka: &KafkaConfig,
    topic: &str,
    payload: &str,
) -> Result<(), BookingMessageError> {
    let malformed = |source| BookingMessageError::Malformed {
        topic: topic.to_string(),
        source,
    };

    if topic == kafka.booking_confirmed_topic {
        let msg: BookingConfirmed = serde_json::from_str(payload).map_err(malformed)?;
        engine.convert_hold(msg.hold_id, msg.booking_id).await?;
        info!("Hold {} converted by booking {}", msg.hold_id, msg.booking_id);
        Ok(())
    } else if topic == kafka.booking_cancelled_topic {
        let msg: BookingCancelled = serde_json::from_str(payload).map_err(malformed)?;
        engine
            .record_cancellation(msg.flight_id, msg.cabin_class, msg.seats)
            .await?;
        Ok(())
    } else {
        Err(BookingMessageError::UnknownTopic(topic.to_string()))
    }
}

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(200);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Apply one booking event, retrying with exponential backoff while storage is
/// unavailable. Every other outcome is final.
pub async fn apply_with_retry(
    engine: &InventoryEngine,
    kafka: &KafkaConfig,
    topic: &str,
    payload: &str,
    initial_delay: Duration,
) -> Result<(), BookingMessageError> {
    let mut delay = initial_delay;
    loop {
        match handle_booking_message(engine, kafka, topic, payload).await {
            Err(BookingMessageError::Inventory(InventoryError::PersistenceUnavailable(reason))) => {
                warn!("Storage unavailable for event on {}: {}. Retrying in {:?}", topic, reason, delay);
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
            other => return other,
        }
    }
}

/// Consume booking confirmations and cancellations until the runtime shuts down.
/// An offset is committed only after its message was applied or rejected for good,
/// so a crash mid-message means redelivery, never loss.
pub async fn start_booking_worker(engine: Arc<InventoryEngine>, kafka: KafkaConfig) {
    let topics = [kafka.booking_confirmed_topic.as_str(), kafka.booking_cancelled_topic.as_str()];
    let consumer: StreamConsumer = match skyhold_store::events::booking_consumer(&kafka.brokers, &kafka.group_id, &topics) {
        Ok(consumer) => consumer,
        Err(e) => {
            error!("Booking worker could not start: {}", e);
            return;
        }
    };

    info!("Booking worker started, listening to {:?}", topics);

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let topic = m.topic();
                match m.payload_view::<str>() {
                    Some(Ok(payload)) => {
                        match apply_with_retry(&engine, &kafka, topic, payload, INITIAL_RETRY_DELAY).await {
                            Ok(()) => {}
                            // Redelivered confirmation for a hold that already moved on
                            Err(BookingMessageError::Inventory(e @ InventoryError::InvalidStateTransition { .. })) => {
                                warn!("Skipping booking event on {}: {}", topic, e)
                            }
                            Err(e) => error!("Dropping booking event on {}: {}", topic, e),
                        }
                    }
                    Some(Err(e)) => error!("Error reading payload on {}: {}", topic, e),
                    None => warn!("Empty message on {}", topic),
                }

                if let Err(e) = consumer.commit_message(&m, CommitMode::Async) {
                    warn!("Failed to commit offset {} on {} (may be redelivered): {}", m.offset(), topic, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use skyhold_core::clock::SystemClock;
    use skyhold_core::flight::{Flight, FlightStatus};
    use skyhold_core::hold::{AllocationRequest, HoldStatus};
    use skyhold_inventory::{BroadcastPublisher, MemoryStore};

    fn kafka() -> KafkaConfig {
        KafkaConfig {
            brokers: "localhost:9092".to_string(),
            enabled: true,
            group_id: "test".to_string(),
            booking_confirmed_topic: "booking.confirmed".to_string(),
            booking_cancelled_topic: "booking.cancelled".to_string(),
        }
    }

    async fn engine_with_flight() -> (InventoryEngine, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let engine = InventoryEngine::new(
            store.clone(),
            Arc::new(BroadcastPublisher::new(16)),
            Arc::new(SystemClock),
            EngineRules::default(),
        );
        let flight = engine
            .upsert_flight(Flight {
                id: Uuid::new_v4(),
                flight_number: "SK200".to_string(),
                airline_id: "SK".to_string(),
                origin_id: "CPH".to_string(),
                destination_id: "OSL".to_string(),
                departure_time: Utc::now() + ChronoDuration::days(7),
                status: FlightStatus::Scheduled,
                economy_seats: 10,
                business_seats: 0,
            })
            .await
            .unwrap();
        (engine, store, flight.id)
    }

    async fn hold_seats(engine: &InventoryEngine, flight_id: Uuid, seats: i32) -> Uuid {
        engine
            .allocate_seats(AllocationRequest {
                flight_id,
                cabin_class: CabinClass::Economy,
                seats,
                owner_id: "user-1".to_string(),
                session_id: "sess-1".to_string(),
            })
            .await
            .unwrap()
            .hold_id
            .unwrap()
    }

    #[tokio::test]
    async fn test_confirmation_converts_hold() {
        let (engine, _, flight_id) = engine_with_flight().await;
        let hold_id = hold_seats(&engine, flight_id, 2).await;

        let payload = serde_json::json!({ "hold_id": hold_id, "booking_id": Uuid::new_v4() }).to_string();
        handle_booking_message(&engine, &kafka(), "booking.confirmed", &payload)
            .await
            .unwrap();
        assert_eq!(engine.get_hold(hold_id).await.unwrap().status, HoldStatus::Converted);

        let cancel = serde_json::json!({ "flight_id": flight_id, "cabin_class": "economy", "seats": 1 }).to_string();
        handle_booking_message(&engine, &kafka(), "booking.cancelled", &cancel)
            .await
            .unwrap();
        let status = engine.get_inventory_status(flight_id, CabinClass::Economy).await.unwrap();
        assert_eq!(status.sold_seats, 1);

        let replay = handle_booking_message(&engine, &kafka(), "booking.confirmed", &payload).await;
        assert!(matches!(
            replay,
            Err(BookingMessageError::Inventory(InventoryError::InvalidStateTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_bad_messages_rejected() {
        let (engine, _, _) = engine_with_flight().await;
        let result = handle_booking_message(&engine, &kafka(), "booking.confirmed", "not json").await;
        assert!(matches!(result, Err(BookingMessageError::Malformed { .. })));

        let result = handle_booking_message(&engine, &kafka(), "booking.unknown", "{}").await;
        assert!(matches!(result, Err(BookingMessageError::UnknownTopic(_))));
    }

    #[tokio::test]
    async fn test_confirmation_waits_out_storage_outage() {
        let (engine, store, flight_id) = engine_with_flight().await;
        let hold_id = hold_seats(&engine, flight_id, 2).await;
        let payload = serde_json::json!({ "hold_id": hold_id, "booking_id": Uuid::new_v4() }).to_string();

        store.set_online(false);
        let restore = {
            let store = store.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(150)).await;
                store.set_online(true);
            })
        };

        apply_with_retry(&engine, &kafka(), "booking.confirmed", &payload, Duration::from_millis(20))
            .await
            .unwrap();
        restore.await.unwrap();

        assert_eq!(engine.get_hold(hold_id).await.unwrap().status, HoldStatus::Converted);
        let status = engine.get_inventory_status(flight_id, CabinClass::Economy).await.unwrap();
        assert_eq!(status.sold_seats, 2);
        assert_eq!(status.held_seats, 0);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let (engine, _, _) = engine_with_flight().await;
        let payload = serde_json::json!({ "hold_id": Uuid::new_v4(), "booking_id": Uuid::new_v4() }).to_string();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            apply_with_retry(&engine, &kafka(), "booking.confirmed", &payload, Duration::from_secs(5)),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(BookingMessageError::Inventory(InventoryError::NotFound(_)))));
    }
}
