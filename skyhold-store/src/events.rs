use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use skyhold_core::events::{EventPublisher, PublishError};
use skyhold_shared::InventoryEvent;

/// Publishes engine events to Kafka, one topic per event type, keyed by flight so a
/// flight's events stay ordered within a partition.
#[derive(Clone)]
pub struct KafkaEventPublisher {
    producer: FutureProducer,
}

impl KafkaEventPublisher {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &InventoryEvent) -> Result<(), PublishError> {
        let topic = event.topic();
        let payload = serde_json::to_string(event).map_err(|e| PublishError {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        self.send(topic, &event.flight_id().to_string(), &payload)
            .await
            .map_err(|e| PublishError {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Consumer for the booking collaborator's topics. Auto-commit is off: the caller
/// commits each offset once the message has been applied.
pub fn booking_consumer(
    brokers: &str,
    group_id: &str,
    topics: &[&str],
) -> Result<StreamConsumer, rdkafka::error::KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(topics)?;
    info!("Subscribed to {:?} as {}", topics, group_id);
    Ok(consumer)
}
