use async_trait::async_trait;
use skyhold_shared::InventoryEvent;

#[derive(Debug, thiserror::Error)]
#[error("Event publish failed on {topic}: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

/// Outbound side of the engine. Called only after the partition lock is dropped;
/// a failure is logged by the caller and never undoes the state change.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &InventoryEvent) -> Result<(), PublishError>;
}
