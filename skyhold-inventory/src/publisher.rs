use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use skyhold_core::events::{EventPublisher, PublishError};
use skyhold_shared::InventoryEvent;

/// In-process fan-out of engine events. Sending with no subscribers is not an error.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<InventoryEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &InventoryEvent) -> Result<(), PublishError> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Sends every event to each inner publisher in turn. One failing sink does not stop
/// the others; the first error is reported.
#[derive(Clone, Default)]
pub struct FanoutPublisher {
    sinks: Vec<Arc<dyn EventPublisher>>,
}

impl FanoutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl EventPublisher for FanoutPublisher {
    async fn publish(&self, event: &InventoryEvent) -> Result<(), PublishError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyhold_shared::models::events::HoldCreatedEvent;
    use skyhold_shared::CabinClass;
    use uuid::Uuid;

    struct Failing;

    #[async_trait]
    impl EventPublisher for Failing {
        async fn publish(&self, event: &InventoryEvent) -> Result<(), PublishError> {
            Err(PublishError {
                topic: event.topic().to_string(),
                reason: "broker down".to_string(),
            })
        }
    }

    fn event() -> InventoryEvent {
        InventoryEvent::HoldCreated(HoldCreatedEvent {
            hold_id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            cabin_class: CabinClass::Economy,
            seats: 2,
            owner_id: "user-1".to_string(),
            expires_at: 0,
        })
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let local = BroadcastPublisher::new(8);
        let mut rx = local.subscribe();
        let fanout = FanoutPublisher::new()
            .with(Arc::new(Failing))
            .with(Arc::new(local.clone()));

        let result = fanout.publish(&event()).await;
        assert!(result.is_err());
        assert!(matches!(rx.try_recv(), Ok(InventoryEvent::HoldCreated(_))));
    }
}
