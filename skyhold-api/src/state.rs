use std::sync::Arc;

use skyhold_inventory::{BroadcastPublisher, InventoryEngine};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InventoryEngine>,
    /// In-process event feed behind the SSE endpoint.
    pub events: BroadcastPublisher,
}
