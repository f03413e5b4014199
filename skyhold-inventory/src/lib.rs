pub mod denied;
pub mod engine;
pub mod forecast;
pub mod holds;
pub mod locks;
pub mod memory;
pub mod policy;
pub mod publisher;
pub mod status;
pub mod waitlist;

pub use engine::InventoryEngine;
pub use memory::MemoryStore;
pub use publisher::{BroadcastPublisher, FanoutPublisher};
pub use waitlist::WaitlistPlacement;
