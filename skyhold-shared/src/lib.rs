pub mod models;

pub use models::cabin::{CabinClass, ParseCabinError};
pub use models::events::InventoryEvent;
