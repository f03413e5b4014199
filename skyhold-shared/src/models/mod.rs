pub mod cabin;
pub mod events;
