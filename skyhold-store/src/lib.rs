pub mod app_config;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod hold_repo;
pub mod overbooking_repo;
pub mod waitlist_repo;

pub use database::PgStore;
pub use events::KafkaEventPublisher;
