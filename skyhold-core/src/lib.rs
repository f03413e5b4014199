pub mod clock;
pub mod denied_boarding;
pub mod events;
pub mod flight;
pub mod forecast;
pub mod hold;
pub mod overbooking;
pub mod repository;
pub mod rules;
pub mod status;
pub mod waitlist;

pub use skyhold_shared::CabinClass;

use uuid::Uuid;

/// A (flight, cabin class) pair. Every seat-count mutation is serialized per partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PartitionKey {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
}

impl PartitionKey {
    pub fn new(flight_id: Uuid, cabin_class: CabinClass) -> Self {
        Self { flight_id, cabin_class }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.flight_id, self.cabin_class)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
    #[error("Inventory exhausted for {0}")]
    InventoryExhausted(PartitionKey),
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<repository::StoreError> for InventoryError {
    fn from(err: repository::StoreError) -> Self {
        InventoryError::PersistenceUnavailable(err.to_string())
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Implements `as_str`, `Display` and `FromStr` for a fieldless status enum so it
/// can travel through text columns and URL paths.
#[macro_export]
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::InventoryError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err($crate::InventoryError::Validation(format!(
                        "unknown {} value: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}
