use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cabin classes sold on a flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
}

impl CabinClass {
    pub const ALL: [CabinClass; 2] = [CabinClass::Economy, CabinClass::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCabinError(pub String);

impl fmt::Display for ParseCabinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown cabin class: {}", self.0)
    }
}

impl std::error::Error for ParseCabinError {}

impl FromStr for CabinClass {
    type Err = ParseCabinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            other => Err(ParseCabinError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cabin_parsing() {
        assert_eq!("economy".parse::<CabinClass>(), Ok(CabinClass::Economy));
        assert_eq!("BUSINESS".parse::<CabinClass>(), Ok(CabinClass::Business));
        assert!("first".parse::<CabinClass>().is_err());

        let json = serde_json::to_string(&CabinClass::Business).unwrap();
        assert_eq!(json, "\"business\"");
    }
}
