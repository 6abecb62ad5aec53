//! Fallback modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown street network mode: {0}")]
pub struct InvalidMode(pub String);

/// A non-public-transport mode used to reach or leave the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreetNetworkMode {
    Walking,
    Bike,
    /// Bike sharing.
    Bss,
    Car,
    CarNoPark,
    Taxi,
    Ridesharing,
}

impl StreetNetworkMode {
    pub const ALL: [StreetNetworkMode; 7] = [
        StreetNetworkMode::Walking,
        StreetNetworkMode::Bike,
        StreetNetworkMode::Bss,
        StreetNetworkMode::Car,
        StreetNetworkMode::CarNoPark,
        StreetNetworkMode::Taxi,
        StreetNetworkMode::Ridesharing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreetNetworkMode::Walking => "walking",
            StreetNetworkMode::Bike => "bike",
            StreetNetworkMode::Bss => "bss",
            StreetNetworkMode::Car => "car",
            StreetNetworkMode::CarNoPark => "car_no_park",
            StreetNetworkMode::Taxi => "taxi",
            StreetNetworkMode::Ridesharing => "ridesharing",
        }
    }

    /// Modes driven in a car, whoever is at the wheel.
    pub fn is_car_like(&self) -> bool {
        matches!(
            self,
            StreetNetworkMode::Car
                | StreetNetworkMode::CarNoPark
                | StreetNetworkMode::Taxi
                | StreetNetworkMode::Ridesharing
        )
    }
}

impl FromStr for StreetNetworkMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StreetNetworkMode::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| InvalidMode(s.to_string()))
    }
}

impl fmt::Display for StreetNetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
