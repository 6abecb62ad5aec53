//! Memoization key for street-network paths.

use crate::domain::{PeriodExtremity, StreetNetworkMode, StreetNetworkPathType};

/// Identity of a direct path within one request.
///
/// The path type matters because, for car, it tells whether the car is
/// parked before or after the public transport. The extremity is only kept
/// by backends whose answer depends on the departure time (traffic).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreetNetworkPathKey {
    pub mode: StreetNetworkMode,
    pub origin_uri: String,
    pub destination_uri: String,
    pub path_type: StreetNetworkPathType,
    pub period_extremity: Option<PeriodExtremity>,
}

impl StreetNetworkPathKey {
    pub fn new(
        mode: StreetNetworkMode,
        origin_uri: impl Into<String>,
        destination_uri: impl Into<String>,
        path_type: StreetNetworkPathType,
        period_extremity: Option<PeriodExtremity>,
    ) -> Self {
        Self {
            mode,
            origin_uri: origin_uri.into(),
            destination_uri: destination_uri.into(),
            path_type,
            period_extremity,
        }
    }
}
