//! Time anchors for street-network legs.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A datetime and its meaning on a fallback period.
///
/// When `represents_start` is true the datetime is the earliest acceptable
/// departure; otherwise it is the latest acceptable arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodExtremity {
    pub datetime: DateTime<Utc>,
    pub represents_start: bool,
}

impl PeriodExtremity {
    pub fn new(datetime: DateTime<Utc>, represents_start: bool) -> Self {
        Self {
            datetime,
            represents_start,
        }
    }

    /// Leave no earlier than `datetime`.
    pub fn departure(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime, true)
    }

    /// Arrive no later than `datetime`.
    pub fn arrival(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime, false)
    }

    /// The same anchor moved by `by` (negative moves it earlier).
    pub fn shifted(self, by: Duration) -> Self {
        Self {
            datetime: self.datetime + by,
            ..self
        }
    }
}

/// Position of a street-network leg relative to the public transport part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreetNetworkPathType {
    /// Point to point, no public transport.
    Direct,
    /// Before the public transport: known start, floating end.
    BeginningFallback,
    /// After the public transport: known end, floating start.
    EndingFallback,
}

impl StreetNetworkPathType {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, StreetNetworkPathType::Direct)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreetNetworkPathType::Direct => "direct",
            StreetNetworkPathType::BeginningFallback => "beginning_fallback",
            StreetNetworkPathType::EndingFallback => "ending_fallback",
        }
    }
}

impl fmt::Display for StreetNetworkPathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn shifted_keeps_direction() {
        let t = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let ext = PeriodExtremity::arrival(t).shifted(Duration::minutes(-5));

        assert_eq!(ext.datetime, Utc.with_ymd_and_hms(2024, 3, 15, 9, 55, 0).unwrap());
        assert!(!ext.represents_start);
    }

    #[test]
    fn path_type_display() {
        assert_eq!(StreetNetworkPathType::Direct.to_string(), "direct");
        assert_eq!(
            StreetNetworkPathType::EndingFallback.to_string(),
            "ending_fallback"
        );
        assert!(StreetNetworkPathType::BeginningFallback.is_fallback());
        assert!(!StreetNetworkPathType::Direct.is_fallback());
    }
}
