//! Routing matrix entries.

use chrono::Duration;
use serde::Serialize;

/// Whether a matrix target could be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    Reached,
    Unreached,
    /// The backend gave no answer for this target
    Unknown,
}

/// One entry of a 1×n (or n×1) routing matrix.
///
/// Entries are aligned positionally with the multi-valued side of the query.
/// Only reached entries carry a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingMatrixRow {
    duration: Duration,
    status: RoutingStatus,
}

impl RoutingMatrixRow {
    pub fn reached(duration: Duration) -> Self {
        Self {
            duration,
            status: RoutingStatus::Reached,
        }
    }

    pub fn unreached() -> Self {
        Self {
            duration: Duration::zero(),
            status: RoutingStatus::Unreached,
        }
    }

    pub fn unknown() -> Self {
        Self {
            duration: Duration::zero(),
            status: RoutingStatus::Unknown,
        }
    }

    pub fn status(&self) -> RoutingStatus {
        self.status
    }

    /// The travel duration, only when the target was reached.
    pub fn duration(&self) -> Option<Duration> {
        match self.status {
            RoutingStatus::Reached => Some(self.duration),
            _ => None,
        }
    }

    /// Add a fixed time to a reached entry; other entries are unchanged.
    pub fn add_duration(&mut self, extra: Duration) {
        if self.status == RoutingStatus::Reached {
            self.duration += extra;
        }
    }
}

/// Index of the fastest reached entry; ties go to the first one.
pub fn fastest_reached(rows: &[RoutingMatrixRow]) -> Option<(usize, Duration)> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| row.duration().map(|d| (i, d)))
        .fold(None, |best, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastest_skips_unreached() {
        let rows = [
            RoutingMatrixRow::reached(Duration::seconds(300)),
            RoutingMatrixRow::unreached(),
            RoutingMatrixRow::reached(Duration::seconds(120)),
        ];
        assert_eq!(fastest_reached(&rows), Some((2, Duration::seconds(120))));
    }

    #[test]
    fn fastest_tie_goes_to_first() {
        let rows = [
            RoutingMatrixRow::unknown(),
            RoutingMatrixRow::reached(Duration::seconds(60)),
            RoutingMatrixRow::reached(Duration::seconds(60)),
        ];
        assert_eq!(fastest_reached(&rows), Some((1, Duration::seconds(60))));
    }

    #[test]
    fn fastest_none_reached() {
        let rows = [RoutingMatrixRow::unreached(), RoutingMatrixRow::unknown()];
        assert_eq!(fastest_reached(&rows), None);
        assert_eq!(fastest_reached(&[]), None);
    }

    #[test]
    fn add_duration_only_on_reached() {
        let mut reached = RoutingMatrixRow::reached(Duration::seconds(100));
        reached.add_duration(Duration::seconds(300));
        assert_eq!(reached.duration(), Some(Duration::seconds(400)));

        let mut unreached = RoutingMatrixRow::unreached();
        unreached.add_duration(Duration::seconds(300));
        assert_eq!(unreached.duration(), None);
    }
}
