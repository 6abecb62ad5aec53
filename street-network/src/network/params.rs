//! Request-level routing parameters.

use chrono::Duration;

use crate::domain::StreetNetworkMode;

/// Default maximum direct path distance for every mode, in meters.
const DEFAULT_MAX_DIRECT_PATH_DISTANCE: f64 = 50_000.0;

/// Default maximum direct path duration for every mode, in seconds.
const DEFAULT_MAX_DIRECT_PATH_DURATION_SECS: i64 = 24 * 60 * 60;

/// Default taxi dwell time at either end of the public transport, in seconds.
const DEFAULT_TAXI_DWELL_SECS: i64 = 5 * 60;

/// One value per street-network mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTable<T> {
    pub walking: T,
    pub bike: T,
    pub bss: T,
    pub car: T,
    pub car_no_park: T,
    pub taxi: T,
    pub ridesharing: T,
}

impl<T: Copy> ModeTable<T> {
    /// The same value for every mode.
    pub fn uniform(value: T) -> Self {
        Self {
            walking: value,
            bike: value,
            bss: value,
            car: value,
            car_no_park: value,
            taxi: value,
            ridesharing: value,
        }
    }

    pub fn get(&self, mode: StreetNetworkMode) -> T {
        match mode {
            StreetNetworkMode::Walking => self.walking,
            StreetNetworkMode::Bike => self.bike,
            StreetNetworkMode::Bss => self.bss,
            StreetNetworkMode::Car => self.car,
            StreetNetworkMode::CarNoPark => self.car_no_park,
            StreetNetworkMode::Taxi => self.taxi,
            StreetNetworkMode::Ridesharing => self.ridesharing,
        }
    }

    pub fn set(&mut self, mode: StreetNetworkMode, value: T) {
        match mode {
            StreetNetworkMode::Walking => self.walking = value,
            StreetNetworkMode::Bike => self.bike = value,
            StreetNetworkMode::Bss => self.bss = value,
            StreetNetworkMode::Car => self.car = value,
            StreetNetworkMode::CarNoPark => self.car_no_park = value,
            StreetNetworkMode::Taxi => self.taxi = value,
            StreetNetworkMode::Ridesharing => self.ridesharing = value,
        }
    }

    /// Builder-style [`ModeTable::set`].
    pub fn with(mut self, mode: StreetNetworkMode, value: T) -> Self {
        self.set(mode, value);
        self
    }
}

/// Parameters of the journey request a street-network call belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingParams {
    /// Identifier of the inbound request, forwarded to backends
    pub request_id: String,

    /// Speed per mode, in m/s
    pub speeds: ModeTable<f64>,

    /// Crow-fly distance above which a direct path is not computed, in meters
    pub max_direct_path_distance: ModeTable<f64>,

    /// Estimated duration above which a direct path is not computed, in seconds
    pub max_direct_path_duration_secs: ModeTable<i64>,

    /// Taxi dwell time after the taxi leg, before the public transport (seconds)
    pub additional_time_after_first_section_taxi_secs: i64,

    /// Taxi dwell time before the taxi leg, after the public transport (seconds)
    pub additional_time_before_last_section_taxi_secs: i64,
}

impl RoutingParams {
    /// Default parameters for the given request.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Set the speed of a mode.
    pub fn with_speed(mut self, mode: StreetNetworkMode, speed: f64) -> Self {
        self.speeds.set(mode, speed);
        self
    }

    /// Set both direct path bounds of a mode.
    pub fn with_direct_path_bounds(
        mut self,
        mode: StreetNetworkMode,
        max_distance: f64,
        max_duration_secs: i64,
    ) -> Self {
        self.max_direct_path_distance.set(mode, max_distance);
        self.max_direct_path_duration_secs.set(mode, max_duration_secs);
        self
    }

    /// Set the taxi dwell times (after first / before last section).
    pub fn with_taxi_dwell(mut self, after_first_secs: i64, before_last_secs: i64) -> Self {
        self.additional_time_after_first_section_taxi_secs = after_first_secs;
        self.additional_time_before_last_section_taxi_secs = before_last_secs;
        self
    }

    pub fn speed(&self, mode: StreetNetworkMode) -> f64 {
        self.speeds.get(mode)
    }

    pub fn max_direct_path_duration(&self, mode: StreetNetworkMode) -> Duration {
        Duration::seconds(self.max_direct_path_duration_secs.get(mode))
    }

    pub fn taxi_dwell_after_first_section(&self) -> Duration {
        Duration::seconds(self.additional_time_after_first_section_taxi_secs)
    }

    pub fn taxi_dwell_before_last_section(&self) -> Duration {
        Duration::seconds(self.additional_time_before_last_section_taxi_secs)
    }
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            speeds: ModeTable {
                walking: 1.12,
                bike: 4.1,
                bss: 4.1,
                car: 11.11,
                car_no_park: 6.94,
                taxi: 11.11,
                ridesharing: 6.94,
            },
            max_direct_path_distance: ModeTable::uniform(DEFAULT_MAX_DIRECT_PATH_DISTANCE),
            max_direct_path_duration_secs: ModeTable::uniform(
                DEFAULT_MAX_DIRECT_PATH_DURATION_SECS,
            ),
            additional_time_after_first_section_taxi_secs: DEFAULT_TAXI_DWELL_SECS,
            additional_time_before_last_section_taxi_secs: DEFAULT_TAXI_DWELL_SECS,
        }
    }
}
