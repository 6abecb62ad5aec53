//! Journey and section types.
//!
//! A `Journey` is the street-network answer to one direct-path query: one or
//! more sections laid end to end in time and space. Composers splice several
//! journeys together and then call [`Journey::recompute_totals`] and
//! [`Journey::renumber_sections`] to restore the aggregates and ids.

use chrono::{DateTime, Duration, Utc};

use super::{Coord, DomainError, PeriodExtremity, Place, StreetNetworkMode};

/// What a section represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    StreetNetwork,
    Park,
    Waiting,
    CrowFly,
    Transfer,
    LeaveParking,
    BssRent,
    BssPutBack,
}

/// One contiguous piece of a journey.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Sequential id (`section_0`, `section_1`, ...), reassigned on any reorder
    pub id: String,
    pub section_type: SectionType,
    pub origin: Place,
    pub destination: Place,
    pub begin_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub duration: Duration,
    /// Length in meters
    pub length: f64,
    /// Street-network mode, absent for waiting/park sections
    pub mode: Option<StreetNetworkMode>,
    /// Geometry, from origin to destination
    pub coordinates: Vec<Coord>,
}

impl Section {
    /// A street-network section travelled in `mode`.
    pub fn street_network(
        mode: StreetNetworkMode,
        origin: Place,
        destination: Place,
        begin_date_time: DateTime<Utc>,
        duration: Duration,
        length: f64,
    ) -> Self {
        Self {
            id: String::new(),
            section_type: SectionType::StreetNetwork,
            origin,
            destination,
            begin_date_time,
            end_date_time: begin_date_time + duration,
            duration,
            length,
            mode: Some(mode),
            coordinates: Vec::new(),
        }
    }

    /// A stationary section (waiting, parking) at a single place.
    pub fn stationary(
        section_type: SectionType,
        place: Place,
        begin_date_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            id: String::new(),
            section_type,
            origin: place.clone(),
            destination: place,
            begin_date_time,
            end_date_time: begin_date_time + duration,
            duration,
            length: 0.0,
            mode: None,
            coordinates: Vec::new(),
        }
    }

    /// Move both timestamps by `by`.
    pub fn shift(&mut self, by: Duration) {
        self.begin_date_time += by;
        self.end_date_time += by;
    }

    /// Travel the section the other way round.
    ///
    /// Timestamps are left untouched; the caller re-anchors the journey.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.origin, &mut self.destination);
        self.coordinates.reverse();
        self.section_type = match self.section_type {
            SectionType::BssRent => SectionType::BssPutBack,
            SectionType::BssPutBack => SectionType::BssRent,
            SectionType::Park => SectionType::LeaveParking,
            SectionType::LeaveParking => SectionType::Park,
            other => other,
        };
    }
}

/// Time spent per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub total: Duration,
    pub walking: Duration,
    pub bike: Duration,
    pub bss: Duration,
    pub car: Duration,
    pub taxi: Duration,
    pub ridesharing: Duration,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            total: Duration::zero(),
            walking: Duration::zero(),
            bike: Duration::zero(),
            bss: Duration::zero(),
            car: Duration::zero(),
            taxi: Duration::zero(),
            ridesharing: Duration::zero(),
        }
    }
}

impl Durations {
    /// Time spent in `mode`; `car_no_park` counts as car.
    pub fn get(&self, mode: StreetNetworkMode) -> Duration {
        match mode {
            StreetNetworkMode::Walking => self.walking,
            StreetNetworkMode::Bike => self.bike,
            StreetNetworkMode::Bss => self.bss,
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => self.car,
            StreetNetworkMode::Taxi => self.taxi,
            StreetNetworkMode::Ridesharing => self.ridesharing,
        }
    }

    fn slot(&mut self, mode: StreetNetworkMode) -> &mut Duration {
        match mode {
            StreetNetworkMode::Walking => &mut self.walking,
            StreetNetworkMode::Bike => &mut self.bike,
            StreetNetworkMode::Bss => &mut self.bss,
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => &mut self.car,
            StreetNetworkMode::Taxi => &mut self.taxi,
            StreetNetworkMode::Ridesharing => &mut self.ridesharing,
        }
    }
}

/// Distance travelled per mode, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Distances {
    pub walking: f64,
    pub bike: f64,
    pub bss: f64,
    pub car: f64,
    pub taxi: f64,
    pub ridesharing: f64,
}

impl Distances {
    pub fn get(&self, mode: StreetNetworkMode) -> f64 {
        match mode {
            StreetNetworkMode::Walking => self.walking,
            StreetNetworkMode::Bike => self.bike,
            StreetNetworkMode::Bss => self.bss,
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => self.car,
            StreetNetworkMode::Taxi => self.taxi,
            StreetNetworkMode::Ridesharing => self.ridesharing,
        }
    }

    fn slot(&mut self, mode: StreetNetworkMode) -> &mut f64 {
        match mode {
            StreetNetworkMode::Walking => &mut self.walking,
            StreetNetworkMode::Bike => &mut self.bike,
            StreetNetworkMode::Bss => &mut self.bss,
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => &mut self.car,
            StreetNetworkMode::Taxi => &mut self.taxi,
            StreetNetworkMode::Ridesharing => &mut self.ridesharing,
        }
    }
}

/// A street-network journey.
///
/// # Invariants
///
/// Maintained by [`Journey::from_sections`], [`Journey::anchor`] and
/// [`Journey::recompute_totals`], checked by [`Journey::check_invariants`]:
///
/// - `arrival_date_time == departure_date_time + duration`
/// - `duration` is the sum of the section durations
/// - each section starts when and where the previous one ends
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    pub departure_date_time: DateTime<Utc>,
    pub arrival_date_time: DateTime<Utc>,
    pub duration: Duration,
    pub sections: Vec<Section>,
    pub durations: Durations,
    pub distances: Distances,
}

impl Journey {
    /// Build a journey from sections already laid out in time.
    ///
    /// # Errors
    ///
    /// Returns `Err` if there are no sections.
    pub fn from_sections(sections: Vec<Section>) -> Result<Self, DomainError> {
        let first = sections.first().ok_or(DomainError::EmptyJourney)?;
        let departure = first.begin_date_time;

        let mut journey = Journey {
            departure_date_time: departure,
            arrival_date_time: departure,
            duration: Duration::zero(),
            sections,
            durations: Durations::default(),
            distances: Distances::default(),
        };
        journey.recompute_totals();
        journey.renumber_sections();
        Ok(journey)
    }

    /// Lay the sections end to end from the extremity.
    ///
    /// A start extremity fixes the departure; an end extremity fixes the
    /// arrival and the sections are laid backwards from it.
    pub fn anchor(&mut self, extremity: PeriodExtremity) {
        let total = self.section_duration_sum();
        let mut t = if extremity.represents_start {
            extremity.datetime
        } else {
            extremity.datetime - total
        };

        for section in &mut self.sections {
            section.begin_date_time = t;
            section.end_date_time = t + section.duration;
            t = section.end_date_time;
        }

        self.departure_date_time = t - total;
        self.recompute_totals();
    }

    /// Move the whole journey by `by`.
    pub fn shift(&mut self, by: Duration) {
        for section in &mut self.sections {
            section.shift(by);
        }
        self.departure_date_time += by;
        self.arrival_date_time += by;
    }

    /// Recompute duration, arrival and per-mode totals from the sections.
    pub fn recompute_totals(&mut self) {
        if let Some(first) = self.sections.first() {
            self.departure_date_time = first.begin_date_time;
        }
        self.duration = self.section_duration_sum();
        self.arrival_date_time = self.departure_date_time + self.duration;

        let mut durations = Durations {
            total: self.duration,
            ..Durations::default()
        };
        let mut distances = Distances::default();
        for section in &self.sections {
            if let Some(mode) = section.mode {
                *durations.slot(mode) += section.duration;
                *distances.slot(mode) += section.length;
            }
        }
        self.durations = durations;
        self.distances = distances;
    }

    /// Sort sections chronologically (stable for equal timestamps).
    pub fn sort_sections(&mut self) {
        self.sections
            .sort_by_key(|s| (s.begin_date_time, s.end_date_time));
    }

    /// Reassign section ids sequentially.
    pub fn renumber_sections(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.id = format!("section_{i}");
        }
    }

    /// Turn a journey computed from B to A into the same path from A to B,
    /// re-anchored on `extremity`.
    ///
    /// Durations, lengths and visited places are preserved; only the order,
    /// the direction of each section and the absolute timestamps change.
    pub fn reverse_direction(&mut self, extremity: PeriodExtremity) {
        self.sections.reverse();
        for section in &mut self.sections {
            section.reverse();
        }
        self.anchor(extremity);
        self.sort_sections();
        self.renumber_sections();
    }

    /// Replace the mode of every section for which `from` holds.
    pub fn reclassify_mode<F>(&mut self, from: F, to: StreetNetworkMode)
    where
        F: Fn(StreetNetworkMode) -> bool,
    {
        for section in &mut self.sections {
            if section.mode.is_some_and(&from) {
                section.mode = Some(to);
            }
        }
        self.recompute_totals();
    }

    /// URIs of every place touched, in order, without consecutive repeats.
    pub fn visited_places(&self) -> Vec<&str> {
        let mut places: Vec<&str> = Vec::with_capacity(self.sections.len() + 1);
        for section in &self.sections {
            for uri in [section.origin.uri(), section.destination.uri()] {
                if places.last() != Some(&uri) {
                    places.push(uri);
                }
            }
        }
        places
    }

    /// Check the time and place continuity of the sections and the totals.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.sections.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        for (i, section) in self.sections.iter().enumerate() {
            if section.end_date_time - section.begin_date_time != section.duration {
                return Err(DomainError::SectionDuration(i));
            }
        }

        for (i, pair) in self.sections.windows(2).enumerate() {
            if pair[0].end_date_time != pair[1].begin_date_time {
                return Err(DomainError::TimeGap(i + 1));
            }
            if pair[0].destination.uri() != pair[1].origin.uri() {
                return Err(DomainError::PlaceGap(i + 1));
            }
        }

        let sum = self.section_duration_sum();
        if sum != self.duration {
            return Err(DomainError::DurationMismatch {
                journey: self.duration.num_seconds(),
                sections: sum.num_seconds(),
            });
        }

        if self.arrival_date_time != self.departure_date_time + self.duration {
            return Err(DomainError::ArrivalMismatch);
        }

        Ok(())
    }

    fn section_duration_sum(&self) -> Duration {
        self.sections
            .iter()
            .fold(Duration::zero(), |acc, s| acc + s.duration)
    }
}
