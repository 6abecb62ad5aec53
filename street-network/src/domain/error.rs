//! Domain error types.
//!
//! These errors represent journeys whose sections break the ordering and
//! continuity guarantees. They are distinct from backend/IO errors.

/// Domain-level errors for journey consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Journey has no sections
    #[error("journey must have at least one section")]
    EmptyJourney,

    /// A section does not start when the previous one ends
    #[error("section {0} does not start when the previous section ends")]
    TimeGap(usize),

    /// A section does not start where the previous one ends
    #[error("section {0} does not start where the previous section ends")]
    PlaceGap(usize),

    /// A section's timestamps disagree with its duration
    #[error("section {0} has timestamps inconsistent with its duration")]
    SectionDuration(usize),

    /// Journey totals disagree with its sections
    #[error("journey duration is {journey}s but its sections sum to {sections}s")]
    DurationMismatch { journey: i64, sections: i64 },

    /// Journey arrival is not departure plus duration
    #[error("journey arrival is not departure plus duration")]
    ArrivalMismatch,
}
