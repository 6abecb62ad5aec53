//! Direct path responses.

use std::fmt;

use serde::Serialize;

use crate::domain::Journey;

/// Domain code of a structured "no journey" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSolutionCode {
    NoSolution,
    NoOrigin,
    NoDestination,
}

impl NoSolutionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoSolutionCode::NoSolution => "no_solution",
            NoSolutionCode::NoOrigin => "no_origin",
            NoSolutionCode::NoDestination => "no_destination",
        }
    }
}

impl fmt::Display for NoSolutionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no journey could be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoSolution {
    pub code: NoSolutionCode,
    pub message: String,
}

/// Answer to a direct path query.
///
/// Three shapes:
/// - journeys found
/// - empty with no error: the query was skipped (e.g. crow-fly pre-filter)
/// - empty with a [`NoSolution`]: a backend or composer could not find a path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectPathResponse {
    pub journeys: Vec<Journey>,
    pub no_solution: Option<NoSolution>,
}

impl DirectPathResponse {
    /// A response with no journey and no error.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_journeys(journeys: Vec<Journey>) -> Self {
        Self {
            journeys,
            no_solution: None,
        }
    }

    pub fn no_solution(code: NoSolutionCode, message: impl Into<String>) -> Self {
        Self {
            journeys: Vec::new(),
            no_solution: Some(NoSolution {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }

    /// The first (best) journey, if any.
    pub fn first(&self) -> Option<&Journey> {
        self.journeys.first()
    }

    /// Take the first journey out of the response.
    pub fn into_first(self) -> Option<Journey> {
        self.journeys.into_iter().next()
    }
}
