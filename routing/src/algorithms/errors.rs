use crate::transit::timetable::TimetableError;
use common::types::{Cost, RouteId, StopId, Time, TripId};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::Display;

pub type QueryResult<O> = Result<O, QueryError>;

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    Precondition(#[from] PreconditionError),
    Timeout { iterations_completed: usize },
    InvalidRequest(String),
    Timetable(#[from] TimetableError),
}

impl QueryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        QueryError::InvalidRequest(msg.into())
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::Precondition(err) => write!(f, "Precondition violated: {}", err),
            QueryError::Timeout { iterations_completed } => write!(
                f, "Search aborted by timeout after {} iterations", iterations_completed
            ),
            QueryError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            QueryError::Timetable(err) => write!(f, "{}", err),
        }
    }
}

impl Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Broken invariants of the transit data or the street legs handed to the search. These point to
/// a bug in the layer producing the data and are never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    EmptyTransitData,
    UnknownStop(StopId),
    PatternTooShort { route: RouteId },
    TripLength { route: RouteId, trip: TripId, expected: usize, found: usize },
    NegativeTravelTime { trip: TripId, pos: usize },
    NegativeDwellTime { trip: TripId, pos: usize },
    OvertakingTrips { route: RouteId, first: TripId, second: TripId },
    NegativeTransfer { from: StopId, to: StopId },
    NegativeAccessEgress { stop: StopId, duration: Time },
    NegativeCost { what: String, cost: Cost },
}

impl Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreconditionError::EmptyTransitData => write!(f, "transit data has no stops or no routes"),
            PreconditionError::UnknownStop(stop) => write!(f, "unknown stop {}", stop),
            PreconditionError::PatternTooShort { route } => write!(f, "route {} visits less than two stops", route),
            PreconditionError::TripLength { route, trip, expected, found } => write!(
                f, "trip {} of route {} has {} stop times, but the pattern has {} stops", trip, route, found, expected
            ),
            PreconditionError::NegativeTravelTime { trip, pos } => write!(
                f, "trip {} arrives at stop position {} before departing from position {}", trip, pos + 1, pos
            ),
            PreconditionError::NegativeDwellTime { trip, pos } => write!(
                f, "trip {} departs before it arrives at stop position {}", trip, pos
            ),
            PreconditionError::OvertakingTrips { route, first, second } => write!(
                f, "trip {} overtakes trip {} on route {}", second, first, route
            ),
            PreconditionError::NegativeTransfer { from, to } => write!(
                f, "transfer {} -> {} has a negative duration or cost", from, to
            ),
            PreconditionError::NegativeAccessEgress { stop, duration } => write!(
                f, "access/egress leg to {} has a negative duration ({})", stop, duration
            ),
            PreconditionError::NegativeCost { what, cost } => write!(f, "{} has a negative cost ({})", what, cost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            QueryError::Timeout { iterations_completed: 3 }.to_string(),
            "Search aborted by timeout after 3 iterations"
        );
        assert_eq!(
            QueryError::from(PreconditionError::NegativeTravelTime { trip: TripId(7), pos: 1 }).to_string(),
            "Precondition violated: trip T7 arrives at stop position 2 before departing from position 1"
        );
        assert_eq!(
            QueryError::invalid("no access legs").to_string(),
            "Invalid request: no access legs"
        );
    }

    #[test]
    fn test_serialize_as_string() {
        let json = serde_json::to_string(&QueryError::invalid("x")).unwrap();
        assert_eq!(json, "\"Invalid request: x\"");
    }
}
