use std::sync::Arc;
use std::time::Duration;

use common::types::{StopId, Time};
use serde::{Deserialize, Serialize};

use crate::algorithms::errors::{PreconditionError, QueryError, QueryResult};
use crate::algorithms::queries::QueryType;
use crate::path::Path;
use crate::raptor::c2::C2Calculator;
use crate::raptor::heuristics::HeuristicSummary;
use crate::transit::access_egress::AccessEgress;

/// A range query asks for all optimal paths between an origin and a destination departing (or
/// arriving) within a time window

pub struct Range {}
impl QueryType for Range {
    type Input = RaptorRequest;
    type Output = RaptorResponse;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Best arrival time, then fewest transfers
    #[default]
    Standard,
    /// Pareto optimal paths on arrival time, transfers, duration, c1 and optionally c2
    MultiCriteria,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    /// depart after the earliest departure time
    #[default]
    Forward,
    /// arrive by the latest arrival time
    Reverse,
}

#[derive(Debug, Clone, Default)]
pub struct RaptorRequest {
    pub profile: Profile,
    pub direction: SearchDirection,
    pub earliest_departure: Option<Time>,
    pub latest_arrival: Option<Time>,
    /// Length of the departure (forward) or arrival (reverse) window. Derived from heuristics if
    /// not set.
    pub search_window: Option<Time>,
    pub access: Vec<AccessEgress>,
    pub egress: Vec<AccessEgress>,
    pub max_transfers: Option<usize>,
    pub extra_transfers: Option<usize>,
    pub use_c2: bool,
    pub c2_calculator: Option<Arc<dyn C2Calculator>>,
    pub pass_through_points: Vec<StopId>,
    pub timeout: Option<Duration>,
    /// Stops for which every stop arrival event is logged
    pub debug_stops: Vec<StopId>,
}

impl RaptorRequest {
    /// Rejects caller misuse before any search state is built
    pub(crate) fn validate(&self, num_stops: usize) -> QueryResult<()> {
        match self.direction {
            SearchDirection::Forward if self.earliest_departure.is_none() => {
                return Err(QueryError::invalid("a forward search needs an earliest departure time"));
            }
            SearchDirection::Reverse if self.latest_arrival.is_none() => {
                return Err(QueryError::invalid("a reverse search needs a latest arrival time"));
            }
            _ => {}
        }
        if let (Some(edt), Some(lat)) = (self.earliest_departure, self.latest_arrival) {
            if lat < edt {
                return Err(QueryError::invalid("latest arrival time is before earliest departure time"));
            }
        }
        if self.search_window.is_some_and(|w| w < 0) {
            return Err(QueryError::invalid("negative search window"));
        }
        if self.access.is_empty() {
            return Err(QueryError::invalid("no access legs"));
        }
        if self.egress.is_empty() {
            return Err(QueryError::invalid("no egress legs"));
        }

        let has_pass_through = !self.pass_through_points.is_empty();
        if self.use_c2 && self.c2_calculator.is_none() && !has_pass_through {
            return Err(QueryError::invalid("c2 requested without a c2 calculator"));
        }
        if self.c2_calculator.is_some() && !self.use_c2 {
            return Err(QueryError::invalid("c2 calculator given, but c2 is not enabled"));
        }
        if self.c2_calculator.is_some() && has_pass_through {
            return Err(QueryError::invalid("pass-through points can not be combined with a custom c2 calculator"));
        }
        if self.profile == Profile::Standard && (self.use_c2 || has_pass_through) {
            return Err(QueryError::invalid("c2 and pass-through points need the multi-criteria profile"));
        }

        let stops = self.access.iter().chain(&self.egress).map(|leg| leg.stop)
            .chain(self.pass_through_points.iter().copied())
            .chain(self.debug_stops.iter().copied());
        for stop in stops {
            if stop.index() >= num_stops {
                return Err(QueryError::invalid(format!("unknown stop {}", stop)));
            }
        }

        for leg in self.access.iter().chain(&self.egress) {
            if leg.duration < 0 {
                return Err(PreconditionError::NegativeAccessEgress { stop: leg.stop, duration: leg.duration }.into());
            }
            if leg.c1 < 0 {
                return Err(PreconditionError::NegativeCost { what: format!("leg to {}", leg.stop), cost: leg.c1 }.into());
            }
        }
        Ok(())
    }

    /// Legs the search starts from: access forward, egress in reverse
    pub(crate) fn starting_legs(&self) -> &[AccessEgress] {
        match self.direction {
            SearchDirection::Forward => &self.access,
            SearchDirection::Reverse => &self.egress,
        }
    }

    pub(crate) fn ending_legs(&self) -> &[AccessEgress] {
        match self.direction {
            SearchDirection::Forward => &self.egress,
            SearchDirection::Reverse => &self.access,
        }
    }
}

/// The window iterations were run in. Forward: departure times, reverse: arrival times.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub from: Time,
    pub to: Time,
}

impl SearchWindow {
    pub fn len(&self) -> Time {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Best values per stop over all iterations of a search, for reuse by later searches
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StopArrivals {
    pub best_times: Vec<Option<Time>>,
    pub min_rides: Vec<Option<usize>>,
}

impl StopArrivals {
    pub(crate) fn new(num_stops: usize) -> Self {
        Self { best_times: vec![None; num_stops], min_rides: vec![None; num_stops] }
    }

    pub fn best_time(&self, stop: StopId) -> Option<Time> {
        self.best_times.get(stop.index()).copied().flatten()
    }

    pub fn min_rides(&self, stop: StopId) -> Option<usize> {
        self.min_rides.get(stop.index()).copied().flatten()
    }

    pub fn reached(&self, stop: StopId) -> bool {
        self.best_time(stop).is_some()
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RaptorResponse {
    pub paths: Vec<Path>,
    pub stop_arrivals: StopArrivals,
    /// `false` means there is no connection at all, not just none in this window
    pub heuristic_path_exists: bool,
    pub search_window: Option<SearchWindow>,
    pub iterations: usize,
    pub heuristics: Option<HeuristicSummary>,
}

impl RaptorResponse {
    pub(crate) fn no_connection(num_stops: usize, heuristics: Option<HeuristicSummary>) -> Self {
        Self {
            paths: vec![],
            stop_arrivals: StopArrivals::new(num_stops),
            heuristic_path_exists: false,
            search_window: None,
            iterations: 0,
            heuristics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raptor::c2::TripFareC2;

    fn valid() -> RaptorRequest {
        RaptorRequest {
            earliest_departure: Some(36_000),
            access: vec![AccessEgress::walk(StopId(0), 60)],
            egress: vec![AccessEgress::walk(StopId(2), 0)],
            ..Default::default()
        }
    }

    fn invalid_message(request: RaptorRequest) -> String {
        match request.validate(3) {
            Err(QueryError::InvalidRequest(msg)) => msg,
            other => panic!("expected an invalid request, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(valid().validate(3).is_ok());
        let mc = RaptorRequest {
            profile: Profile::MultiCriteria,
            use_c2: true,
            c2_calculator: Some(Arc::new(TripFareC2)),
            ..valid()
        };
        assert!(mc.validate(3).is_ok());
        let via = RaptorRequest {
            profile: Profile::MultiCriteria,
            pass_through_points: vec![StopId(1)],
            ..valid()
        };
        assert!(via.validate(3).is_ok());
    }

    #[test]
    fn test_caller_misuse() {
        assert!(invalid_message(RaptorRequest { earliest_departure: None, ..valid() }).contains("earliest departure"));
        assert!(invalid_message(RaptorRequest { direction: SearchDirection::Reverse, ..valid() }).contains("latest arrival"));
        assert!(invalid_message(RaptorRequest { access: vec![], ..valid() }).contains("access"));
        assert!(invalid_message(RaptorRequest {
            profile: Profile::MultiCriteria, use_c2: true, ..valid()
        }).contains("without a c2 calculator"));
        assert!(invalid_message(RaptorRequest {
            use_c2: true, c2_calculator: Some(Arc::new(TripFareC2)), ..valid()
        }).contains("multi-criteria"));
        assert!(invalid_message(RaptorRequest {
            profile: Profile::MultiCriteria,
            use_c2: true,
            c2_calculator: Some(Arc::new(TripFareC2)),
            pass_through_points: vec![StopId(1)],
            ..valid()
        }).contains("pass-through"));
        assert!(invalid_message(RaptorRequest {
            egress: vec![AccessEgress::walk(StopId(9), 0)], ..valid()
        }).contains("unknown stop S9"));
    }

    #[test]
    fn test_negative_leg_is_a_precondition_violation() {
        let request = RaptorRequest { access: vec![AccessEgress::walk(StopId(0), -1)], ..valid() };
        assert!(matches!(
            request.validate(3),
            Err(QueryError::Precondition(PreconditionError::NegativeAccessEgress { .. }))
        ));
    }

    #[test]
    fn test_legs_by_direction() {
        let forward = valid();
        assert_eq!(forward.starting_legs()[0].stop, StopId(0));
        let reverse = RaptorRequest { direction: SearchDirection::Reverse, latest_arrival: Some(40_000), ..valid() };
        assert_eq!(reverse.starting_legs()[0].stop, StopId(2));
        assert_eq!(reverse.ending_legs()[0].stop, StopId(0));
    }
}
