use std::sync::Arc;

use common::types::{StopId, Time};
use hashbrown::{HashMap, HashSet};

use crate::algorithms::queries::range::{RaptorRequest, SearchDirection, SearchWindow};
use crate::raptor::c2::{C2Calculator, RideSegment};
use crate::raptor::calculator::TransitCalculator;
use crate::raptor::config::SlackConfig;
use crate::raptor::cost::CostCalculator;
use crate::raptor::heuristics::Heuristics;
use crate::transit::access_egress::AccessEgress;
use crate::transit::TransitDataProvider;

/// Everything a single search reads but never changes
pub(crate) struct SearchContext<'a, D: ?Sized> {
    pub transit: &'a D,
    pub request: &'a RaptorRequest,
    pub calc: TransitCalculator,
    pub cost: CostCalculator,
    /// physical slack, used when rebuilding paths
    pub slack: SlackConfig,
    pub heuristics: Heuristics,
    pub c2: Option<Arc<dyn C2Calculator>>,
    pub window: SearchWindow,
    debug_stops: HashSet<StopId>,
    ending_legs_by_stop: HashMap<StopId, Vec<usize>>,
}

impl<'a, D: TransitDataProvider + ?Sized> SearchContext<'a, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transit: &'a D,
        request: &'a RaptorRequest,
        calc: TransitCalculator,
        cost: CostCalculator,
        slack: SlackConfig,
        heuristics: Heuristics,
        c2: Option<Arc<dyn C2Calculator>>,
        window: SearchWindow,
    ) -> Self {
        let mut ending_legs_by_stop: HashMap<StopId, Vec<usize>> = HashMap::new();
        for (idx, leg) in request.ending_legs().iter().enumerate() {
            ending_legs_by_stop.entry(leg.stop).or_default().push(idx);
        }
        Self {
            transit,
            request,
            calc,
            cost,
            slack,
            heuristics,
            c2,
            window,
            debug_stops: request.debug_stops.iter().copied().collect(),
            ending_legs_by_stop,
        }
    }

    pub fn starting_legs(&self) -> &'a [AccessEgress] {
        self.request.starting_legs()
    }

    pub fn ending_legs(&self) -> &'a [AccessEgress] {
        self.request.ending_legs()
    }

    /// Indices of the ending legs starting (in search direction) at `stop`
    pub fn ending_legs_at(&self, stop: StopId) -> &[usize] {
        self.ending_legs_by_stop.get(&stop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_debug_stop(&self, stop: StopId) -> bool {
        !self.debug_stops.is_empty() && self.debug_stops.contains(&stop)
    }

    /// Time the destination must be reached by, in search direction
    pub fn time_limit(&self) -> Option<Time> {
        match self.calc.direction() {
            SearchDirection::Forward => self.request.latest_arrival,
            SearchDirection::Reverse => self.request.earliest_departure,
        }
    }

    pub fn c2_access(&self, stop: StopId) -> i32 {
        self.c2.as_ref().map_or(0, |c2| c2.access(stop))
    }

    pub fn c2_alight(&self, c2: i32, ride: &RideSegment) -> i32 {
        self.c2.as_ref().map_or(c2, |calc| calc.alight(c2, ride))
    }

    pub fn c2_transfer(&self, c2: i32, to: StopId) -> i32 {
        self.c2.as_ref().map_or(c2, |calc| calc.transfer(c2, to))
    }

    /// `true` if `left` is better than `right` on c2. Always `false` without a c2 criterion.
    pub fn c2_dominates(&self, left: i32, right: i32) -> bool {
        self.c2.as_ref().is_some_and(|c2| c2.dominates(left, right))
    }

    /// `true` if an arrival at `stop` can not lead to a path: the stop does not reach the end of
    /// the search at all, it can not be done within the time limit, or it needs more rides than
    /// rounds are left.
    pub fn prune(&self, stop: StopId, time: Time, round: usize, max_round: usize) -> bool {
        let (Some(min_time), Some(min_rides)) = (self.heuristics.min_time(stop), self.heuristics.min_rides(stop)) else {
            return true;
        };
        if round + min_rides > max_round {
            return true;
        }
        let earliest_end = self.calc.plus(time, min_time);
        self.time_limit().is_some_and(|limit| self.calc.is_better(limit, earliest_end))
    }
}
