pub(crate) mod arrival;
pub(crate) mod multi_criteria;
pub(crate) mod standard;

use std::fmt::Debug;

use common::types::{RouteId, StopId, Time};
use common::util::time::format_time;
use hashbrown::HashSet;
use itertools::Itertools;
use log::trace;

use crate::algorithms::queries::range::StopArrivals;
use crate::paretoset::ParetoSetEventListener;
use crate::path::Path;
use crate::raptor::context::SearchContext;
use crate::raptor::destination::DestinationArrivals;
use crate::raptor::state::arrival::{ArrivalArena, ArrivalId, ArrivalKind, StopArrival};
use crate::transit::access_egress::AccessEgress;
use crate::transit::{Route, TransitDataProvider};

/// Per-round logic of a search. The worker decides which rounds and iterations run; a strategy
/// decides which stop arrivals are kept.
pub(crate) trait RoutingStrategy<'c, 'a: 'c, D: TransitDataProvider + ?Sized + 'a> {
    fn base(&self) -> &SearchState<'c, 'a, D>;

    /// Drops all stop arrivals of the previous iteration
    fn setup_iteration(&mut self, max_round: usize);

    /// Adds the arrival at the end of a starting leg. Legs with rides are added in the round
    /// matching their number of rides and count as arrived on board.
    fn add_access(&mut self, leg_index: usize, leg: &AccessEgress, iteration_time: Time) {
        if let Some(arrival) = self.base().access_arrival(leg_index, leg, iteration_time) {
            self.accept(arrival);
        }
    }

    /// Keeps `arrival` if it is not dominated at its stop
    fn accept(&mut self, arrival: StopArrival);

    fn prepare_round(&mut self, round: usize, max_round: usize);

    fn route_pass(&mut self, route: &Route);

    fn transfers_pass(&mut self);

    fn is_new_round_available(&self) -> bool {
        !self.base().touched.is_empty()
    }

    fn destination_reached_current_round(&self) -> bool {
        self.base().destination.reached_current_round()
    }

    fn routes_touched_last_round(&self) -> Vec<RouteId> {
        self.base().routes_touched_last_round()
    }

    fn into_result(self) -> (Vec<Path>, StopArrivals)
    where
        Self: Sized;
}

/// Stops reached in a round, in the order they were reached
#[derive(Debug, Clone)]
pub(crate) struct StopsTouched {
    marked: Vec<bool>,
    stops: Vec<StopId>,
}

impl StopsTouched {
    pub fn new(num_stops: usize) -> Self {
        Self { marked: vec![false; num_stops], stops: Vec::new() }
    }

    pub fn insert(&mut self, stop: StopId) {
        if !self.marked[stop.index()] {
            self.marked[stop.index()] = true;
            self.stops.push(stop);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn contains(&self, stop: StopId) -> bool {
        self.marked[stop.index()]
    }

    pub fn stops(&self) -> &[StopId] {
        &self.stops
    }

    /// Empties the set, handing out the stops
    pub fn take(&mut self) -> Vec<StopId> {
        for stop in &self.stops {
            self.marked[stop.index()] = false;
        }
        std::mem::take(&mut self.stops)
    }

    pub fn clear(&mut self) {
        self.take();
    }
}

/// Logs every event of the Pareto set of a stop listed as debug stop in the request
#[derive(Debug, Clone, Copy)]
pub(crate) struct StopDebugListener {
    stop: StopId,
    enabled: bool,
}

impl StopDebugListener {
    pub fn new(stop: StopId, enabled: bool) -> Self {
        Self { stop, enabled }
    }
}

impl<T: Debug> ParetoSetEventListener<T> for StopDebugListener {
    fn accepted(&mut self, element: &T) {
        if self.enabled {
            trace!(target: "raptor::debug", "{} accepted {:?}", self.stop, element);
        }
    }

    fn rejected(&mut self, element: &T, by: &T) {
        if self.enabled {
            trace!(target: "raptor::debug", "{} rejected {:?}, dominated by {:?}", self.stop, element, by);
        }
    }

    fn dropped(&mut self, element: &T, by: &T) {
        if self.enabled {
            trace!(target: "raptor::debug", "{} dropped {:?} for {:?}", self.stop, element, by);
        }
    }
}

/// State shared by both strategies
pub(crate) struct SearchState<'c, 'a, D: ?Sized> {
    pub ctx: &'c SearchContext<'a, D>,
    pub arena: ArrivalArena,
    pub destination: DestinationArrivals<'c, 'a, D>,
    /// reached in the current round
    pub touched: StopsTouched,
    /// reached on board in the current round, the stops transfers start from
    pub touched_on_board: StopsTouched,
    pub touched_last_round: StopsTouched,
    pub round: usize,
    pub max_round: usize,
    pub stop_arrivals: StopArrivals,
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> SearchState<'c, 'a, D> {
    pub fn new(ctx: &'c SearchContext<'a, D>) -> Self {
        let num_stops = ctx.transit.num_stops();
        Self {
            ctx,
            arena: ArrivalArena::default(),
            destination: DestinationArrivals::new(ctx),
            touched: StopsTouched::new(num_stops),
            touched_on_board: StopsTouched::new(num_stops),
            touched_last_round: StopsTouched::new(num_stops),
            round: 0,
            max_round: 0,
            stop_arrivals: StopArrivals::new(num_stops),
        }
    }

    pub fn setup_iteration(&mut self, max_round: usize) {
        self.arena.clear();
        self.touched.clear();
        self.touched_on_board.clear();
        self.touched_last_round.clear();
        self.round = 0;
        self.max_round = max_round;
        self.destination.setup_iteration();
        self.destination.new_round();
    }

    pub fn prepare_round(&mut self, round: usize, max_round: usize) {
        debug_assert_eq!(round, self.round + 1, "rounds must be run in order");
        self.round = round;
        self.max_round = max_round;
        std::mem::swap(&mut self.touched, &mut self.touched_last_round);
        self.touched.clear();
        self.touched_on_board.clear();
        self.destination.new_round();
    }

    pub fn routes_touched_last_round(&self) -> Vec<RouteId> {
        let transit = self.ctx.transit;
        let routes: HashSet<RouteId> = self.touched_last_round.stops().iter()
            .flat_map(|stop| transit.routes_serving(*stop).iter().copied())
            .collect();
        routes.into_iter().sorted_unstable().collect()
    }

    /// The arrival at the end of a starting leg, started as close to `iteration_time` as its
    /// opening hours allow. `None` if the leg is closed.
    pub fn access_arrival(&self, leg_index: usize, leg: &AccessEgress, iteration_time: Time) -> Option<StopArrival> {
        let departure_time = self.ctx.calc.leg_start_time(leg, iteration_time)?;
        Some(StopArrival {
            stop: leg.stop,
            time: self.ctx.calc.plus(departure_time, leg.duration),
            round: leg.rides,
            c1: leg.c1,
            c2: self.ctx.c2_access(leg.stop),
            kind: ArrivalKind::Access { leg: leg_index, rides: leg.rides, departure_time },
            predecessor: None,
        })
    }

    pub fn is_pruned(&self, arrival: &StopArrival) -> bool {
        let pruned = self.ctx.prune(arrival.stop, arrival.time, arrival.round, self.max_round);
        if pruned && self.ctx.is_debug_stop(arrival.stop) {
            trace!(
                target: "raptor::debug",
                "{} pruned at {} in round {}", arrival.stop, format_time(arrival.time), arrival.round
            );
        }
        pruned
    }

    /// `true` if the paths found so far beat everything `arrival` can lead to
    pub fn is_covered(&self, arrival: &StopArrival) -> bool {
        let covered = self.destination.covers(&self.arena, arrival);
        if covered && self.ctx.is_debug_stop(arrival.stop) {
            trace!(
                target: "raptor::debug",
                "{} dropped at {} with c1 {}, a path found before is better", arrival.stop, format_time(arrival.time), arrival.c1
            );
        }
        covered
    }

    /// Bookkeeping after an arrival was accepted. Only stops whose best arrival improved are
    /// boarded from in the next round.
    pub fn accepted(&mut self, id: ArrivalId, improves_stop: bool) {
        let arrival = self.arena[id];
        if improves_stop {
            self.touched.insert(arrival.stop);
        }
        if arrival.arrived_on_board() {
            self.touched_on_board.insert(arrival.stop);
        }
        self.record_stop_arrival(&arrival);
        if self.ctx.is_debug_stop(arrival.stop) {
            trace!(
                target: "raptor::debug",
                "{} reached at {} in round {} with c1 {} ({:?})",
                arrival.stop, format_time(arrival.time), arrival.round, arrival.c1, arrival.kind
            );
        }
        self.destination.arrive(&self.arena, id);
    }

    fn record_stop_arrival(&mut self, arrival: &StopArrival) {
        let idx = arrival.stop.index();
        let calc = &self.ctx.calc;
        let best_times = &mut self.stop_arrivals.best_times[idx];
        if best_times.is_none_or(|best| calc.is_better(arrival.time, best)) {
            *best_times = Some(arrival.time);
        }
        let min_rides = &mut self.stop_arrivals.min_rides[idx];
        if min_rides.is_none_or(|rides| arrival.round < rides) {
            *min_rides = Some(arrival.round);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_touched_keeps_order_and_deduplicates() {
        let mut touched = StopsTouched::new(5);
        touched.insert(StopId(3));
        touched.insert(StopId(1));
        touched.insert(StopId(3));
        assert_eq!(touched.take(), vec![StopId(3), StopId(1)]);
        assert!(touched.is_empty());
        touched.insert(StopId(3));
        assert!(!touched.is_empty());
    }
}
