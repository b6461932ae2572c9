//! Multi-criteria range raptor. Every stop keeps a Pareto set of arrivals over time, rounds, c1,
//! c2 and whether the stop was reached on board. A route pass keeps a Pareto set of rides.

use std::sync::Arc;

use common::types::{Cost, StopId, Time};

use crate::algorithms::queries::range::StopArrivals;
use crate::paretoset::{ParetoComparator, ParetoSet};
use crate::path::Path;
use crate::raptor::c2::{C2Calculator, RideSegment};
use crate::raptor::calculator::TransitCalculator;
use crate::raptor::context::SearchContext;
use crate::raptor::state::arrival::{ArrivalId, ArrivalKind, StopArrival};
use crate::raptor::state::{RoutingStrategy, SearchState, StopDebugListener};
use crate::transit::{Route, TransitDataProvider};

/// The criteria of a stop arrival, kept in the Pareto set of its stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct McArrival {
    id: ArrivalId,
    time: Time,
    round: usize,
    c1: Cost,
    c2: i32,
    on_board: bool,
}

impl McArrival {
    fn new(id: ArrivalId, arrival: &StopArrival) -> Self {
        Self {
            id,
            time: arrival.time,
            round: arrival.round,
            c1: arrival.c1,
            c2: arrival.c2,
            on_board: arrival.arrived_on_board(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct McArrivalComparator {
    calc: TransitCalculator,
    c2: Option<Arc<dyn C2Calculator>>,
}

impl ParetoComparator<McArrival> for McArrivalComparator {
    fn left_dominance_exist(&self, left: &McArrival, right: &McArrival) -> bool {
        self.calc.is_better(left.time, right.time)
            || left.round < right.round
            || left.c1 < right.c1
            || self.c2.as_ref().is_some_and(|c2| c2.dominates(left.c2, right.c2))
            // transfers and walking egress may only follow an arrival on board
            || (left.on_board && !right.on_board)
    }
}

/// A trip boarded in the current round, not yet alighted
#[derive(Debug, Clone, Copy)]
struct McRide {
    prev: ArrivalId,
    trip_index: usize,
    board_pos: usize,
    board_time: Time,
    relative_c1: Cost,
    c2: i32,
}

type StopArrivalSet = ParetoSet<McArrival, McArrivalComparator, StopDebugListener>;

pub(crate) struct MultiCriteriaRouting<'c, 'a, D: ?Sized> {
    base: SearchState<'c, 'a, D>,
    stops: Vec<StopArrivalSet>,
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> MultiCriteriaRouting<'c, 'a, D> {
    pub fn new(ctx: &'c SearchContext<'a, D>) -> Self {
        let comparator = McArrivalComparator { calc: ctx.calc, c2: ctx.c2.clone() };
        let stops = (0..ctx.transit.num_stops())
            .map(|idx| {
                let stop = StopId(idx as u32);
                ParetoSet::with_listener(comparator.clone(), StopDebugListener::new(stop, ctx.is_debug_stop(stop)))
            })
            .collect();
        Self { base: SearchState::new(ctx), stops }
    }

    /// Arrivals at `stop` of the given round
    fn arrivals_in_round(&self, stop: StopId, round: usize) -> Vec<McArrival> {
        self.stops[stop.index()].iter().filter(|a| a.round == round).copied().collect()
    }

    fn board(&self, route: &Route, pos: usize, prev: &McArrival) -> Option<McRide> {
        let ctx = self.base.ctx;
        let calc = &ctx.calc;
        let arrival = &self.base.arena[prev.id];
        let first_boarding = arrival.is_street_access();
        let earliest_board_time = calc.earliest_board_time(arrival.time, first_boarding);
        // later trips only add waiting, so the earliest one is enough
        let trip_index = calc.search_trip(route, pos, earliest_board_time, None)?;

        let board_time = calc.board_time(&route.trips[trip_index], pos);
        let wait_time = calc.duration(arrival.time, board_time);
        let board_c1 = ctx.cost.boarding_cost(first_boarding, arrival.c1, wait_time, ctx.transit.stop_cost(route.pattern.stop(pos)));
        Some(McRide {
            prev: prev.id,
            trip_index,
            board_pos: pos,
            board_time,
            relative_c1: ctx.cost.relative_c1(board_c1, calc.dir_time(board_time)),
            c2: arrival.c2,
        })
    }

    fn alight(&mut self, route: &Route, pos: usize, ride: &McRide) {
        let ctx = self.base.ctx;
        let trip = &route.trips[ride.trip_index];
        let alight_time = ctx.calc.alight_time(trip, pos);
        let stop = route.pattern.stop(pos);
        let segment = RideSegment { pattern: &route.pattern, trip, board_pos: ride.board_pos, alight_pos: pos };
        self.accept(StopArrival {
            stop,
            time: ctx.calc.stop_arrival_time(alight_time),
            round: self.base.round,
            c1: ctx.cost.alighting_cost(ride.relative_c1, ctx.calc.dir_time(alight_time), ctx.transit.stop_cost(stop)),
            c2: ctx.c2_alight(ride.c2, &segment),
            kind: ArrivalKind::Transit {
                route: route.id,
                trip_index: ride.trip_index,
                board_pos: ride.board_pos,
                alight_pos: pos,
                board_time: ride.board_time,
                alight_time,
            },
            predecessor: Some(ride.prev),
        });
    }
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> RoutingStrategy<'c, 'a, D> for MultiCriteriaRouting<'c, 'a, D> {
    fn base(&self) -> &SearchState<'c, 'a, D> {
        &self.base
    }

    fn setup_iteration(&mut self, max_round: usize) {
        self.base.setup_iteration(max_round);
        self.stops.iter_mut().for_each(ParetoSet::clear);
    }

    fn accept(&mut self, arrival: StopArrival) {
        if self.base.is_pruned(&arrival) || self.base.is_covered(&arrival) {
            return;
        }
        let id = self.base.arena.push(arrival);
        if self.stops[arrival.stop.index()].add(McArrival::new(id, &arrival)) {
            self.base.accepted(id, true);
        } else {
            self.base.arena.discard(id);
        }
    }

    fn prepare_round(&mut self, round: usize, max_round: usize) {
        self.base.prepare_round(round, max_round);
    }

    fn route_pass(&mut self, route: &Route) {
        let ctx = self.base.ctx;
        let calc = ctx.calc;
        let prev_round = self.base.round - 1;
        let mut rides: ParetoSet<McRide, _> = ParetoSet::new(|left: &McRide, right: &McRide| {
            left.trip_index != right.trip_index
                || left.relative_c1 < right.relative_c1
                || ctx.c2_dominates(left.c2, right.c2)
        });

        for pos in calc.pattern_positions(route.pattern.len()) {
            if !rides.is_empty() && calc.alighting_possible_at(&route.pattern, pos) {
                for ride in rides.iter() {
                    self.alight(route, pos, ride);
                }
            }

            let stop = route.pattern.stop(pos);
            if !calc.boarding_possible_at(&route.pattern, pos) || !self.base.touched_last_round.contains(stop) {
                continue;
            }
            for prev in self.arrivals_in_round(stop, prev_round) {
                if let Some(ride) = self.board(route, pos, &prev) {
                    rides.add(ride);
                }
            }
        }
    }

    fn transfers_pass(&mut self) {
        let ctx = self.base.ctx;
        let round = self.base.round;
        for stop in self.base.touched_on_board.take() {
            for from in self.arrivals_in_round(stop, round).into_iter().filter(|a| a.on_board) {
                for transfer in ctx.calc.transfers(ctx.transit, stop) {
                    let target = ctx.calc.transfer_target(transfer);
                    self.accept(StopArrival {
                        stop: target,
                        time: ctx.calc.plus(from.time, transfer.duration),
                        round,
                        c1: from.c1 + transfer.c1,
                        c2: ctx.c2_transfer(from.c2, target),
                        kind: ArrivalKind::Transfer { from: stop, duration: transfer.duration, c1: transfer.c1 },
                        predecessor: Some(from.id),
                    });
                }
            }
        }
    }

    fn into_result(self) -> (Vec<Path>, StopArrivals) {
        (self.base.destination.into_paths(), self.base.stop_arrivals)
    }
}
