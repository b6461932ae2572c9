//! Standard range raptor: one arrival per stop, best time first and fewest rides second. c1 is
//! carried along only to break ties between arrivals at the same time.

use common::types::{Cost, StopId, Time};

use crate::algorithms::queries::range::StopArrivals;
use crate::path::Path;
use crate::raptor::c2::RideSegment;
use crate::raptor::context::SearchContext;
use crate::raptor::state::arrival::{ArrivalId, ArrivalKind, StopArrival};
use crate::raptor::state::{RoutingStrategy, SearchState};
use crate::transit::{Route, TransitDataProvider};

/// The trip currently ridden while scanning a route
#[derive(Debug, Clone, Copy)]
struct Boarding {
    prev: ArrivalId,
    trip_index: usize,
    board_pos: usize,
    board_time: Time,
    relative_c1: Cost,
    c2: i32,
}

pub(crate) struct StandardRouting<'c, 'a, D: ?Sized> {
    base: SearchState<'c, 'a, D>,
    /// best arrival by any means
    best: Vec<Option<ArrivalId>>,
    /// best arrival on board, the only ones transfers start from
    best_on_board: Vec<Option<ArrivalId>>,
    /// best arrival of the previous round, for stops improved in that round
    boardable: Vec<Option<ArrivalId>>,
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> StandardRouting<'c, 'a, D> {
    pub fn new(ctx: &'c SearchContext<'a, D>) -> Self {
        let num_stops = ctx.transit.num_stops();
        Self {
            base: SearchState::new(ctx),
            best: vec![None; num_stops],
            best_on_board: vec![None; num_stops],
            boardable: vec![None; num_stops],
        }
    }

    /// Earlier is better, then fewer rounds, then lower c1
    fn improves(&self, existing: Option<ArrivalId>, arrival: &StopArrival) -> bool {
        let Some(id) = existing else {
            return true;
        };
        let existing = &self.base.arena[id];
        let calc = &self.base.ctx.calc;
        calc.is_better(arrival.time, existing.time)
            || (arrival.time == existing.time
                && (arrival.round < existing.round || (arrival.round == existing.round && arrival.c1 < existing.c1)))
    }

    /// Arrivals that can not beat the best destination arrival of this iteration are dropped
    fn target_pruned(&self, arrival: &StopArrival) -> bool {
        let ctx = self.base.ctx;
        ctx.heuristics.min_time(arrival.stop).is_some_and(|min_time| {
            ctx.calc.is_better(self.base.destination.best_time(), ctx.calc.plus(arrival.time, min_time))
        })
    }

    fn board(&self, route: &Route, pos: usize, prev_id: ArrivalId, current: Option<Boarding>) -> Option<Boarding> {
        let ctx = self.base.ctx;
        let calc = &ctx.calc;
        let prev = &self.base.arena[prev_id];
        let first_boarding = prev.is_street_access();
        let earliest_board_time = calc.earliest_board_time(prev.time, first_boarding);

        let trip_index = match calc.search_trip(route, pos, earliest_board_time, current.map(|b| b.trip_index)) {
            Some(trip_index) => trip_index,
            // no earlier trip, but the current one might be boarded here at a lower cost
            None => {
                let current = current?;
                if !calc.can_board(&route.trips[current.trip_index], pos, earliest_board_time) {
                    return None;
                }
                current.trip_index
            }
        };

        let board_time = calc.board_time(&route.trips[trip_index], pos);
        let wait_time = calc.duration(prev.time, board_time);
        let board_c1 = ctx.cost.boarding_cost(first_boarding, prev.c1, wait_time, ctx.transit.stop_cost(route.pattern.stop(pos)));
        let boarding = Boarding {
            prev: prev_id,
            trip_index,
            board_pos: pos,
            board_time,
            relative_c1: ctx.cost.relative_c1(board_c1, calc.dir_time(board_time)),
            c2: prev.c2,
        };
        match current {
            Some(current) if current.trip_index == trip_index && current.relative_c1 <= boarding.relative_c1 => None,
            _ => Some(boarding),
        }
    }

    fn alight(&mut self, route: &Route, pos: usize, boarding: &Boarding) {
        let ctx = self.base.ctx;
        let trip = &route.trips[boarding.trip_index];
        let alight_time = ctx.calc.alight_time(trip, pos);
        let stop = route.pattern.stop(pos);
        let ride = RideSegment { pattern: &route.pattern, trip, board_pos: boarding.board_pos, alight_pos: pos };
        self.accept(StopArrival {
            stop,
            time: ctx.calc.stop_arrival_time(alight_time),
            round: self.base.round,
            c1: ctx.cost.alighting_cost(boarding.relative_c1, ctx.calc.dir_time(alight_time), ctx.transit.stop_cost(stop)),
            c2: ctx.c2_alight(boarding.c2, &ride),
            kind: ArrivalKind::Transit {
                route: route.id,
                trip_index: boarding.trip_index,
                board_pos: boarding.board_pos,
                alight_pos: pos,
                board_time: boarding.board_time,
                alight_time,
            },
            predecessor: Some(boarding.prev),
        });
    }
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> RoutingStrategy<'c, 'a, D> for StandardRouting<'c, 'a, D> {
    fn base(&self) -> &SearchState<'c, 'a, D> {
        &self.base
    }

    fn setup_iteration(&mut self, max_round: usize) {
        self.base.setup_iteration(max_round);
        self.best.fill(None);
        self.best_on_board.fill(None);
        self.boardable.fill(None);
    }

    fn accept(&mut self, arrival: StopArrival) {
        let idx = arrival.stop.index();
        let on_board = arrival.arrived_on_board() && self.improves(self.best_on_board[idx], &arrival);
        let overall = self.improves(self.best[idx], &arrival);
        if !on_board && !overall {
            return;
        }
        if self.base.is_pruned(&arrival) || self.target_pruned(&arrival) {
            return;
        }

        let id = self.base.arena.push(arrival);
        if on_board {
            self.best_on_board[idx] = Some(id);
        }
        if overall {
            self.best[idx] = Some(id);
        }
        self.base.accepted(id, overall);
    }

    fn prepare_round(&mut self, round: usize, max_round: usize) {
        for stop in self.base.touched_last_round.stops() {
            self.boardable[stop.index()] = None;
        }
        self.base.prepare_round(round, max_round);
        for stop in self.base.touched_last_round.stops() {
            self.boardable[stop.index()] = self.best[stop.index()];
        }
    }

    fn route_pass(&mut self, route: &Route) {
        let calc = self.base.ctx.calc;
        let mut boarded: Option<Boarding> = None;
        for pos in calc.pattern_positions(route.pattern.len()) {
            if let Some(boarding) = boarded {
                if calc.alighting_possible_at(&route.pattern, pos) {
                    self.alight(route, pos, &boarding);
                }
            }

            let stop = route.pattern.stop(pos);
            if !calc.boarding_possible_at(&route.pattern, pos) {
                continue;
            }
            if let Some(prev) = self.boardable[stop.index()] {
                if let Some(boarding) = self.board(route, pos, prev, boarded) {
                    boarded = Some(boarding);
                }
            }
        }
    }

    fn transfers_pass(&mut self) {
        let ctx = self.base.ctx;
        for stop in self.base.touched_on_board.take() {
            let Some(from_id) = self.best_on_board[stop.index()] else {
                continue;
            };
            let from = self.base.arena[from_id];
            for transfer in ctx.calc.transfers(ctx.transit, stop) {
                let target: StopId = ctx.calc.transfer_target(transfer);
                self.accept(StopArrival {
                    stop: target,
                    time: ctx.calc.plus(from.time, transfer.duration),
                    round: from.round,
                    c1: from.c1 + transfer.c1,
                    c2: ctx.c2_transfer(from.c2, target),
                    kind: ArrivalKind::Transfer { from: stop, duration: transfer.duration, c1: transfer.c1 },
                    predecessor: Some(from_id),
                });
            }
        }
    }

    fn into_result(self) -> (Vec<Path>, StopArrivals) {
        (self.base.destination.into_paths(), self.base.stop_arrivals)
    }
}
