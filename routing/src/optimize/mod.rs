//! Moves transfers of accepted paths to where they cost the least waiting. Trips, boarding of
//! the first trip and everything after the last trip stay as found by the search; only the
//! stops where one trip is changed for the next are chosen again.

pub mod filter;
pub mod tail;
pub mod transfer_generator;

use common::types::{Cost, StopId};
use itertools::Itertools;
use log::{debug, trace};

use crate::algorithms::queries::range::SearchDirection;
use crate::optimize::filter::{CostExtractor, MinCostPathTailFilter};
use crate::optimize::tail::PathTail;
use crate::optimize::transfer_generator::{TransferGenerator, TripRef};
use crate::path::{Path, PathLeg};
use crate::raptor::c2::PassThroughC2;
use crate::raptor::config::{RaptorConfig, SlackConfig, TransferOptimizationConfig, TransferTiming};
use crate::raptor::cost::{CostCalculator, COST_SCALE};
use crate::transit::TransitDataProvider;

pub struct TransferOptimizer<'a, D: ?Sized> {
    transit: &'a D,
    generator: TransferGenerator<'a, D>,
    slack: SlackConfig,
    cost: CostCalculator,
    /// points in reverse travel order, for matching tails built from the end
    pass_through: Option<PassThroughC2>,
    filter: MinCostPathTailFilter<PathTail>,
}

impl<'a, D: TransitDataProvider + ?Sized> TransferOptimizer<'a, D> {
    pub fn new(transit: &'a D, config: &RaptorConfig, pass_through_points: &[StopId]) -> Self {
        let pass_through = (!pass_through_points.is_empty())
            .then(|| PassThroughC2::new(pass_through_points.to_vec(), SearchDirection::Reverse));
        let filter = MinCostPathTailFilter::new(extractors(&config.transfer_optimization, pass_through.clone()));
        Self {
            transit,
            generator: TransferGenerator::new(transit, config.slack),
            slack: config.slack,
            cost: CostCalculator::new(&config.cost),
            pass_through,
            filter,
        }
    }

    /// Optimizes every path. Paths that become equal are only kept once.
    pub fn optimize(&self, paths: Vec<Path>) -> Vec<Path> {
        let before = paths.len();
        let optimized = paths.into_iter().map(|path| self.optimize_path(path)).unique().collect_vec();
        debug!(target: "optimize", "Optimized transfers of {} paths, {} left", before, optimized.len());
        optimized
    }

    pub fn optimize_path(&self, path: Path) -> Path {
        let Some(candidate) = self.best_candidate(&path) else {
            return path;
        };
        if candidate.c1 > path.c1 || candidate.end_time > path.end_time || candidate.transfers > path.transfers {
            trace!(target: "optimize", "Keeping {}, optimized path {} is worse", path, candidate);
            return path;
        }
        if candidate.legs != path.legs {
            trace!(target: "optimize", "Replacing {} by {}", path, candidate);
        }
        candidate
    }

    fn trip_ref(&self, leg: &PathLeg) -> Option<(TripRef, usize, usize)> {
        let PathLeg::Transit { route, trip, board_pos, alight_pos, .. } = *leg else {
            return None;
        };
        let trip_index = self.transit.routes().get(route.index())?.trips.iter().position(|t| t.id == trip)?;
        Some((TripRef { route, trip_index }, board_pos, alight_pos))
    }

    fn best_candidate(&self, path: &Path) -> Option<Path> {
        let transit_idx = path.legs.iter().positions(PathLeg::is_transit).collect_vec();
        if transit_idx.len() < 2 {
            return None;
        }
        let trips: Vec<(TripRef, usize, usize)> = transit_idx.iter()
            .map(|&idx| self.trip_ref(&path.legs[idx]))
            .collect::<Option<_>>()?;
        let (first, first_board, _) = trips[0];
        let (last, _, last_alight) = trips[trips.len() - 1];

        // tails are built from the last trip back to the first one
        let mut tails = vec![PathTail::new(last, last_alight)];
        for (i, &(prev, _, _)) in trips.iter().enumerate().rev().skip(1) {
            let prev_after = if i == 0 { first_board } else { 0 };
            let extended = tails.iter()
                .flat_map(|tail| {
                    self.generator.generate(prev, prev_after, tail.head, tail.head_alight_pos)
                        .into_iter()
                        .map(move |transfer| (tail, transfer))
                })
                .map(|(tail, transfer)| tail.extend(prev, &transfer, &self.generator, &self.cost, &self.slack, self.transit))
                .collect_vec();
            // tails leaving the new head trip at the same stop are interchangeable for the trips before
            tails = extended.into_iter()
                .into_group_map_by(|tail| tail.head_alight_pos)
                .into_values()
                .flat_map(|group| self.filter.filter(group))
                .collect();
        }

        let prefix = &path.legs[..transit_idx[0]];
        let complete = tails.into_iter()
            .filter(|tail| tail.head == first)
            .filter(|tail| self.passes_all_points(path, tail, first_board))
            .map(|mut tail| {
                tail.c1 += self.first_leg(prefix, first_board, &tail).c1();
                tail
            })
            .collect_vec();
        let best = self.filter.filter(complete).into_iter()
            .min_by_key(|tail| tail.head_alight_pos)?;
        Some(self.build_path(path, &transit_idx, first_board, best))
    }

    /// The first trip, boarded where the search boarded it and left where `tail` starts
    fn first_leg(&self, prefix: &[PathLeg], first_board: usize, tail: &PathTail) -> PathLeg {
        let route = self.generator.route(tail.head);
        let trip = self.generator.schedule(tail.head);
        let (board_stop, alight_stop) = (route.pattern.stop(first_board), route.pattern.stop(tail.head_alight_pos));
        let start_time = trip.departure(first_board);
        let end_time = trip.arrival(tail.head_alight_pos);
        let ready = prefix.last().map_or(start_time, PathLeg::end_time);
        let first_boarding = !matches!(prefix.first(), Some(PathLeg::Access { rides, .. }) if *rides > 0);
        PathLeg::Transit {
            route: tail.head.route,
            trip: trip.id,
            from: board_stop,
            to: alight_stop,
            board_pos: first_board,
            alight_pos: tail.head_alight_pos,
            start_time,
            end_time,
            c1: self.cost.transit_leg_cost(
                first_boarding,
                (start_time - ready).max(0),
                end_time - start_time,
                self.transit.stop_cost(board_stop),
                self.transit.stop_cost(alight_stop),
            ),
        }
    }

    fn passes_all_points(&self, path: &Path, tail: &PathTail, first_board: usize) -> bool {
        let Some(points) = &self.pass_through else {
            return true;
        };
        let route = self.generator.route(tail.head);
        let first_ride = (first_board + 1..=tail.head_alight_pos).rev().map(|pos| route.pattern.stop(pos));
        let before_first_ride = path.legs.iter()
            .take_while(|leg| !leg.is_transit())
            .filter_map(PathLeg::to_stop)
            .collect_vec();
        let stops = tail.stops_reversed().chain(first_ride).chain(before_first_ride.into_iter().rev());
        points.count_passed(stops) == points.num_points()
    }

    fn build_path(&self, path: &Path, transit_idx: &[usize], first_board: usize, tail: PathTail) -> Path {
        let first_idx = transit_idx[0];
        let last_idx = transit_idx[transit_idx.len() - 1];
        let prefix = &path.legs[..first_idx];
        let suffix = &path.legs[last_idx + 1..];

        let first_leg = self.first_leg(prefix, first_board, &tail);
        let legs = prefix.iter().cloned()
            .chain(std::iter::once(first_leg))
            .chain(tail.into_legs())
            .chain(suffix.iter().cloned())
            .collect_vec();
        // waiting before the egress is not part of any leg
        let egress_wait: Cost = path.c1 - path.legs.iter().map(PathLeg::c1).sum::<Cost>();
        let c1 = legs.iter().map(PathLeg::c1).sum::<Cost>() + egress_wait;
        Path::new(legs, c1, path.c2)
    }
}

fn extractors(config: &TransferOptimizationConfig, pass_through: Option<PassThroughC2>) -> Vec<CostExtractor<PathTail>> {
    let mut extractors: Vec<CostExtractor<PathTail>> = Vec::new();
    if let Some(points) = pass_through {
        extractors.push(Box::new(move |tail: &PathTail| -i64::from(points.count_passed(tail.stops_reversed()))));
    }
    let reluctance = config.wait_reluctance;
    extractors.push(Box::new(move |tail: &PathTail| {
        i64::from(tail.c1) + (reluctance * f64::from(COST_SCALE) * f64::from(tail.wait_time)).round() as i64
    }));
    let timing = config.transfer_timing;
    extractors.push(Box::new(move |tail: &PathTail| match timing {
        TransferTiming::Late => -tail.alight_times,
        TransferTiming::Early => tail.alight_times,
    }));
    extractors
}
