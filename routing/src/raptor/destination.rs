use std::sync::Arc;

use common::types::Time;
use common::util::time::format_time;
use log::{debug, trace};

use crate::algorithms::queries::range::{Profile, SearchDirection};
use crate::paretoset::{ParetoComparator, ParetoSet};
use crate::path::Path;
use crate::raptor::c2::C2Calculator;
use crate::raptor::context::SearchContext;
use crate::raptor::path_mapper::map_path;
use crate::raptor::state::arrival::{ArrivalArena, ArrivalId, ArrivalKind, StopArrival};
use crate::transit::TransitDataProvider;

/// Dominance between complete paths
#[derive(Debug, Clone)]
pub(crate) struct PathComparator {
    profile: Profile,
    direction: SearchDirection,
    c2: Option<Arc<dyn C2Calculator>>,
}

impl PathComparator {
    pub fn new(profile: Profile, direction: SearchDirection, c2: Option<Arc<dyn C2Calculator>>) -> Self {
        Self { profile, direction, c2 }
    }

    fn c2_dominates(&self, left: &Path, right: &Path) -> bool {
        match (&self.c2, left.c2, right.c2) {
            (Some(calc), Some(l), Some(r)) => calc.dominates(l, r),
            _ => false,
        }
    }
}

impl ParetoComparator<Path> for PathComparator {
    fn left_dominance_exist(&self, left: &Path, right: &Path) -> bool {
        match self.profile {
            Profile::Standard => {
                left.start_time > right.start_time
                    || left.end_time < right.end_time
                    || left.transfers < right.transfers
            }
            Profile::MultiCriteria => {
                let time = match self.direction {
                    SearchDirection::Forward => left.end_time < right.end_time,
                    SearchDirection::Reverse => left.start_time > right.start_time,
                };
                time
                    || left.transfers < right.transfers
                    || left.duration() < right.duration()
                    || left.c1 < right.c1
                    || self.c2_dominates(left, right)
            }
        }
    }
}

/// Paths found so far. Lives for the whole search, while stop arrivals only live for one
/// iteration, so every destination arrival is turned into a path right away.
pub(crate) struct DestinationArrivals<'c, 'a, D: ?Sized> {
    ctx: &'c SearchContext<'a, D>,
    paths: ParetoSet<Path, PathComparator>,
    reached_current_round: bool,
    /// best time the destination was reached at in this iteration, in search direction
    best_time: Time,
}

impl<'c, 'a, D: TransitDataProvider + ?Sized> DestinationArrivals<'c, 'a, D> {
    pub fn new(ctx: &'c SearchContext<'a, D>) -> Self {
        let comparator = PathComparator::new(ctx.request.profile, ctx.calc.direction(), ctx.c2.clone());
        Self {
            ctx,
            paths: ParetoSet::new(comparator),
            reached_current_round: false,
            best_time: ctx.calc.unreached(),
        }
    }

    pub fn setup_iteration(&mut self) {
        self.best_time = self.ctx.calc.unreached();
    }

    pub fn new_round(&mut self) {
        self.reached_current_round = false;
    }

    pub fn reached_current_round(&self) -> bool {
        self.reached_current_round
    }

    pub fn best_time(&self) -> Time {
        self.best_time
    }

    /// Tries to reach the destination from `id` with every ending leg at its stop
    pub fn arrive(&mut self, arena: &ArrivalArena, id: ArrivalId) {
        let arrival = &arena[id];
        let calc = &self.ctx.calc;
        let Some(departure_time) = arena.departure_time(id) else {
            return;
        };
        for &leg_index in self.ctx.ending_legs_at(arrival.stop) {
            let leg = &self.ctx.ending_legs()[leg_index];
            // walking twice in a row is not a path
            if !arrival.arrived_on_board() && !leg.has_rides() {
                continue;
            }
            let Some(leg_start) = calc.leg_start_time(leg, arrival.time) else {
                continue;
            };
            if let Some(c2) = &self.ctx.c2 {
                if !c2.accept_at_destination(arrival.c2) {
                    continue;
                }
            }
            let Some(path) = map_path(self.ctx, arena, id, leg_index) else {
                continue;
            };
            if !self.within_limits(&path, departure_time) {
                trace!(target: "raptor::worker", "Path outside the search limits: {}", path);
                continue;
            }

            self.reached_current_round = true;
            let time = calc.plus(leg_start, leg.duration);
            if calc.is_better(time, self.best_time) {
                self.best_time = time;
            }

            if self.paths.add(path) {
                debug!(target: "raptor::worker", "New path in round {}, {} in total", arrival.round, self.paths.len());
            }
        }
    }

    /// The window limits the time the search started the path at. Moving the first leg towards
    /// the first boarding may start the path itself after the window. The time limit of the
    /// request applies to the path.
    fn within_limits(&self, path: &Path, departure_time: Time) -> bool {
        let request = self.ctx.request;
        let window = self.ctx.window;
        match self.ctx.calc.direction() {
            SearchDirection::Forward => {
                departure_time <= window.to && request.latest_arrival.is_none_or(|lat| path.end_time <= lat)
            }
            SearchDirection::Reverse => {
                departure_time >= window.from && request.earliest_departure.is_none_or(|edt| path.start_time >= edt)
            }
        }
    }

    /// `true` if a path found so far is at least as good as every path `arrival` can still lead
    /// to, bounding what is left with the heuristics. Only searching forward without c2, where
    /// the c1 of an arrival is the c1 of its path up to the stop.
    pub fn covers(&self, arena: &ArrivalArena, arrival: &StopArrival) -> bool {
        let ctx = self.ctx;
        if !ctx.calc.is_forward() || ctx.c2.is_some() || self.paths.is_empty() {
            return false;
        }
        let heuristics = &ctx.heuristics;
        let (Some(min_time), Some(min_rides), Some(min_c1)) = (
            heuristics.min_time(arrival.stop),
            heuristics.min_rides(arrival.stop),
            heuristics.min_c1(arrival.stop),
        ) else {
            return false;
        };

        let chain = std::iter::once(arrival).chain(arrival.predecessor.into_iter().flat_map(|p| arena.chain(p)));
        let (mut first_board_time, mut access) = (None, None);
        for prev in chain {
            match prev.kind {
                ArrivalKind::Transit { board_time, .. } => first_board_time = Some(board_time),
                // waiting after a flex ride costs less once the ride is moved, so no bound then
                ArrivalKind::Access { departure_time, rides: 0, .. } => access = Some(prev.time - departure_time),
                ArrivalKind::Access { .. } => return false,
                ArrivalKind::Transfer { .. } => {}
            }
        }
        let (Some(first_board_time), Some(access_duration)) = (first_board_time, access) else {
            return false;
        };

        // the first leg is moved towards the first boarding, so the path starts no later than this
        let latest_start = first_board_time - ctx.slack.board_slack - access_duration;
        let earliest_end = arrival.time + min_time;
        let min_duration = earliest_end - latest_start;
        let min_transfers = (arrival.round + min_rides).saturating_sub(1);
        let min_path_c1 = arrival.c1 + min_c1;
        self.paths.iter().any(|path| {
            path.end_time <= earliest_end
                && path.transfers <= min_transfers
                && path.duration() <= min_duration
                && path.c1 <= min_path_c1
        })
    }

    pub fn into_paths(self) -> Vec<Path> {
        debug!(
            target: "raptor",
            "{} paths, best arrival of the last iteration {}",
            self.paths.len(), format_time(self.best_time)
        );
        self.paths.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::tests::simple_path;
    use crate::raptor::c2::TripFareC2;

    fn with(path: Path, start: Time, end: Time, transfers: usize, c1: i32, c2: Option<i32>) -> Path {
        Path { start_time: start, end_time: end, transfers, c1, c2, ..path }
    }

    #[test]
    fn test_standard_comparator() {
        let cmp = PathComparator::new(Profile::Standard, SearchDirection::Forward, None);
        let base = simple_path(1, 36_000);
        let a = with(base.clone(), 100, 1000, 1, 0, None);
        let later_start = with(base.clone(), 200, 1000, 1, 0, None);
        let cheaper = with(base, 100, 1000, 1, -5, None);
        assert!(cmp.left_dominance_exist(&later_start, &a));
        assert!(!cmp.left_dominance_exist(&a, &later_start));
        // c1 is not a criterion of the standard profile
        assert!(!cmp.left_dominance_exist(&cheaper, &a));
    }

    #[test]
    fn test_multi_criteria_comparator_with_c2() {
        let cmp = PathComparator::new(Profile::MultiCriteria, SearchDirection::Forward, Some(Arc::new(TripFareC2)));
        let base = simple_path(1, 36_000);
        let fast = with(base.clone(), 100, 1000, 0, 500, Some(300));
        let cheap = with(base.clone(), 100, 1200, 0, 700, Some(100));
        assert!(cmp.left_dominance_exist(&fast, &cheap));
        assert!(cmp.left_dominance_exist(&cheap, &fast));

        let mut set = ParetoSet::new(cmp);
        assert!(set.add(fast.clone()));
        assert!(set.add(cheap));
        assert!(!set.add(with(base, 100, 1000, 0, 600, Some(300))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_reverse_multi_criteria_prefers_later_departure() {
        let cmp = PathComparator::new(Profile::MultiCriteria, SearchDirection::Reverse, None);
        let base = simple_path(1, 36_000);
        let late = with(base.clone(), 200, 1000, 0, 500, None);
        let early = with(base, 100, 900, 0, 500, None);
        assert!(cmp.left_dominance_exist(&late, &early));
        assert!(!cmp.left_dominance_exist(&early, &late));
    }
}
