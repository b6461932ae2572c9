use std::iter::Rev;
use std::ops::Range;

use common::types::{StopId, Time};
use common::util::time::{UNREACHED_FORWARD, UNREACHED_REVERSE};
use itertools::Either;

use crate::algorithms::queries::range::{SearchDirection, SearchWindow};
use crate::raptor::config::SlackConfig;
use crate::transfers::{Transfer, TransferProvider};
use crate::transit::access_egress::AccessEgress;
use crate::transit::{Pattern, Route, TripSchedule};

/// Everything that differs between searching forward and backward in time. The search itself
/// only talks about "boarding", "alighting", "better" and "later"; this maps those words onto
/// the physical timetable.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransitCalculator {
    direction: SearchDirection,
    slack: SlackConfig,
}

impl TransitCalculator {
    pub fn new(direction: SearchDirection, slack: SlackConfig) -> Self {
        Self { direction, slack }
    }

    #[inline]
    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    #[inline]
    pub fn is_forward(&self) -> bool {
        self.direction == SearchDirection::Forward
    }

    #[inline]
    pub fn is_better(&self, subject: Time, candidate: Time) -> bool {
        if self.is_forward() { subject < candidate } else { subject > candidate }
    }

    #[inline]
    pub fn is_better_or_equal(&self, subject: Time, candidate: Time) -> bool {
        if self.is_forward() { subject <= candidate } else { subject >= candidate }
    }

    #[inline]
    pub fn plus(&self, time: Time, duration: Time) -> Time {
        if self.is_forward() { time + duration } else { time - duration }
    }

    #[inline]
    pub fn minus(&self, time: Time, duration: Time) -> Time {
        if self.is_forward() { time - duration } else { time + duration }
    }

    /// Time passed when going from `from` to `to` in search direction
    #[inline]
    pub fn duration(&self, from: Time, to: Time) -> Time {
        if self.is_forward() { to - from } else { from - to }
    }

    #[inline]
    pub fn unreached(&self) -> Time {
        if self.is_forward() { UNREACHED_FORWARD } else { UNREACHED_REVERSE }
    }

    /// Time mapped so that it grows in search direction. Used for the relative ride cost.
    #[inline]
    pub fn dir_time(&self, time: Time) -> Time {
        if self.is_forward() { time } else { -time }
    }

    /// Start times of the range raptor iterations, in the order they are run: latest first for
    /// a forward search, earliest first in reverse
    pub fn iteration_times(&self, window: SearchWindow, step: Time) -> Vec<Time> {
        let step = step.max(1);
        let n = ((window.len() + step - 1) / step).max(1);
        match self.direction {
            SearchDirection::Forward => (0..n).rev().map(|i| window.from + i * step).collect(),
            SearchDirection::Reverse => (0..n).rev().map(|i| window.to - i * step).collect(),
        }
    }

    pub fn pattern_positions(&self, pattern_len: usize) -> Either<Range<usize>, Rev<Range<usize>>> {
        if self.is_forward() {
            Either::Left(0..pattern_len)
        } else {
            Either::Right((0..pattern_len).rev())
        }
    }

    #[inline]
    pub fn boarding_possible_at(&self, pattern: &Pattern, pos: usize) -> bool {
        if self.is_forward() { pattern.boarding_allowed(pos) } else { pattern.alighting_allowed(pos) }
    }

    #[inline]
    pub fn alighting_possible_at(&self, pattern: &Pattern, pos: usize) -> bool {
        if self.is_forward() { pattern.alighting_allowed(pos) } else { pattern.boarding_allowed(pos) }
    }

    /// Time the trip is boarded at `pos`, in search direction
    #[inline]
    pub fn board_time(&self, trip: &TripSchedule, pos: usize) -> Time {
        if self.is_forward() { trip.departure(pos) } else { trip.arrival(pos) }
    }

    #[inline]
    pub fn alight_time(&self, trip: &TripSchedule, pos: usize) -> Time {
        if self.is_forward() { trip.arrival(pos) } else { trip.departure(pos) }
    }

    /// Slack between arriving at a stop and boarding, in search direction. Transfer slack is
    /// added once per transfer, that is for every boarding that does not follow the access.
    #[inline]
    pub fn board_slack(&self, first_boarding: bool) -> Time {
        let transfer = if first_boarding { 0 } else { self.slack.transfer_slack };
        transfer + if self.is_forward() { self.slack.board_slack } else { self.slack.alight_slack }
    }

    #[inline]
    pub fn alight_slack(&self) -> Time {
        if self.is_forward() { self.slack.alight_slack } else { self.slack.board_slack }
    }

    pub fn earliest_board_time(&self, arrival_time: Time, first_boarding: bool) -> Time {
        self.plus(arrival_time, self.board_slack(first_boarding))
    }

    pub fn stop_arrival_time(&self, alight_time: Time) -> Time {
        self.plus(alight_time, self.alight_slack())
    }

    /// Best trip boardable at `pos` no earlier than `earliest_board_time` (in search direction)
    /// that improves on the currently boarded trip, if any
    pub fn search_trip(&self, route: &Route, pos: usize, earliest_board_time: Time, current: Option<usize>) -> Option<usize> {
        if self.is_forward() {
            route.search_board(pos, earliest_board_time, current.unwrap_or(route.trips.len()))
        } else {
            route.search_alight(pos, earliest_board_time, current)
        }
    }

    /// `true` if `trip` can be boarded at `pos` when ready at `earliest_board_time`
    #[inline]
    pub fn can_board(&self, trip: &TripSchedule, pos: usize, earliest_board_time: Time) -> bool {
        self.is_better_or_equal(earliest_board_time, self.board_time(trip, pos))
    }

    pub fn transfers<'a, P: TransferProvider + ?Sized>(&self, provider: &'a P, stop: StopId) -> &'a [Transfer] {
        if self.is_forward() { provider.transfers_from(stop) } else { provider.transfers_to(stop) }
    }

    /// The stop a transfer leads to in search direction
    #[inline]
    pub fn transfer_target(&self, transfer: &Transfer) -> StopId {
        if self.is_forward() { transfer.to } else { transfer.from }
    }

    /// When a street leg started (search direction) at `requested` can be traversed, respecting
    /// its opening hours
    pub fn leg_start_time(&self, leg: &AccessEgress, requested: Time) -> Option<Time> {
        if self.is_forward() {
            leg.earliest_departure_time(requested)
        } else {
            leg.latest_arrival_time(requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{RouteId, TripId};

    fn forward() -> TransitCalculator {
        TransitCalculator::new(SearchDirection::Forward, SlackConfig { board_slack: 60, alight_slack: 30, transfer_slack: 120 })
    }

    fn reverse() -> TransitCalculator {
        TransitCalculator::new(SearchDirection::Reverse, SlackConfig { board_slack: 60, alight_slack: 30, transfer_slack: 120 })
    }

    #[test]
    fn test_time_arithmetic() {
        let (f, r) = (forward(), reverse());
        assert!(f.is_better(10, 20) && !f.is_better(20, 20) && f.is_better_or_equal(20, 20));
        assert!(r.is_better(20, 10) && !r.is_better(10, 20));
        assert_eq!(f.plus(100, 10), 110);
        assert_eq!(r.plus(100, 10), 90);
        assert_eq!(r.minus(100, 10), 110);
        assert_eq!(f.duration(100, 160), 60);
        assert_eq!(r.duration(160, 100), 60);
        assert!(f.is_better(1_000_000, f.unreached()));
        assert!(r.is_better(-1_000_000, r.unreached()));
    }

    #[test]
    fn test_slack() {
        let (f, r) = (forward(), reverse());
        assert_eq!(f.earliest_board_time(1000, true), 1060);
        assert_eq!(f.earliest_board_time(1000, false), 1180);
        assert_eq!(f.stop_arrival_time(1000), 1030);
        // reverse boarding is a physical alighting
        assert_eq!(r.earliest_board_time(1000, true), 970);
        assert_eq!(r.earliest_board_time(1000, false), 850);
        assert_eq!(r.stop_arrival_time(1000), 940);
    }

    #[test]
    fn test_iteration_times() {
        let window = SearchWindow { from: 0, to: 180 };
        assert_eq!(forward().iteration_times(window, 60), vec![120, 60, 0]);
        assert_eq!(reverse().iteration_times(window, 60), vec![60, 120, 180]);
        let single = SearchWindow { from: 500, to: 500 };
        assert_eq!(forward().iteration_times(single, 60), vec![500]);
        assert_eq!(reverse().iteration_times(single, 60), vec![500]);
    }

    #[test]
    fn test_pattern_positions() {
        assert_eq!(forward().pattern_positions(3).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(reverse().pattern_positions(3).collect::<Vec<_>>(), vec![2, 1, 0]);
    }

    #[test]
    fn test_search_trip_both_directions() {
        let trip = |id, t: Time| TripSchedule {
            id: TripId(id), arrivals: vec![t, t + 600], departures: vec![t, t + 600], fare: 0,
        };
        let route = Route {
            id: RouteId(0),
            name: "L".into(),
            mode: "BUS".into(),
            pattern: Pattern::new(vec![StopId(0), StopId(1)]),
            trips: vec![trip(0, 1000), trip(1, 2000)],
        };
        assert_eq!(forward().search_trip(&route, 0, 1500, None), Some(1));
        assert_eq!(forward().search_trip(&route, 0, 500, Some(1)), Some(0));
        // arrive at stop 1 by 2500: latest trip arriving before is trip 0 (1600)
        assert_eq!(reverse().search_trip(&route, 1, 2500, None), Some(0));
        assert_eq!(reverse().search_trip(&route, 1, 2600, Some(0)), Some(1));
        assert!(reverse().can_board(&route.trips[1], 1, 2600));
        assert!(!forward().can_board(&route.trips[0], 0, 1001));
    }
}
