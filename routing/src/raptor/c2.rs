use std::fmt::Debug;

use common::types::StopId;
use itertools::Either;

use crate::algorithms::queries::range::SearchDirection;
use crate::transit::{Pattern, TripSchedule};

/// The part of a trip ridden between boarding and alighting, in search direction
#[derive(Debug, Clone, Copy)]
pub struct RideSegment<'a> {
    pub pattern: &'a Pattern,
    pub trip: &'a TripSchedule,
    pub board_pos: usize,
    pub alight_pos: usize,
}

impl RideSegment<'_> {
    /// Stops passed after boarding, up to and including the alight stop, in search direction
    pub fn stops_passed(&self) -> impl Iterator<Item = StopId> + '_ {
        let positions = if self.board_pos <= self.alight_pos {
            Either::Left(self.board_pos + 1..=self.alight_pos)
        } else {
            Either::Right((self.alight_pos..self.board_pos).rev())
        };
        positions.map(|pos| self.pattern.stop(pos))
    }
}

/// Second, caller defined criterion of the multi-criteria search. The value travels with every
/// stop arrival and pattern ride; the calculator updates it along the way and decides dominance.
pub trait C2Calculator: Debug + Send + Sync {
    /// `true` if `left` is better than `right`
    fn dominates(&self, left: i32, right: i32) -> bool;

    /// Initial value when reaching `stop` by an access leg
    fn access(&self, stop: StopId) -> i32;

    fn alight(&self, c2: i32, ride: &RideSegment) -> i32;

    fn transfer(&self, c2: i32, _to: StopId) -> i32 {
        c2
    }

    /// Paths whose c2 is not accepted here are dropped at the destination
    fn accept_at_destination(&self, _c2: i32) -> bool {
        true
    }
}

/// Sum of the fares of all trips ridden. Lower is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripFareC2;

impl C2Calculator for TripFareC2 {
    fn dominates(&self, left: i32, right: i32) -> bool {
        left < right
    }

    fn access(&self, _stop: StopId) -> i32 {
        0
    }

    fn alight(&self, c2: i32, ride: &RideSegment) -> i32 {
        c2 + ride.trip.fare
    }
}

/// Ordered stops a path has to pass through, either by visiting them or by staying on board.
/// The c2 value is the number of points passed so far; more is better.
#[derive(Debug, Clone)]
pub struct PassThroughC2 {
    /// in search direction
    points: Vec<StopId>,
}

impl PassThroughC2 {
    /// `points` in travel order
    pub fn new(mut points: Vec<StopId>, direction: SearchDirection) -> Self {
        if direction == SearchDirection::Reverse {
            points.reverse();
        }
        Self { points }
    }

    fn visit(&self, c2: i32, stop: StopId) -> i32 {
        match self.points.get(c2 as usize) {
            Some(next) if *next == stop => c2 + 1,
            _ => c2,
        }
    }

    /// Number of points passed in order by a sequence of stops
    pub fn count_passed(&self, stops: impl IntoIterator<Item = StopId>) -> i32 {
        stops.into_iter().fold(0, |c2, stop| self.visit(c2, stop))
    }

    pub fn num_points(&self) -> i32 {
        self.points.len() as i32
    }
}

impl C2Calculator for PassThroughC2 {
    fn dominates(&self, left: i32, right: i32) -> bool {
        left > right
    }

    fn access(&self, stop: StopId) -> i32 {
        self.visit(0, stop)
    }

    fn alight(&self, c2: i32, ride: &RideSegment) -> i32 {
        ride.stops_passed().fold(c2, |c2, stop| self.visit(c2, stop))
    }

    fn transfer(&self, c2: i32, to: StopId) -> i32 {
        self.visit(c2, to)
    }

    fn accept_at_destination(&self, c2: i32) -> bool {
        c2 == self.num_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::TripId;

    fn pattern() -> Pattern {
        Pattern::new((0..5).map(StopId).collect())
    }

    fn trip(fare: i32) -> TripSchedule {
        TripSchedule { id: TripId(0), arrivals: vec![0; 5], departures: vec![0; 5], fare }
    }

    #[test]
    fn test_stops_passed() {
        let (p, t) = (pattern(), trip(0));
        let forward = RideSegment { pattern: &p, trip: &t, board_pos: 1, alight_pos: 3 };
        assert_eq!(forward.stops_passed().collect::<Vec<_>>(), vec![StopId(2), StopId(3)]);
        let reverse = RideSegment { pattern: &p, trip: &t, board_pos: 3, alight_pos: 0 };
        assert_eq!(reverse.stops_passed().collect::<Vec<_>>(), vec![StopId(2), StopId(1), StopId(0)]);
    }

    #[test]
    fn test_trip_fare() {
        let (p, t) = (pattern(), trip(250));
        let ride = RideSegment { pattern: &p, trip: &t, board_pos: 0, alight_pos: 4 };
        let c2 = TripFareC2.alight(TripFareC2.access(StopId(0)), &ride);
        assert_eq!(c2, 250);
        assert!(TripFareC2.dominates(100, 250));
        assert!(!TripFareC2.dominates(250, 250));
        assert!(TripFareC2.accept_at_destination(c2));
    }

    #[test]
    fn test_pass_through_in_order() {
        let (p, t) = (pattern(), trip(0));
        let c2 = PassThroughC2::new(vec![StopId(2), StopId(7)], SearchDirection::Forward);

        let start = c2.access(StopId(0));
        assert_eq!(start, 0);
        let after_ride = c2.alight(start, &RideSegment { pattern: &p, trip: &t, board_pos: 0, alight_pos: 4 });
        assert_eq!(after_ride, 1);
        assert!(!c2.accept_at_destination(after_ride));
        let after_walk = c2.transfer(after_ride, StopId(7));
        assert_eq!(after_walk, 2);
        assert!(c2.accept_at_destination(after_walk));
        assert!(c2.dominates(2, 1));

        // order matters
        assert_eq!(c2.count_passed([StopId(7), StopId(2)]), 1);
        assert_eq!(c2.count_passed([StopId(2), StopId(3), StopId(7)]), 2);
    }

    #[test]
    fn test_pass_through_reverse() {
        let (p, t) = (pattern(), trip(0));
        let c2 = PassThroughC2::new(vec![StopId(1), StopId(3)], SearchDirection::Reverse);
        // searching backwards we meet the last point first
        let start = c2.access(StopId(4));
        let ride = RideSegment { pattern: &p, trip: &t, board_pos: 4, alight_pos: 0 };
        assert_eq!(c2.alight(start, &ride), 2);
    }
}
