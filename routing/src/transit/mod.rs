pub mod access_egress;
pub mod timetable;

use std::borrow::Cow;

use common::types::{Cost, RouteId, StopId, Time, TripId};

use crate::algorithms::errors::PreconditionError;
use crate::transfers::TransferProvider;

/// The ordered stops a set of trips visit, together with boarding and alighting restrictions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub stops: Vec<StopId>,
    pub boarding: Vec<bool>,
    pub alighting: Vec<bool>,
}

impl Pattern {
    pub fn new(stops: Vec<StopId>) -> Self {
        let n = stops.len();
        Self { stops, boarding: vec![true; n], alighting: vec![true; n] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    #[inline]
    pub fn stop(&self, pos: usize) -> StopId {
        self.stops[pos]
    }

    #[inline]
    pub fn boarding_allowed(&self, pos: usize) -> bool {
        self.boarding[pos]
    }

    #[inline]
    pub fn alighting_allowed(&self, pos: usize) -> bool {
        self.alighting[pos]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSchedule {
    pub id: TripId,
    pub arrivals: Vec<Time>,
    pub departures: Vec<Time>,
    /// Opaque per-trip attribute, summed up by the trip fare c2 criterion
    pub fare: i32,
}

impl TripSchedule {
    #[inline]
    pub fn arrival(&self, pos: usize) -> Time {
        self.arrivals[pos]
    }

    #[inline]
    pub fn departure(&self, pos: usize) -> Time {
        self.departures[pos]
    }
}

/// A pattern with its timetable. Trips are sorted and never overtake each other, so for every
/// stop position the departure (and arrival) times are non-decreasing in the trip index.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub mode: String,
    pub pattern: Pattern,
    pub trips: Vec<TripSchedule>,
}

impl Route {
    /// Index of the earliest trip departing at `pos` at or after `earliest`, considering only
    /// trips with an index below `upper_bound`
    pub fn search_board(&self, pos: usize, earliest: Time, upper_bound: usize) -> Option<usize> {
        let bound = upper_bound.min(self.trips.len());
        let idx = self.trips[..bound].partition_point(|trip| trip.departure(pos) < earliest);
        (idx < bound).then_some(idx)
    }

    /// Index of the latest trip arriving at `pos` at or before `latest`, considering only trips
    /// with an index above `lower_bound`
    pub fn search_alight(&self, pos: usize, latest: Time, lower_bound: Option<usize>) -> Option<usize> {
        let idx = self.trips.partition_point(|trip| trip.arrival(pos) <= latest);
        let candidate = idx.checked_sub(1)?;
        match lower_bound {
            Some(bound) if candidate <= bound => None,
            _ => Some(candidate),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PreconditionError> {
        let n = self.pattern.len();
        if n < 2 {
            return Err(PreconditionError::PatternTooShort { route: self.id });
        }
        for trip in &self.trips {
            if trip.arrivals.len() != n || trip.departures.len() != n {
                return Err(PreconditionError::TripLength {
                    route: self.id, trip: trip.id, expected: n, found: trip.arrivals.len().min(trip.departures.len()),
                });
            }
            for pos in 0..n {
                if trip.departure(pos) < trip.arrival(pos) {
                    return Err(PreconditionError::NegativeDwellTime { trip: trip.id, pos });
                }
                if pos + 1 < n && trip.arrival(pos + 1) < trip.departure(pos) {
                    return Err(PreconditionError::NegativeTravelTime { trip: trip.id, pos });
                }
            }
        }
        for (prev, next) in self.trips.iter().zip(self.trips.iter().skip(1)) {
            let overtakes = (0..n).any(|pos| {
                next.departure(pos) < prev.departure(pos) || next.arrival(pos) < prev.arrival(pos)
            });
            if overtakes {
                return Err(PreconditionError::OvertakingTrips { route: self.id, first: prev.id, second: next.id });
            }
        }
        Ok(())
    }
}

/// Read-only view on the transit network used by a search
pub trait TransitDataProvider: TransferProvider {
    fn num_stops(&self) -> usize;

    fn routes(&self) -> &[Route];

    fn route(&self, id: RouteId) -> &Route {
        &self.routes()[id.index()]
    }

    /// All routes visiting `stop`
    fn routes_serving(&self, stop: StopId) -> &[RouteId];

    /// Extra cost for boarding or alighting at `stop`
    fn stop_cost(&self, _stop: StopId) -> Cost {
        0
    }

    fn stop_name(&self, stop: StopId) -> Cow<'_, str> {
        Cow::Owned(stop.to_string())
    }

    /// Checks everything the search relies on without re-checking it in the inner loops
    fn validate(&self) -> Result<(), PreconditionError> {
        if self.num_stops() == 0 || self.routes().is_empty() {
            return Err(PreconditionError::EmptyTransitData);
        }
        for (idx, route) in self.routes().iter().enumerate() {
            debug_assert_eq!(route.id.index(), idx, "route ids must be continuous");
            route.validate()?;
            if let Some(stop) = route.pattern.stops.iter().find(|s| s.index() >= self.num_stops()) {
                return Err(PreconditionError::UnknownStop(*stop));
            }
        }
        for stop in (0..self.num_stops()).map(|s| StopId(s as u32)) {
            if self.stop_cost(stop) < 0 {
                return Err(PreconditionError::NegativeCost { what: format!("stop {}", stop), cost: self.stop_cost(stop) });
            }
            if let Some(t) = self.transfers_from(stop).iter().find(|t| t.duration < 0 || t.c1 < 0) {
                return Err(PreconditionError::NegativeTransfer { from: t.from, to: t.to });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: u32, departures: &[Time]) -> TripSchedule {
        TripSchedule { id: TripId(id), arrivals: departures.to_vec(), departures: departures.to_vec(), fare: 0 }
    }

    fn route() -> Route {
        Route {
            id: RouteId(0),
            name: "L1".into(),
            mode: "BUS".into(),
            pattern: Pattern::new(vec![StopId(0), StopId(1), StopId(2)]),
            trips: vec![trip(1, &[100, 200, 300]), trip(2, &[400, 500, 600]), trip(3, &[700, 800, 900])],
        }
    }

    #[test]
    fn test_search_board() {
        let route = route();
        assert_eq!(route.search_board(0, 0, 3), Some(0));
        assert_eq!(route.search_board(0, 100, 3), Some(0));
        assert_eq!(route.search_board(0, 101, 3), Some(1));
        assert_eq!(route.search_board(1, 501, 3), Some(2));
        assert_eq!(route.search_board(1, 801, 3), None);
        // only trips before the one currently boarded are improvements
        assert_eq!(route.search_board(0, 101, 1), None);
        assert_eq!(route.search_board(0, 50, 1), Some(0));
    }

    #[test]
    fn test_search_alight() {
        let route = route();
        assert_eq!(route.search_alight(2, 1000, None), Some(2));
        assert_eq!(route.search_alight(2, 899, None), Some(1));
        assert_eq!(route.search_alight(2, 299, None), None);
        assert_eq!(route.search_alight(2, 1000, Some(2)), None);
        assert_eq!(route.search_alight(2, 1000, Some(1)), Some(2));
    }

    #[test]
    fn test_validate_route() {
        assert_eq!(route().validate(), Ok(()));

        let mut overtaking = route();
        overtaking.trips[1] = trip(2, &[400, 450, 1000]);
        assert!(matches!(overtaking.validate(), Err(PreconditionError::OvertakingTrips { .. })));

        let mut backwards = route();
        backwards.trips[0] = trip(1, &[100, 90, 300]);
        assert_eq!(backwards.validate(), Err(PreconditionError::NegativeTravelTime { trip: TripId(1), pos: 0 }));

        let mut dwell = route();
        dwell.trips[0].departures[1] = 150;
        assert_eq!(dwell.validate(), Err(PreconditionError::NegativeDwellTime { trip: TripId(1), pos: 1 }));

        let mut short = route();
        short.trips[2].arrivals.pop();
        assert!(matches!(short.validate(), Err(PreconditionError::TripLength { expected: 3, found: 2, .. })));
    }
}
