use common::types::{RouteId, StopId, Time};

use crate::raptor::config::SlackConfig;
use crate::transfers::Transfer;
use crate::transit::{Route, TransitDataProvider, TripSchedule};

/// A trip ridden by a path, as an index into the timetable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripRef {
    pub route: RouteId,
    pub trip_index: usize,
}

/// A way to change from one trip to the next: alight at `from_pos`, optionally walk, board at
/// `to_pos`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripToTripTransfer {
    pub from_pos: usize,
    pub to_pos: usize,
    /// `None` when changing at the same stop
    pub transfer: Option<Transfer>,
}

impl TripToTripTransfer {
    pub fn duration(&self) -> Time {
        self.transfer.map_or(0, |t| t.duration)
    }
}

pub struct TransferGenerator<'a, D: ?Sized> {
    transit: &'a D,
    slack: SlackConfig,
}

impl<'a, D: TransitDataProvider + ?Sized> TransferGenerator<'a, D> {
    pub fn new(transit: &'a D, slack: SlackConfig) -> Self {
        Self { transit, slack }
    }

    pub fn route(&self, trip: TripRef) -> &'a Route {
        self.transit.route(trip.route)
    }

    pub fn schedule(&self, trip: TripRef) -> &'a TripSchedule {
        &self.route(trip).trips[trip.trip_index]
    }

    /// All transfers from `from` to `to` that leave enough slack. `from` is left after
    /// `from_after` and `to` is boarded before `to_before` (both positions exclusive).
    pub fn generate(&self, from: TripRef, from_after: usize, to: TripRef, to_before: usize) -> Vec<TripToTripTransfer> {
        let from_route = self.route(from);
        let from_trip = self.schedule(from);
        let to_route = self.route(to);
        let to_trip = self.schedule(to);

        let mut result = Vec::new();
        for from_pos in (from_after + 1)..from_route.pattern.len() {
            if !from_route.pattern.alighting_allowed(from_pos) {
                continue;
            }
            let stop = from_route.pattern.stop(from_pos);
            let ready = from_trip.arrival(from_pos) + self.slack.alight_slack;

            let same_stop = std::iter::once((stop, None));
            let walks = self.transit.transfers_from(stop).iter().map(|t| (t.to, Some(*t)));
            for (target, transfer) in same_stop.chain(walks) {
                let duration = transfer.map_or(0, |t: Transfer| t.duration);
                let earliest_board = ready + duration + self.slack.board_slack + self.slack.transfer_slack;
                for to_pos in positions_of(to_route, target, to_before) {
                    if to_route.pattern.boarding_allowed(to_pos) && to_trip.departure(to_pos) >= earliest_board {
                        result.push(TripToTripTransfer { from_pos, to_pos, transfer });
                    }
                }
            }
        }
        result
    }
}

/// Positions before `before` at which `route` visits `stop`
fn positions_of(route: &Route, stop: StopId, before: usize) -> impl Iterator<Item = usize> + '_ {
    route.pattern.stops[..before.min(route.pattern.len())]
        .iter()
        .enumerate()
        .filter(move |(_, s)| **s == stop)
        .map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transit::timetable::TimetableBuilder;

    #[test]
    fn test_same_stop_and_walking_transfers() {
        let tt = TimetableBuilder::new()
            .route("L1", &["A", "B", "C"])
            .trip(&["10:00", "10:10", "10:30"])
            .route("L2", &["B", "C", "D"])
            .trip(&["10:22", "10:32", "10:40"])
            .route("L3", &["E", "D"])
            .trip(&["10:20", "10:50"])
            .transfer("B", "E", 300)
            .build()
            .unwrap();
        let slack = SlackConfig { board_slack: 60, alight_slack: 0, transfer_slack: 0 };
        let generator = TransferGenerator::new(&tt, slack);
        let l1 = TripRef { route: tt.route_by_name("L1").unwrap().id, trip_index: 0 };
        let l2 = TripRef { route: tt.route_by_name("L2").unwrap().id, trip_index: 0 };
        let l3 = TripRef { route: tt.route_by_name("L3").unwrap().id, trip_index: 0 };

        let transfers = generator.generate(l1, 0, l2, 2);
        assert_eq!(
            transfers,
            vec![
                TripToTripTransfer { from_pos: 1, to_pos: 0, transfer: None },
                TripToTripTransfer { from_pos: 2, to_pos: 1, transfer: None },
            ]
        );
        // leaving L1 after B means alighting at C, but L2 must be boarded at B
        assert!(generator.generate(l1, 1, l2, 1).is_empty());

        // walking B -> E takes 5m, plus 1m board slack: 10:16, L3 leaves E at 10:20
        let walked = generator.generate(l1, 0, l3, 1);
        assert_eq!(walked.len(), 1);
        assert_eq!(walked[0].from_pos, 1);
        assert_eq!(walked[0].duration(), 300);
    }
}
