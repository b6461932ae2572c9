use common::types::{Cost, StopId, Time};

use crate::optimize::transfer_generator::{TransferGenerator, TripRef, TripToTripTransfer};
use crate::path::PathLeg;
use crate::raptor::config::SlackConfig;
use crate::raptor::cost::CostCalculator;
use crate::transit::TransitDataProvider;

/// The end of a path, from some trip to the egress, with all transfers after that trip chosen.
/// Where the head trip is boarded is decided when the tail is extended by the trip before it.
#[derive(Debug, Clone)]
pub struct PathTail {
    pub head: TripRef,
    /// position the head trip is left at
    pub head_alight_pos: usize,
    /// legs after the head trip, last leg first
    legs: Vec<PathLeg>,
    /// stops passed after the head trip, last stop first
    stops: Vec<StopId>,
    /// c1 of `legs`
    pub c1: Cost,
    pub wait_time: Time,
    /// sum of the times trips are left at, used to break ties
    pub alight_times: i64,
}

impl PathTail {
    pub fn new(head: TripRef, head_alight_pos: usize) -> Self {
        Self { head, head_alight_pos, legs: vec![], stops: vec![], c1: 0, wait_time: 0, alight_times: 0 }
    }

    /// Stops passed after the head trip in reverse travel order
    pub fn stops_reversed(&self) -> impl Iterator<Item = StopId> + '_ {
        self.stops.iter().copied()
    }

    /// Fixes where the head trip is boarded, by changing to it from `prev` with `transfer`. The
    /// result is a tail headed by `prev`.
    pub fn extend<D: TransitDataProvider + ?Sized>(
        &self,
        prev: TripRef,
        transfer: &TripToTripTransfer,
        generator: &TransferGenerator<'_, D>,
        cost: &CostCalculator,
        slack: &SlackConfig,
        transit: &D,
    ) -> PathTail {
        let prev_route = generator.route(prev);
        let prev_trip = generator.schedule(prev);
        let alight_stop = prev_route.pattern.stop(transfer.from_pos);
        let walk_start = prev_trip.arrival(transfer.from_pos) + slack.alight_slack;
        let ready = walk_start + transfer.duration();

        let head_route = generator.route(self.head);
        let head_trip = generator.schedule(self.head);
        let start_time = head_trip.departure(transfer.to_pos);
        let end_time = head_trip.arrival(self.head_alight_pos);
        let wait_time = start_time - ready;
        debug_assert!(wait_time >= 0, "transfer to {} leaves no time to board", self.head.route);
        let board_stop = head_route.pattern.stop(transfer.to_pos);
        let head_leg = PathLeg::Transit {
            route: self.head.route,
            trip: head_trip.id,
            from: board_stop,
            to: head_route.pattern.stop(self.head_alight_pos),
            board_pos: transfer.to_pos,
            alight_pos: self.head_alight_pos,
            start_time,
            end_time,
            c1: cost.transit_leg_cost(
                false,
                wait_time,
                end_time - start_time,
                transit.stop_cost(board_stop),
                transit.stop_cost(head_route.pattern.stop(self.head_alight_pos)),
            ),
        };

        let mut tail = PathTail {
            head: prev,
            head_alight_pos: transfer.from_pos,
            legs: self.legs.clone(),
            stops: self.stops.clone(),
            c1: self.c1 + head_leg.c1(),
            wait_time: self.wait_time + wait_time,
            alight_times: self.alight_times + i64::from(prev_trip.arrival(transfer.from_pos)),
        };
        tail.stops.extend((transfer.to_pos + 1..=self.head_alight_pos).rev().map(|pos| head_route.pattern.stop(pos)));
        tail.legs.push(head_leg);
        if let Some(walk) = transfer.transfer {
            tail.stops.push(walk.to);
            tail.legs.push(PathLeg::Transfer {
                from: alight_stop,
                to: walk.to,
                start_time: walk_start,
                end_time: walk_start + walk.duration,
                c1: walk.c1,
            });
            tail.c1 += walk.c1;
        }
        tail
    }

    /// Legs after the head trip in travel order
    pub fn into_legs(self) -> impl Iterator<Item = PathLeg> {
        self.legs.into_iter().rev()
    }
}
