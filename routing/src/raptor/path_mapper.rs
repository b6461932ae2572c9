//! Turns a chain of stop arrivals into a [`Path`]. The chain only tells which stops, trips and
//! transfers are used; all times are recomputed in physical order, with the access leg starting
//! as late and the egress leg as early as possible, and c1 is recomputed from the legs.

use common::types::{RouteId, StopId, Time};
use itertools::Itertools;

use crate::algorithms::queries::range::SearchDirection;
use crate::path::{Path, PathLeg};
use crate::raptor::context::SearchContext;
use crate::raptor::state::arrival::{ArrivalArena, ArrivalId, ArrivalKind};
use crate::transit::access_egress::AccessEgress;
use crate::transit::TransitDataProvider;

/// Part of a path between access and egress, in physical direction
#[derive(Debug, Clone, Copy)]
enum Segment {
    Transit { route: RouteId, trip_index: usize, from_pos: usize, to_pos: usize },
    Transfer { from: StopId, to: StopId, duration: Time, c1: i32 },
}

/// Maps the arrival `last` and the ending leg `ending_leg` (index into the ending legs of the
/// request) to a path. `None` if the chain is not a valid path.
pub(crate) fn map_path<D>(ctx: &SearchContext<'_, D>, arena: &ArrivalArena, last: ArrivalId, ending_leg: usize) -> Option<Path>
where
    D: TransitDataProvider + ?Sized,
{
    let chain = arena.chain(last).collect_vec();
    let (start, middle) = chain.split_last()?;
    let ArrivalKind::Access { leg: starting_leg, departure_time, .. } = start.kind else {
        return None;
    };

    // `middle` is ordered from the last arrival back to the first one after the access
    let mut segments = Vec::with_capacity(middle.len());
    for arrival in middle {
        let segment = match (arrival.kind, ctx.calc.direction()) {
            (ArrivalKind::Transit { route, trip_index, board_pos, alight_pos, .. }, SearchDirection::Forward) => {
                Segment::Transit { route, trip_index, from_pos: board_pos, to_pos: alight_pos }
            }
            (ArrivalKind::Transit { route, trip_index, board_pos, alight_pos, .. }, SearchDirection::Reverse) => {
                Segment::Transit { route, trip_index, from_pos: alight_pos, to_pos: board_pos }
            }
            (ArrivalKind::Transfer { from, duration, c1 }, SearchDirection::Forward) => {
                Segment::Transfer { from, to: arrival.stop, duration, c1 }
            }
            (ArrivalKind::Transfer { from, duration, c1 }, SearchDirection::Reverse) => {
                Segment::Transfer { from: arrival.stop, to: from, duration, c1 }
            }
            (ArrivalKind::Access { .. }, _) => return None,
        };
        segments.push(segment);
    }

    let request = ctx.request;
    let (access, egress) = match ctx.calc.direction() {
        SearchDirection::Forward => {
            segments.reverse();
            (request.access.get(starting_leg)?, request.egress.get(ending_leg)?)
        }
        SearchDirection::Reverse => (request.access.get(ending_leg)?, request.egress.get(starting_leg)?),
    };

    let builder = PathBuilder { ctx, segments, access, egress };
    builder.build(departure_time, arena[last].c2)
}

struct PathBuilder<'c, 'a, D: ?Sized> {
    ctx: &'c SearchContext<'a, D>,
    segments: Vec<Segment>,
    access: &'a AccessEgress,
    egress: &'a AccessEgress,
}

/// Physical times of all parts of a path
struct Timing {
    access: (Time, Time),
    segments: Vec<(Time, Time)>,
    egress: (Time, Time),
    /// when the traveller is ready to start the egress leg
    egress_ready: Time,
}

impl<D: TransitDataProvider + ?Sized> PathBuilder<'_, '_, D> {
    fn build(&self, search_start_time: Time, c2: i32) -> Option<Path> {
        let timing = if self.segments.iter().any(|s| matches!(s, Segment::Transit { .. })) {
            self.compact_around_transit()?
        } else {
            self.street_only(search_start_time)?
        };

        let mut legs = Vec::with_capacity(self.segments.len() + 2);
        let (access_start, access_end) = timing.access;
        legs.push(PathLeg::Access {
            to: self.access.stop,
            start_time: access_start,
            end_time: access_end,
            rides: self.access.rides,
            c1: self.access.c1,
        });

        let transit = self.ctx.transit;
        let cost = &self.ctx.cost;
        let mut ready = access_end;
        let mut first_boarding = !self.access.has_rides();
        for (segment, &(start_time, end_time)) in self.segments.iter().zip(&timing.segments) {
            match *segment {
                Segment::Transit { route, trip_index, from_pos, to_pos } => {
                    let route = transit.route(route);
                    let (from, to) = (route.pattern.stop(from_pos), route.pattern.stop(to_pos));
                    let c1 = cost.transit_leg_cost(
                        first_boarding,
                        (start_time - ready).max(0),
                        end_time - start_time,
                        transit.stop_cost(from),
                        transit.stop_cost(to),
                    );
                    legs.push(PathLeg::Transit {
                        route: route.id,
                        trip: route.trips[trip_index].id,
                        from,
                        to,
                        board_pos: from_pos,
                        alight_pos: to_pos,
                        start_time,
                        end_time,
                        c1,
                    });
                    ready = end_time + self.ctx.slack.alight_slack;
                    first_boarding = false;
                }
                Segment::Transfer { from, to, c1, .. } => {
                    legs.push(PathLeg::Transfer { from, to, start_time, end_time, c1 });
                    ready = end_time;
                }
            }
        }

        let (egress_start, egress_end) = timing.egress;
        legs.push(PathLeg::Egress {
            from: self.egress.stop,
            start_time: egress_start,
            end_time: egress_end,
            rides: self.egress.rides,
            c1: self.egress.c1,
        });

        debug_assert!(
            legs.iter().tuple_windows().all(|(a, b)| a.end_time() <= b.start_time()),
            "legs of the path overlap: {:?}", legs
        );

        let c1 = legs.iter().map(PathLeg::c1).sum::<i32>() + cost.wait_cost(egress_start - timing.egress_ready);
        let c2 = self.ctx.c2.as_ref().map(|_| c2);
        Some(Path::new(legs, c1, c2))
    }

    fn transit_times(&self, segment: &Segment) -> Option<(Time, Time)> {
        match *segment {
            Segment::Transit { route, trip_index, from_pos, to_pos } => {
                let trip = self.ctx.transit.route(route).trips.get(trip_index)?;
                Some((trip.departure(from_pos), trip.arrival(to_pos)))
            }
            Segment::Transfer { .. } => None,
        }
    }

    /// Transit legs keep their schedule. Everything before the first one is pushed as late as
    /// possible, everything after the last one as early as possible.
    fn compact_around_transit(&self) -> Option<Timing> {
        let slack = self.ctx.slack;
        let first = self.segments.iter().position(|s| matches!(s, Segment::Transit { .. }))?;
        let last = self.segments.iter().rposition(|s| matches!(s, Segment::Transit { .. }))?;
        let mut times = vec![(0, 0); self.segments.len()];

        let mut ready = 0;
        for (idx, segment) in self.segments.iter().enumerate().take(last + 1).skip(first) {
            times[idx] = match *segment {
                Segment::Transit { .. } => self.transit_times(segment)?,
                Segment::Transfer { duration, .. } => (ready, ready + duration),
            };
            ready = match segment {
                Segment::Transit { .. } => times[idx].1 + slack.alight_slack,
                Segment::Transfer { .. } => times[idx].1,
            };
        }

        let mut latest = times[first].0 - slack.board_slack;
        if self.access.has_rides() {
            latest -= slack.transfer_slack;
        }
        for (segment, time) in self.segments[..first].iter().zip(&mut times[..first]).rev() {
            if let Segment::Transfer { duration, .. } = *segment {
                *time = (latest - duration, latest);
                latest -= duration;
            }
        }

        for (segment, time) in self.segments[last + 1..].iter().zip(&mut times[last + 1..]) {
            if let Segment::Transfer { duration, .. } = *segment {
                *time = (ready, ready + duration);
                ready += duration;
            }
        }

        let access_start = self.access.latest_departure_time(latest - self.access.duration)?;
        let egress_start = self.egress.earliest_departure_time(ready)?;
        Some(Timing {
            access: (access_start, access_start + self.access.duration),
            segments: times,
            egress: (egress_start, egress_start + self.egress.duration),
            egress_ready: ready,
        })
    }

    /// A path riding only flex legs. Anchored at the time the search started the first leg.
    fn street_only(&self, search_start_time: Time) -> Option<Timing> {
        let mut times = vec![(0, 0); self.segments.len()];
        let transfer_duration = |segment: &Segment| match segment {
            Segment::Transfer { duration, .. } => *duration,
            Segment::Transit { .. } => 0,
        };

        match self.ctx.calc.direction() {
            SearchDirection::Forward => {
                let access = (search_start_time, search_start_time + self.access.duration);
                let mut ready = access.1;
                for (idx, segment) in self.segments.iter().enumerate() {
                    times[idx] = (ready, ready + transfer_duration(segment));
                    ready = times[idx].1;
                }
                let egress_start = self.egress.earliest_departure_time(ready)?;
                Some(Timing {
                    access,
                    segments: times,
                    egress: (egress_start, egress_start + self.egress.duration),
                    egress_ready: ready,
                })
            }
            SearchDirection::Reverse => {
                let egress = (search_start_time - self.egress.duration, search_start_time);
                let mut latest = egress.0;
                for (idx, segment) in self.segments.iter().enumerate().rev() {
                    times[idx] = (latest - transfer_duration(segment), latest);
                    latest = times[idx].0;
                }
                let access_start = self.access.latest_departure_time(latest - self.access.duration)?;
                Some(Timing {
                    access: (access_start, access_start + self.access.duration),
                    segments: times,
                    egress,
                    egress_ready: egress.0,
                })
            }
        }
    }
}
