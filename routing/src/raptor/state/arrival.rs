use std::ops::Index;

use common::types::{Cost, RouteId, StopId, Time};

/// Index of a [`StopArrival`] in the [`ArrivalArena`] of the running iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ArrivalId(u32);

/// How a stop was reached. Positions and times are in search direction: searching in reverse,
/// `board_pos` is where the trip is physically left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrivalKind {
    Access {
        /// index into the legs the search starts from
        leg: usize,
        rides: usize,
        /// when the leg was started, in search direction
        departure_time: Time,
    },
    Transit {
        route: RouteId,
        trip_index: usize,
        board_pos: usize,
        alight_pos: usize,
        board_time: Time,
        alight_time: Time,
    },
    Transfer {
        from: StopId,
        duration: Time,
        c1: Cost,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StopArrival {
    pub stop: StopId,
    /// search direction time, including alight slack
    pub time: Time,
    pub round: usize,
    pub c1: Cost,
    pub c2: i32,
    pub kind: ArrivalKind,
    pub predecessor: Option<ArrivalId>,
}

impl StopArrival {
    /// Arrived by a ride, so a transfer or a walking egress may follow
    pub fn arrived_on_board(&self) -> bool {
        match self.kind {
            ArrivalKind::Transit { .. } => true,
            ArrivalKind::Access { rides, .. } => rides > 0,
            ArrivalKind::Transfer { .. } => false,
        }
    }

    /// Reached by walking from the origin. The next boarding is the first one of the path.
    pub fn is_street_access(&self) -> bool {
        matches!(self.kind, ArrivalKind::Access { rides: 0, .. })
    }
}

/// All stop arrivals of one iteration. Arrivals reference their predecessor by id, so the whole
/// iteration is dropped at once by [`ArrivalArena::clear`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ArrivalArena {
    arrivals: Vec<StopArrival>,
}

impl ArrivalArena {
    pub fn push(&mut self, arrival: StopArrival) -> ArrivalId {
        debug_assert!(
            arrival.predecessor.map_or(true, |p| {
                let prev = &self[p];
                match arrival.kind {
                    ArrivalKind::Transit { .. } => arrival.round == prev.round + 1,
                    _ => arrival.round == prev.round,
                }
            }),
            "round of {:?} does not follow its predecessor", arrival
        );
        self.arrivals.push(arrival);
        ArrivalId((self.arrivals.len() - 1) as u32)
    }

    /// Drops the most recently pushed arrival again, after it turned out not to be needed
    pub fn discard(&mut self, id: ArrivalId) {
        debug_assert_eq!(id.0 as usize + 1, self.arrivals.len(), "only the last arrival can be discarded");
        self.arrivals.truncate(id.0 as usize);
    }

    pub fn clear(&mut self) {
        self.arrivals.clear();
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    /// When the starting leg of the chain ending in `id` was started, in search direction
    pub fn departure_time(&self, id: ArrivalId) -> Option<Time> {
        match self.chain(id).last()?.kind {
            ArrivalKind::Access { departure_time, .. } => Some(departure_time),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &StopArrival> + '_ {
        self.arrivals.iter()
    }

    /// The arrival and all its predecessors, starting with `id`
    pub fn chain(&self, id: ArrivalId) -> impl Iterator<Item = &StopArrival> + '_ {
        std::iter::successors(Some(&self[id]), |arrival| arrival.predecessor.map(|p| &self[p]))
    }
}

impl Index<ArrivalId> for ArrivalArena {
    type Output = StopArrival;

    fn index(&self, id: ArrivalId) -> &Self::Output {
        &self.arrivals[id.0 as usize]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn access(stop: u32, time: Time) -> StopArrival {
        StopArrival {
            stop: StopId(stop),
            time,
            round: 0,
            c1: 0,
            c2: 0,
            kind: ArrivalKind::Access { leg: 0, rides: 0, departure_time: time },
            predecessor: None,
        }
    }

    fn transit(stop: u32, time: Time, round: usize, predecessor: ArrivalId) -> StopArrival {
        StopArrival {
            stop: StopId(stop),
            time,
            round,
            c1: 0,
            c2: 0,
            kind: ArrivalKind::Transit {
                route: RouteId(0), trip_index: 0, board_pos: 0, alight_pos: 1, board_time: time - 60, alight_time: time,
            },
            predecessor: Some(predecessor),
        }
    }

    #[test]
    fn test_chain_is_walked_backwards() {
        let mut arena = ArrivalArena::default();
        let a = arena.push(access(0, 100));
        let b = arena.push(transit(1, 400, 1, a));
        let c = arena.push(StopArrival {
            stop: StopId(2),
            time: 500,
            round: 1,
            c1: 0,
            c2: 0,
            kind: ArrivalKind::Transfer { from: StopId(1), duration: 100, c1: 0 },
            predecessor: Some(b),
        });
        let stops: Vec<_> = arena.chain(c).map(|a| a.stop).collect();
        assert_eq!(stops, vec![StopId(2), StopId(1), StopId(0)]);
        assert!(arena[a].is_street_access());
        assert!(arena[b].arrived_on_board());
        assert!(!arena[c].arrived_on_board());
    }

    #[test]
    fn test_departure_time_of_chain() {
        let mut arena = ArrivalArena::default();
        let start = StopArrival {
            kind: ArrivalKind::Access { leg: 0, rides: 0, departure_time: 40 },
            ..access(0, 100)
        };
        let a = arena.push(start);
        let b = arena.push(transit(1, 400, 1, a));
        assert_eq!(arena.departure_time(a), Some(40));
        assert_eq!(arena.departure_time(b), Some(40));
    }

    #[test]
    fn test_discard_last() {
        let mut arena = ArrivalArena::default();
        let a = arena.push(access(0, 100));
        let b = arena.push(transit(1, 400, 1, a));
        arena.discard(b);
        assert_eq!(arena.len(), 1);
        let c = arena.push(transit(2, 450, 1, a));
        assert_eq!(c, b);
        assert_eq!(arena[c].stop, StopId(2));
    }

    #[test]
    fn test_flex_access_counts_as_on_board() {
        let flex = StopArrival {
            kind: ArrivalKind::Access { leg: 0, rides: 1, departure_time: 0 },
            round: 1,
            ..access(0, 600)
        };
        assert!(flex.arrived_on_board());
        assert!(!flex.is_street_access());
    }
}
