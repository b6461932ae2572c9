use common::types::{Cost, StopId, Time};
use log::debug;
use petgraph::algo::{dijkstra, Measure};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::raptor::calculator::TransitCalculator;
use crate::raptor::cost::CostCalculator;
use crate::transit::access_egress::AccessEgress;
use crate::transit::TransitDataProvider;

/// Lower bounds of a search, from the best starting leg to the best ending leg
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicSummary {
    pub min_travel_time: Time,
    pub min_rides: usize,
    pub min_c1: Cost,
}

#[derive(Debug, Clone, Copy, Default)]
struct Weight {
    time: Time,
    rides: usize,
    c1: Cost,
}

/// Time independent lower bounds for every stop: the least time, rides and c1 needed to get
/// from the stop to the end of the search (the egress side searching forward, the access side in
/// reverse). Computed with one Dijkstra per criterion on a graph of stops and on-board
/// positions, where every trip of a route is collapsed into its fastest ride between two stops.
#[derive(Debug, Clone)]
pub(crate) struct Heuristics {
    min_time: Vec<Option<Time>>,
    min_rides: Vec<Option<usize>>,
    min_c1: Vec<Option<Cost>>,
}

impl Heuristics {
    pub fn compute<D>(transit: &D, ending_legs: &[AccessEgress], calc: &TransitCalculator, cost: &CostCalculator) -> Self
    where
        D: TransitDataProvider + ?Sized,
    {
        let num_stops = transit.num_stops();
        let mut graph: DiGraph<(), Weight> = DiGraph::with_capacity(num_stops + 1, 0);
        for _ in 0..num_stops {
            graph.add_node(());
        }
        let stop_node = |stop: StopId| NodeIndex::new(stop.index());

        // Searching forward we want the distance *to* the egress, so every physical edge is
        // reversed and the egress stops hang off a virtual source node.
        let forward = calc.is_forward();
        let connect = |graph: &mut DiGraph<(), Weight>, from: NodeIndex, to: NodeIndex, weight: Weight| {
            if forward {
                graph.add_edge(to, from, weight);
            } else {
                graph.add_edge(from, to, weight);
            }
        };

        for route in transit.routes() {
            let pattern = &route.pattern;
            if route.trips.is_empty() {
                continue;
            }
            let on_board: Vec<NodeIndex> = (0..pattern.len()).map(|_| graph.add_node(())).collect();
            for pos in 0..pattern.len() {
                let stop = pattern.stop(pos);
                let stop_cost = transit.stop_cost(stop);
                if pattern.boarding_allowed(pos) {
                    let board = Weight { time: 0, rides: 1, c1: cost.board_cost() + stop_cost };
                    connect(&mut graph, stop_node(stop), on_board[pos], board);
                }
                if pattern.alighting_allowed(pos) {
                    connect(&mut graph, on_board[pos], stop_node(stop), Weight { c1: stop_cost, ..Weight::default() });
                }
                if pos + 1 < pattern.len() {
                    let ride_time = route.trips.iter()
                        .map(|trip| trip.arrival(pos + 1) - trip.departure(pos))
                        .min()
                        .unwrap_or(0);
                    let ride = Weight { time: ride_time, rides: 0, c1: cost.transit_cost(ride_time) };
                    connect(&mut graph, on_board[pos], on_board[pos + 1], ride);
                }
            }
        }

        for stop in (0..num_stops).map(|s| StopId(s as u32)) {
            for transfer in transit.transfers_from(stop) {
                let weight = Weight { time: transfer.duration, rides: 0, c1: transfer.c1 };
                connect(&mut graph, stop_node(transfer.from), stop_node(transfer.to), weight);
            }
        }

        let virtual_node = graph.add_node(());
        for leg in ending_legs {
            // rides of the ending leg are not part of the rounds
            let weight = Weight { time: leg.duration, rides: 0, c1: leg.c1 };
            graph.add_edge(virtual_node, stop_node(leg.stop), weight);
        }

        Self {
            min_time: shortest(&graph, virtual_node, num_stops, |w| w.time),
            min_rides: shortest(&graph, virtual_node, num_stops, |w| w.rides),
            min_c1: shortest(&graph, virtual_node, num_stops, |w| w.c1),
        }
    }

    pub fn min_time(&self, stop: StopId) -> Option<Time> {
        self.min_time[stop.index()]
    }

    pub fn min_rides(&self, stop: StopId) -> Option<usize> {
        self.min_rides[stop.index()]
    }

    pub fn min_c1(&self, stop: StopId) -> Option<Cost> {
        self.min_c1[stop.index()]
    }

    pub fn reachable(&self, stop: StopId) -> bool {
        self.min_time(stop).is_some()
    }

    /// Combines the bounds of the stops with the legs the search starts from. `None` if no
    /// starting leg reaches the end of the search at all.
    pub fn summary(&self, starting_legs: &[AccessEgress]) -> Option<HeuristicSummary> {
        let reachable = starting_legs.iter().filter(|leg| self.reachable(leg.stop)).collect::<Vec<_>>();
        let summary = HeuristicSummary {
            min_travel_time: reachable.iter().filter_map(|leg| Some(leg.duration + self.min_time(leg.stop)?)).min()?,
            min_rides: reachable.iter().filter_map(|leg| Some(leg.rides + self.min_rides(leg.stop)?)).min()?,
            min_c1: reachable.iter().filter_map(|leg| Some(leg.c1 + self.min_c1(leg.stop)?)).min()?,
        };
        debug!(
            target: "raptor",
            "Heuristics: at least {}s travel time, {} rides, c1 {}",
            summary.min_travel_time, summary.min_rides, summary.min_c1
        );
        Some(summary)
    }
}

fn shortest<K, F>(graph: &DiGraph<(), Weight>, source: NodeIndex, num_stops: usize, weight: F) -> Vec<Option<K>>
where
    K: Measure + Copy,
    F: Fn(&Weight) -> K,
{
    let distances = dijkstra(graph, source, None, |edge| weight(edge.weight()));
    (0..num_stops)
        .map(|idx| distances.get(&NodeIndex::new(idx)).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::queries::range::SearchDirection;
    use crate::raptor::config::{CostConfig, SlackConfig};
    use crate::transit::timetable::{Timetable, TimetableBuilder};

    fn network() -> Timetable {
        TimetableBuilder::new()
            .route("L1", &["A", "B", "C"])
            .trip(&["10:00", "10:05/10:06", "10:15"])
            .trip(&["10:30", "10:34/10:35", "10:45"])
            .route("L2", &["C", "D"])
            .trip(&["10:20", "10:30"])
            .transfer("B", "E", 300)
            .stop("F")
            .build()
            .unwrap()
    }

    fn heuristics(timetable: &Timetable, direction: SearchDirection, legs: &[AccessEgress]) -> Heuristics {
        let calc = TransitCalculator::new(direction, SlackConfig::default());
        let cost = CostCalculator::new(&CostConfig::default());
        Heuristics::compute(timetable, legs, &calc, &cost)
    }

    #[test]
    fn test_forward_bounds_to_egress() {
        let tt = network();
        let id = |name| tt.stop_id(name).unwrap();
        let h = heuristics(&tt, SearchDirection::Forward, &[AccessEgress::walk(id("D"), 60)]);

        assert_eq!(h.min_time(id("D")), Some(60));
        assert_eq!(h.min_time(id("C")), Some(600 + 60));
        // fastest hops of different trips combined, dwell times left out
        assert_eq!(h.min_time(id("A")), Some(4 * 60 + 9 * 60 + 600 + 60));
        assert_eq!(h.min_rides(id("A")), Some(2));
        assert_eq!(h.min_rides(id("C")), Some(1));
        assert_eq!(h.min_rides(id("D")), Some(0));
        // E is only reachable by a one-way transfer and has no routes
        assert!(!h.reachable(id("E")));
        assert!(!h.reachable(id("F")));

        let board = CostCalculator::new(&CostConfig::default()).board_cost();
        assert_eq!(h.min_c1(id("C")), Some(board + 600 * 100 + 60 * 100));
    }

    #[test]
    fn test_reverse_bounds_from_access() {
        let tt = network();
        let id = |name| tt.stop_id(name).unwrap();
        let h = heuristics(&tt, SearchDirection::Reverse, &[AccessEgress::walk(id("A"), 120)]);

        assert_eq!(h.min_time(id("A")), Some(120));
        assert_eq!(h.min_time(id("E")), Some(120 + 4 * 60 + 300));
        assert_eq!(h.min_rides(id("D")), Some(2));
        assert!(!h.reachable(id("F")));
    }

    #[test]
    fn test_summary() {
        let tt = network();
        let id = |name| tt.stop_id(name).unwrap();
        let h = heuristics(&tt, SearchDirection::Forward, &[AccessEgress::walk(id("C"), 0)]);

        let summary = h.summary(&[AccessEgress::walk(id("A"), 120), AccessEgress::walk(id("F"), 0)]).unwrap();
        assert_eq!(summary.min_travel_time, 120 + 4 * 60 + 9 * 60);
        assert_eq!(summary.min_rides, 1);

        assert_eq!(h.summary(&[AccessEgress::walk(id("F"), 0)]), None);
    }
}
