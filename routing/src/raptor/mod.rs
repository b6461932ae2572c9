use std::sync::Arc;
use std::time::Instant;

use common::types::Time;
use common::util::time::format_time;
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::algorithms::errors::QueryResult;
use crate::algorithms::queries::range::{Profile, RaptorRequest, RaptorResponse, Range, SearchDirection, SearchWindow};
use crate::algorithms::queries::Queryable;
use crate::algorithms::RoutingAlgorithm;
use crate::optimize::TransferOptimizer;
use crate::raptor::c2::{C2Calculator, PassThroughC2};
use crate::raptor::calculator::TransitCalculator;
use crate::raptor::config::RaptorConfig;
use crate::raptor::context::SearchContext;
use crate::raptor::cost::CostCalculator;
use crate::raptor::heuristics::Heuristics;
use crate::raptor::state::multi_criteria::MultiCriteriaRouting;
use crate::raptor::state::standard::StandardRouting;
use crate::raptor::worker::{RaptorWorker, WorkerOutput};
use crate::transit::TransitDataProvider;

pub mod c2;
pub(crate) mod calculator;
pub mod config;
mod context;
pub mod cost;
mod destination;
pub mod heuristics;
mod path_mapper;
mod round_tracker;
mod state;
mod worker;

/// Range raptor over a read-only transit network. One service answers any number of requests,
/// each search owns all of its state.
pub struct RaptorService<'a, D: ?Sized> {
    transit: &'a D,
    config: RaptorConfig,
}

impl<D: TransitDataProvider + Sync + ?Sized> RoutingAlgorithm for RaptorService<'_, D> {}

impl<D: TransitDataProvider + Sync + ?Sized> Queryable<Range> for RaptorService<'_, D> {
    fn query(&self, input: RaptorRequest) -> QueryResult<RaptorResponse> {
        self.route(&input)
    }
}

impl<'a, D: TransitDataProvider + Sync + ?Sized> RaptorService<'a, D> {
    /// Checks the transit data once, so searches can rely on it
    pub fn new(transit: &'a D, config: RaptorConfig) -> QueryResult<Self> {
        transit.validate()?;
        debug!(target: "raptor", "Routing on {} stops and {} routes", transit.num_stops(), transit.routes().len());
        Ok(Self { transit, config })
    }

    pub fn config(&self) -> &RaptorConfig {
        &self.config
    }

    /// Runs independent searches in parallel
    pub fn route_all(&self, requests: &[RaptorRequest]) -> Vec<QueryResult<RaptorResponse>> {
        requests.par_iter().map(|request| self.route(request)).collect()
    }

    pub fn route(&self, request: &RaptorRequest) -> QueryResult<RaptorResponse> {
        let num_stops = self.transit.num_stops();
        request.validate(num_stops)?;
        let started = Instant::now();

        let calc = TransitCalculator::new(request.direction, self.config.slack);
        let cost = CostCalculator::new(&self.config.cost);
        let heuristics = Heuristics::compute(self.transit, request.ending_legs(), &calc, &cost);
        let Some(summary) = heuristics.summary(request.starting_legs()) else {
            debug!(target: "raptor", "No connection between origin and destination");
            return Ok(RaptorResponse::no_connection(num_stops, None));
        };

        let window = self.search_window(request, summary.min_travel_time);
        let c2: Option<Arc<dyn C2Calculator>> = if !request.pass_through_points.is_empty() {
            Some(Arc::new(PassThroughC2::new(request.pass_through_points.clone(), request.direction)))
        } else if request.use_c2 {
            request.c2_calculator.clone()
        } else {
            None
        };
        debug!(
            target: "raptor",
            "{:?} {:?} search from {} to {}",
            request.profile, request.direction, format_time(window.from), format_time(window.to)
        );

        let ctx = SearchContext::new(self.transit, request, calc, cost, self.config.slack, heuristics, c2, window);
        let max_transfers = request.max_transfers.unwrap_or(self.config.max_transfers);
        let extra_transfers = request.extra_transfers.unwrap_or(self.config.extra_transfers);
        let (step, timeout) = (self.config.iteration_step, self.config.timeout);
        let WorkerOutput { mut paths, stop_arrivals, iterations } = match request.profile {
            Profile::Standard => {
                RaptorWorker::new(&ctx, StandardRouting::new(&ctx), max_transfers, extra_transfers, step)
                    .with_default_timeout(timeout)
                    .route()?
            }
            Profile::MultiCriteria => {
                RaptorWorker::new(&ctx, MultiCriteriaRouting::new(&ctx), max_transfers, extra_transfers, step)
                    .with_default_timeout(timeout)
                    .route()?
            }
        };

        if self.config.transfer_optimization.enabled {
            let optimizer = TransferOptimizer::new(self.transit, &self.config, &request.pass_through_points);
            paths = optimizer.optimize(paths);
        }
        paths.sort_by_key(|path| (path.start_time, path.end_time, path.transfers));
        debug!(target: "raptor", "Found {} paths in {:?}", paths.len(), started.elapsed());

        Ok(RaptorResponse {
            paths,
            stop_arrivals,
            heuristic_path_exists: true,
            search_window: Some(window),
            iterations,
            heuristics: Some(summary),
        })
    }

    /// Forward searches depart within the window, reverse searches arrive within it
    fn search_window(&self, request: &RaptorRequest, min_travel_time: Time) -> SearchWindow {
        let len = request.search_window
            .unwrap_or_else(|| self.config.search_window.window_for(min_travel_time));
        match request.direction {
            SearchDirection::Forward => {
                let from = request.earliest_departure.unwrap_or_default();
                SearchWindow { from, to: from + len }
            }
            SearchDirection::Reverse => {
                let to = request.latest_arrival.unwrap_or_default();
                SearchWindow { from: to - len, to }
            }
        }
    }
}
