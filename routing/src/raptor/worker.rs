use std::time::{Duration, Instant};

use common::types::Time;
use common::util::time::format_time;
use log::{debug, trace};

use crate::algorithms::errors::{QueryError, QueryResult};
use crate::algorithms::queries::range::StopArrivals;
use crate::path::Path;
use crate::raptor::context::SearchContext;
use crate::raptor::round_tracker::RoundTracker;
use crate::raptor::state::RoutingStrategy;
use crate::transit::TransitDataProvider;

/// Result of running all iterations of a search
pub(crate) struct WorkerOutput {
    pub paths: Vec<Path>,
    pub stop_arrivals: StopArrivals,
    pub iterations: usize,
}

/// Runs the range raptor iterations and rounds. What is kept at each stop is up to the strategy.
pub(crate) struct RaptorWorker<'c, 'a, D: ?Sized, S> {
    ctx: &'c SearchContext<'a, D>,
    strategy: S,
    tracker: RoundTracker,
    step: Time,
    timeout: Option<Duration>,
}

impl<'c, 'a, D, S> RaptorWorker<'c, 'a, D, S>
where
    D: TransitDataProvider + ?Sized,
    S: RoutingStrategy<'c, 'a, D>,
{
    pub fn new(ctx: &'c SearchContext<'a, D>, strategy: S, max_transfers: usize, extra_transfers: usize, step: Time) -> Self {
        Self {
            ctx,
            strategy,
            tracker: RoundTracker::new(max_transfers + 1, extra_transfers),
            step,
            timeout: ctx.request.timeout,
        }
    }

    /// Used when the request does not set its own timeout
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = self.timeout.or(timeout);
        self
    }

    pub fn route(mut self) -> QueryResult<WorkerOutput> {
        let started = Instant::now();
        let deadline = self.timeout.map(|timeout| started + timeout);
        let times = self.ctx.calc.iteration_times(self.ctx.window, self.step);
        // flex legs are added in the round matching their rides, so at least that many rounds run
        let min_rounds = self.ctx.starting_legs().iter().map(|leg| leg.rides).max().unwrap_or(0);

        for (iteration, &time) in times.iter().enumerate() {
            if iteration > 0 && deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(target: "raptor", "Timeout after {} of {} iterations", iteration, times.len());
                return Err(QueryError::Timeout { iterations_completed: iteration });
            }
            self.iteration(time, min_rounds);
        }

        debug!(
            target: "raptor",
            "{} iterations from {} to {} done in {:?}",
            times.len(), format_time(self.ctx.window.from), format_time(self.ctx.window.to), started.elapsed()
        );
        let (paths, stop_arrivals) = self.strategy.into_result();
        Ok(WorkerOutput { paths, stop_arrivals, iterations: times.len() })
    }

    fn iteration(&mut self, time: Time, min_rounds: usize) {
        let starting_legs = self.ctx.starting_legs();
        let transit = self.ctx.transit;
        self.tracker.setup_iteration();
        self.strategy.setup_iteration(self.tracker.max_round());

        // ROUND 0: walking to the first stops
        for (idx, leg) in starting_legs.iter().enumerate().filter(|(_, leg)| !leg.has_rides()) {
            self.strategy.add_access(idx, leg, time);
        }

        while self.tracker.has_more_rounds()
            && (self.tracker.round() < min_rounds || self.strategy.is_new_round_available())
        {
            let round = self.tracker.next_round();
            self.strategy.prepare_round(round, self.tracker.max_round());

            // FIRST STAGE: ride every route serving a stop improved in the last round
            let routes = self.strategy.routes_touched_last_round();
            for route in routes.iter().map(|id| transit.route(*id)).filter(|route| !route.trips.is_empty()) {
                self.strategy.route_pass(route);
            }

            // SECOND STAGE: flex legs arrive on board, like a ride
            for (idx, leg) in starting_legs.iter().enumerate().filter(|(_, leg)| leg.rides == round) {
                self.strategy.add_access(idx, leg, time);
            }

            // THIRD STAGE: transfers from stops reached on board in this round
            self.strategy.transfers_pass();

            trace!(
                target: "raptor::worker",
                "{} round {}: {} routes, {} stop arrivals",
                format_time(time), round, routes.len(), self.strategy.base().arena.len()
            );
            self.tracker.round_complete(self.strategy.destination_reached_current_round());
        }
    }
}
