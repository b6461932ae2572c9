/// Keeps track of the current round and decides when the round loop of an iteration ends.
///
/// Round 0 holds the access arrivals, round `n` the arrivals using `n` rides. Once the
/// destination is reached in round `r`, only `extra_transfers` more rounds are run. The limit
/// is kept across iterations of the same search.
#[derive(Debug, Clone)]
pub(crate) struct RoundTracker {
    round: usize,
    /// exclusive
    round_max_limit: usize,
    extra_transfers: usize,
}

impl RoundTracker {
    pub fn new(max_rides: usize, extra_transfers: usize) -> Self {
        Self { round: 0, round_max_limit: max_rides + 1, extra_transfers }
    }

    pub fn setup_iteration(&mut self) {
        self.round = 0;
    }

    pub fn has_more_rounds(&self) -> bool {
        self.round + 1 < self.round_max_limit
    }

    pub fn next_round(&mut self) -> usize {
        self.round += 1;
        debug_assert!(self.round < self.round_max_limit, "round {} exceeds limit", self.round);
        self.round
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn is_first_round(&self) -> bool {
        self.round == 1
    }

    /// Highest round that may still be run
    pub fn max_round(&self) -> usize {
        self.round_max_limit - 1
    }

    pub fn round_complete(&mut self, destination_reached: bool) {
        if destination_reached {
            self.round_max_limit = self.round_max_limit.min(self.round + self.extra_transfers + 1);
        }
    }
}
