use common::types::{Cost, Time};

use crate::raptor::config::CostConfig;

/// Fixed-point factor of c1: one second of transit riding costs 100 units
pub const COST_SCALE: i32 = 100;

pub fn seconds_to_cost(seconds: i32) -> Cost {
    seconds * COST_SCALE
}

fn factor(reluctance: f64) -> i32 {
    (reluctance * COST_SCALE as f64).round() as i32
}

/// Generalized cost (c1) of boarding, riding, waiting and transferring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostCalculator {
    board_cost: Cost,
    transfer_cost: Cost,
    transit_factor: i32,
    wait_factor: i32,
}

impl CostCalculator {
    pub fn new(config: &CostConfig) -> Self {
        Self {
            board_cost: seconds_to_cost(config.board_cost),
            transfer_cost: seconds_to_cost(config.transfer_cost),
            transit_factor: factor(config.transit_reluctance),
            wait_factor: factor(config.wait_reluctance),
        }
    }

    /// c1 after boarding a trip. The first boarding (directly after the access) has no
    /// transfer cost and no wait cost, since the access is shifted in time to avoid waiting.
    pub fn boarding_cost(&self, first_boarding: bool, prev_c1: Cost, wait_time: Time, stop_cost: Cost) -> Cost {
        debug_assert!(wait_time >= 0, "negative wait time {}", wait_time);
        let mut c1 = prev_c1 + self.board_cost + stop_cost;
        if !first_boarding {
            c1 += self.transfer_cost + self.wait_factor * wait_time;
        }
        c1
    }

    /// Cost of a ride relative to the (search direction) time it was boarded at. Comparing two
    /// relative costs of rides on the same trip is the same as comparing the cost of both rides
    /// at any stop further down the pattern.
    #[inline]
    pub fn relative_c1(&self, board_c1: Cost, board_dir_time: Time) -> Cost {
        board_c1 - self.transit_factor * board_dir_time
    }

    /// c1 when getting off at a stop, given the relative cost of the ride
    #[inline]
    pub fn alighting_cost(&self, relative_c1: Cost, alight_dir_time: Time, stop_cost: Cost) -> Cost {
        relative_c1 + self.transit_factor * alight_dir_time + stop_cost
    }

    /// Cost of a transit leg computed from scratch, used when rebuilding paths
    pub fn transit_leg_cost(&self, first_boarding: bool, wait_time: Time, ride_time: Time, board_stop_cost: Cost, alight_stop_cost: Cost) -> Cost {
        self.boarding_cost(first_boarding, 0, wait_time, board_stop_cost)
            + self.transit_factor * ride_time
            + alight_stop_cost
    }

    pub fn wait_cost(&self, wait_time: Time) -> Cost {
        self.wait_factor * wait_time
    }

    pub fn transit_cost(&self, ride_time: Time) -> Cost {
        self.transit_factor * ride_time
    }

    pub fn board_cost(&self) -> Cost {
        self.board_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator() -> CostCalculator {
        CostCalculator::new(&CostConfig { board_cost: 60, transfer_cost: 120, transit_reluctance: 1.5, wait_reluctance: 0.8 })
    }

    #[test]
    fn test_boarding_cost() {
        let c = calculator();
        assert_eq!(c.boarding_cost(true, 1_000, 300, 50), 1_000 + 6_000 + 50);
        assert_eq!(c.boarding_cost(false, 1_000, 300, 50), 1_000 + 6_000 + 50 + 12_000 + 80 * 300);
    }

    #[test]
    fn test_alighting_cost_matches_leg_cost() {
        let c = calculator();
        let board_c1 = c.boarding_cost(false, 5_000, 120, 0);
        let relative = c.relative_c1(board_c1, 36_000);
        let alight = c.alighting_cost(relative, 36_900, 10);
        assert_eq!(alight, 5_000 + c.transit_leg_cost(false, 120, 900, 0, 10));
    }

    proptest! {
        // For two rides of the same trip the difference of relative costs equals the difference
        // of the true cost at every stop further down the pattern
        #[test]
        fn prop_relative_cost_is_consistent(
            prev_x in 0..100_000i32, prev_y in 0..100_000i32,
            wait_x in 0..3_600i32, wait_y in 0..3_600i32,
            board_x in 0..3_600i32, delta in 0..3_600i32,
            alight_offsets in prop::collection::vec(1..7_200i32, 1..6),
            reverse in any::<bool>(),
        ) {
            let c = calculator();
            let dir = |t: Time| if reverse { -t } else { t };
            // X is boarded first, Y later (in search direction) on the same trip
            let board_y = if reverse { board_x - delta } else { board_x + delta };

            let c1_x = c.boarding_cost(false, prev_x, wait_x, 0);
            let c1_y = c.boarding_cost(false, prev_y, wait_y, 0);
            let rel_x = c.relative_c1(c1_x, dir(board_x));
            let rel_y = c.relative_c1(c1_y, dir(board_y));

            for offset in alight_offsets {
                let alight = if reverse { board_y - offset } else { board_y + offset };
                let incremental_x = c.alighting_cost(rel_x, dir(alight), 0);
                let incremental_y = c.alighting_cost(rel_y, dir(alight), 0);

                let scratch_x = c1_x + c.transit_cost((alight - board_x).abs());
                let scratch_y = c1_y + c.transit_cost((alight - board_y).abs());

                prop_assert_eq!(incremental_x, scratch_x);
                prop_assert_eq!(incremental_y, scratch_y);
                prop_assert_eq!(rel_x - rel_y, scratch_x - scratch_y);
            }
        }
    }
}
