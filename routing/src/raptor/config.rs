use std::time::Duration;

use common::types::Time;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Routing parameters shared by all requests of a service. Every field has a default, so an
/// empty `routing:` section in the config file is valid.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaptorConfig {
    pub slack: SlackConfig,
    pub cost: CostConfig,
    pub search_window: SearchWindowConfig,
    /// absolute limit on the number of transfers
    pub max_transfers: usize,
    /// transfers allowed on top of the fewest needed to reach the destination
    pub extra_transfers: usize,
    /// seconds between two range raptor iterations
    pub iteration_step: Time,
    #[serde_as(as = "Option<serde_with::DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
    pub transfer_optimization: TransferOptimizationConfig,
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig::default(),
            cost: CostConfig::default(),
            search_window: SearchWindowConfig::default(),
            max_transfers: 12,
            extra_transfers: 1,
            iteration_step: 60,
            timeout: None,
            transfer_optimization: TransferOptimizationConfig::default(),
        }
    }
}

/// Seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub board_slack: Time,
    pub alight_slack: Time,
    /// added to the board slack of every boarding except the first one
    pub transfer_slack: Time,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self { board_slack: 60, alight_slack: 0, transfer_slack: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// seconds
    pub board_cost: i32,
    /// seconds, added for every boarding except the first one
    pub transfer_cost: i32,
    pub transit_reluctance: f64,
    pub wait_reluctance: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self { board_cost: 60, transfer_cost: 120, transit_reluctance: 1.0, wait_reluctance: 1.0 }
    }
}

/// `window = min_window + min_transit_time_coefficient * min_travel_time`, rounded up to a
/// multiple of `step` and capped at `max_window`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchWindowConfig {
    pub min_transit_time_coefficient: f64,
    pub min_window: Time,
    pub max_window: Time,
    pub step: Time,
}

impl Default for SearchWindowConfig {
    fn default() -> Self {
        Self { min_transit_time_coefficient: 0.5, min_window: 40 * 60, max_window: 3 * 3600, step: 10 * 60 }
    }
}

impl SearchWindowConfig {
    pub fn window_for(&self, min_travel_time: Time) -> Time {
        let raw = self.min_window as f64 + self.min_transit_time_coefficient * min_travel_time as f64;
        let step = self.step.max(1);
        let rounded = ((raw / step as f64).ceil() as Time) * step;
        rounded.min(self.max_window).max(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferTiming {
    /// transfer as late as possible, staying on board
    #[default]
    Late,
    Early,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptimizationConfig {
    pub enabled: bool,
    pub wait_reluctance: f64,
    pub transfer_timing: TransferTiming,
}

impl Default for TransferOptimizationConfig {
    fn default() -> Self {
        Self { enabled: true, wait_reluctance: 1.0, transfer_timing: TransferTiming::Late }
    }
}
