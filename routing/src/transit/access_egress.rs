use common::types::{Cost, StopId, Time};
use common::util::time::{format_duration, format_time};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::raptor::cost::seconds_to_cost;

/// Time window in which a leg may be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub open: Time,
    pub close: Time,
}

/// A street or flex leg between the origin (or destination) and a stop. These are computed by
/// the street search outside the transit core and handed over with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEgress {
    pub stop: StopId,
    pub duration: Time,
    /// fixed-point generalized cost
    pub c1: Cost,
    /// Number of flex rides on this leg, counted as transit rides by the search
    #[serde(default)]
    pub rides: usize,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
}

impl AccessEgress {
    /// A plain walking leg with the cost equal to its duration
    pub fn walk(stop: StopId, duration: Time) -> Self {
        Self { stop, duration, c1: seconds_to_cost(duration), rides: 0, opening_hours: None }
    }

    pub fn flex(stop: StopId, duration: Time, rides: usize) -> Self {
        Self { rides, ..Self::walk(stop, duration) }
    }

    pub fn with_opening_hours(self, open: Time, close: Time) -> Self {
        Self { opening_hours: Some(OpeningHours { open, close }), ..self }
    }

    pub fn with_c1(self, c1: Cost) -> Self {
        Self { c1, ..self }
    }

    #[inline]
    pub fn has_rides(&self) -> bool {
        self.rides > 0
    }

    /// Earliest time at or after `requested` at which this leg can be started
    pub fn earliest_departure_time(&self, requested: Time) -> Option<Time> {
        match self.opening_hours {
            None => Some(requested),
            Some(OpeningHours { open, close }) => {
                if requested > close {
                    None
                } else {
                    Some(requested.max(open))
                }
            }
        }
    }

    /// Latest time at or before `requested` at which this leg can be started
    pub fn latest_departure_time(&self, requested: Time) -> Option<Time> {
        match self.opening_hours {
            None => Some(requested),
            Some(OpeningHours { open, close }) => {
                if requested < open {
                    None
                } else {
                    Some(requested.min(close))
                }
            }
        }
    }

    /// Latest time at or before `requested` at which this leg can end
    pub fn latest_arrival_time(&self, requested: Time) -> Option<Time> {
        self.latest_departure_time(requested - self.duration)
            .map(|departure| departure + self.duration)
    }
}

impl Display for AccessEgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.has_rides() {
            write!(f, "Flex {} {}x", format_duration(self.duration), self.rides)?;
        } else {
            write!(f, "Walk {}", format_duration(self.duration))?;
        }
        if let Some(OpeningHours { open, close }) = self.opening_hours {
            write!(f, " Open({} {})", format_time(open), format_time(close))?;
        }
        write!(f, " ~ {}", self.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raptor::cost::COST_SCALE;

    #[test]
    fn test_without_opening_hours() {
        let leg = AccessEgress::walk(StopId(1), 120);
        assert_eq!(leg.earliest_departure_time(500), Some(500));
        assert_eq!(leg.latest_departure_time(500), Some(500));
        assert_eq!(leg.latest_arrival_time(500), Some(500));
        assert_eq!(leg.c1, 12_000);
    }

    #[test]
    fn test_c1_follows_cost_scale() {
        assert_eq!(AccessEgress::walk(StopId(0), 90).c1, seconds_to_cost(90));
        assert_eq!(AccessEgress::flex(StopId(0), 90, 1).c1, 90 * COST_SCALE);
        assert_eq!(AccessEgress::walk(StopId(0), 90).with_c1(1).c1, 1);
    }

    #[test]
    fn test_with_opening_hours() {
        let leg = AccessEgress::flex(StopId(1), 300, 1).with_opening_hours(1000, 2000);

        assert_eq!(leg.earliest_departure_time(500), Some(1000));
        assert_eq!(leg.earliest_departure_time(1500), Some(1500));
        assert_eq!(leg.earliest_departure_time(2001), None);

        assert_eq!(leg.latest_departure_time(999), None);
        assert_eq!(leg.latest_departure_time(1500), Some(1500));
        assert_eq!(leg.latest_departure_time(3000), Some(2000));

        assert_eq!(leg.latest_arrival_time(1200), None);
        assert_eq!(leg.latest_arrival_time(1400), Some(1400));
        assert_eq!(leg.latest_arrival_time(9000), Some(2300));
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessEgress::walk(StopId(0), 120).to_string(), "Walk 2m ~ S0");
        assert_eq!(
            AccessEgress::flex(StopId(3), 600, 1).with_opening_hours(36_000, 39_600).to_string(),
            "Flex 10m 1x Open(10:00 11:00) ~ S3"
        );
    }
}
