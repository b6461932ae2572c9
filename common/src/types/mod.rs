use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod errors;

/// Search-local time in seconds since midnight of the search day. Times past 24:00 are valid
/// (trips running over midnight), and so are negative times (the day before).
pub type Time = i32;

/// Generalized cost (c1) in fixed-point hundredths of a second.
pub type Cost = i32;

// a continuous stop id
// "continuous" means that if we have n stops, all ids are from 0,...,n-1 and no number in that range
// is unused
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(pub u32);

impl StopId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for StopId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// Index of a route (a trip pattern together with its timetable), continuous like StopId
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u32);

impl RouteId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub u32);

impl Display for TripId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
