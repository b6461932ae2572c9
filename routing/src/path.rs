use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use common::types::{Cost, RouteId, StopId, Time, TripId};
use common::util::time::{format_duration, format_time};
use itertools::Itertools;
use serde::Serialize;

use crate::raptor::cost::COST_SCALE;
use crate::transit::TransitDataProvider;

/// One leg of a [`Path`]. All times are physical, `start_time <= end_time`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathLeg {
    Access {
        to: StopId,
        start_time: Time,
        end_time: Time,
        rides: usize,
        c1: Cost,
    },
    Transit {
        route: RouteId,
        trip: TripId,
        from: StopId,
        to: StopId,
        board_pos: usize,
        alight_pos: usize,
        start_time: Time,
        end_time: Time,
        c1: Cost,
    },
    Transfer {
        from: StopId,
        to: StopId,
        start_time: Time,
        end_time: Time,
        c1: Cost,
    },
    Egress {
        from: StopId,
        start_time: Time,
        end_time: Time,
        rides: usize,
        c1: Cost,
    },
}

impl PathLeg {
    pub fn start_time(&self) -> Time {
        match self {
            PathLeg::Access { start_time, .. }
            | PathLeg::Transit { start_time, .. }
            | PathLeg::Transfer { start_time, .. }
            | PathLeg::Egress { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> Time {
        match self {
            PathLeg::Access { end_time, .. }
            | PathLeg::Transit { end_time, .. }
            | PathLeg::Transfer { end_time, .. }
            | PathLeg::Egress { end_time, .. } => *end_time,
        }
    }

    pub fn duration(&self) -> Time {
        self.end_time() - self.start_time()
    }

    pub fn c1(&self) -> Cost {
        match self {
            PathLeg::Access { c1, .. }
            | PathLeg::Transit { c1, .. }
            | PathLeg::Transfer { c1, .. }
            | PathLeg::Egress { c1, .. } => *c1,
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(self, PathLeg::Transit { .. })
    }

    /// Stop the leg ends at, `None` for the egress
    pub fn to_stop(&self) -> Option<StopId> {
        match self {
            PathLeg::Access { to, .. } | PathLeg::Transit { to, .. } | PathLeg::Transfer { to, .. } => Some(*to),
            PathLeg::Egress { .. } => None,
        }
    }

    /// Transit and flex rides on this leg
    pub fn rides(&self) -> usize {
        match self {
            PathLeg::Access { rides, .. } | PathLeg::Egress { rides, .. } => *rides,
            PathLeg::Transit { .. } => 1,
            PathLeg::Transfer { .. } => 0,
        }
    }
}

/// A complete journey from the origin to the destination: access, transit legs with optional
/// transfers in between, and egress. Two paths are equal if they visit the same stops with the
/// same trips, regardless of timing and cost.
#[derive(Serialize, Debug, Clone)]
pub struct Path {
    pub start_time: Time,
    pub end_time: Time,
    pub transfers: usize,
    pub c1: Cost,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c2: Option<i32>,
    pub legs: Vec<PathLeg>,
}

impl Path {
    pub(crate) fn new(legs: Vec<PathLeg>, c1: Cost, c2: Option<i32>) -> Self {
        debug_assert!(legs.len() >= 2, "a path has at least an access and an egress leg");
        let start_time = legs.first().map(PathLeg::start_time).unwrap_or_default();
        let end_time = legs.last().map(PathLeg::end_time).unwrap_or_default();
        let rides: usize = legs.iter().map(PathLeg::rides).sum();
        Self { start_time, end_time, transfers: rides.saturating_sub(1), c1, c2, legs }
    }

    pub fn duration(&self) -> Time {
        self.end_time - self.start_time
    }

    /// Time spent neither moving nor walking
    pub fn wait_time(&self) -> Time {
        self.duration() - self.legs.iter().map(PathLeg::duration).sum::<Time>()
    }

    pub fn transit_legs(&self) -> impl Iterator<Item = &PathLeg> {
        self.legs.iter().filter(|leg| leg.is_transit())
    }

    pub fn access(&self) -> Option<&PathLeg> {
        self.legs.first()
    }

    pub fn egress(&self) -> Option<&PathLeg> {
        self.legs.last()
    }

    /// Every stop the path passes through, in travel order
    pub fn stops(&self) -> impl Iterator<Item = StopId> + '_ {
        self.legs.iter().filter_map(PathLeg::to_stop)
    }

    fn sequence(&self) -> impl Iterator<Item = (Option<StopId>, Option<TripId>)> + '_ {
        self.legs.iter().map(|leg| match leg {
            PathLeg::Transit { trip, to, .. } => (Some(*to), Some(*trip)),
            other => (other.to_stop(), None),
        })
    }

    /// Renders stops and routes by name
    pub fn display_with<'a, D: TransitDataProvider + ?Sized>(&'a self, transit: &'a D) -> PathDisplay<'a, D> {
        PathDisplay { path: self, transit: Some(transit) }
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.legs.len() == other.legs.len() && self.sequence().eq(other.sequence())
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for item in self.sequence() {
            item.hash(state);
        }
    }
}

pub struct PathDisplay<'a, D: ?Sized> {
    path: &'a Path,
    transit: Option<&'a D>,
}

impl<D: TransitDataProvider + ?Sized> PathDisplay<'_, D> {
    fn stop_name(&self, stop: StopId) -> Cow<'_, str> {
        match self.transit {
            Some(transit) => transit.stop_name(stop),
            None => Cow::Owned(stop.to_string()),
        }
    }

    fn route_label(&self, route: RouteId) -> String {
        match self.transit.and_then(|t| t.routes().get(route.index())) {
            Some(r) => format!("{} {}", r.mode, r.name),
            None => route.to_string(),
        }
    }
}

fn street_leg(duration: Time, rides: usize) -> String {
    if rides > 0 {
        format!("Flex {} {}x", format_duration(duration), rides)
    } else {
        format!("Walk {}", format_duration(duration))
    }
}

impl<D: TransitDataProvider + ?Sized> Display for PathDisplay<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts = self.path.legs.iter().flat_map(|leg| {
            let description = match leg {
                PathLeg::Access { rides, .. } | PathLeg::Egress { rides, .. } => street_leg(leg.duration(), *rides),
                PathLeg::Transfer { .. } => street_leg(leg.duration(), 0),
                PathLeg::Transit { route, start_time, end_time, .. } => format!(
                    "{} {} {}", self.route_label(*route), format_time(*start_time), format_time(*end_time)
                ),
            };
            std::iter::once(description).chain(leg.to_stop().map(|stop| self.stop_name(stop).into_owned()))
        });

        write!(
            f,
            "{} [{} {} {} Tx{} C1 {}",
            parts.format(" ~ "),
            format_time(self.path.start_time),
            format_time(self.path.end_time),
            format_duration(self.path.duration()),
            self.path.transfers,
            self.path.c1 / COST_SCALE,
        )?;
        if let Some(c2) = self.path.c2 {
            write!(f, " C2 {}", c2)?;
        }
        write!(f, "]")
    }
}

/// Renders stops and routes by their ids
impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let display: PathDisplay<'_, dyn TransitDataProvider> = PathDisplay { path: self, transit: None };
        display.fmt(f)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transit::timetable::TimetableBuilder;
    use hashbrown::HashSet;

    pub(crate) fn simple_path(trip: u32, board: Time) -> Path {
        let legs = vec![
            PathLeg::Access { to: StopId(0), start_time: board - 180, end_time: board - 60, rides: 0, c1: 12_000 },
            PathLeg::Transit {
                route: RouteId(0), trip: TripId(trip), from: StopId(0), to: StopId(2),
                board_pos: 0, alight_pos: 2, start_time: board, end_time: board + 900, c1: 96_000,
            },
            PathLeg::Egress { from: StopId(2), start_time: board + 900, end_time: board + 900, rides: 0, c1: 0 },
        ];
        Path::new(legs, 108_000, None)
    }

    #[test]
    fn test_derived_values() {
        let path = simple_path(1, 36_000);
        assert_eq!(path.start_time, 36_000 - 180);
        assert_eq!(path.end_time, 36_900);
        assert_eq!(path.duration(), 1080);
        assert_eq!(path.wait_time(), 60);
        assert_eq!(path.transfers, 0);
        assert_eq!(path.stops().collect::<Vec<_>>(), vec![StopId(0), StopId(2)]);
    }

    #[test]
    fn test_equality_ignores_timing() {
        let a = simple_path(1, 36_000);
        let b = simple_path(1, 37_000);
        let c = simple_path(2, 36_000);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<Path> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        let tt = TimetableBuilder::new()
            .route("L1", &["A", "B", "C"])
            .trip(&["10:00", "10:08", "10:15"])
            .build()
            .unwrap();
        let path = simple_path(0, 36_000);
        assert_eq!(
            path.display_with(&tt).to_string(),
            "Walk 2m ~ A ~ BUS L1 10:00 10:15 ~ C ~ Walk 0s [09:57 10:15 18m Tx0 C1 1080]"
        );
        assert_eq!(
            path.to_string(),
            "Walk 2m ~ S0 ~ R0 10:00 10:15 ~ S2 ~ Walk 0s [09:57 10:15 18m Tx0 C1 1080]"
        );
    }

    #[test]
    fn test_serialize_legs_with_type_tag() {
        let json = serde_json::to_value(simple_path(1, 36_000)).unwrap();
        assert_eq!(json["legs"][1]["type"], "transit");
        assert_eq!(json["legs"][1]["trip"], 1);
        assert!(json.get("c2").is_none());
    }
}
