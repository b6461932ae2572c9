use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use common::types::errors::UnknownStopNameError;
use common::types::{Cost, RouteId, StopId, Time, TripId};
use common::util::time::{format_time, parse_time, TimeParseError};
use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::algorithms::errors::PreconditionError;
use crate::raptor::cost::seconds_to_cost;
use crate::transfers::{Transfer, TransferError, TransferIndex, TransferProvider};
use crate::transit::{Pattern, Route, TransitDataProvider, TripSchedule};

/// Serializable description of a small transit network, referring to stops by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetableData {
    pub stops: Vec<StopData>,
    pub routes: Vec<RouteData>,
    #[serde(default)]
    pub transfers: Vec<TransferData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopData {
    pub name: String,
    /// board/alight cost in seconds
    #[serde(default)]
    pub cost: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub stops: Vec<String>,
    #[serde(default)]
    pub no_boarding: Vec<usize>,
    #[serde(default)]
    pub no_alighting: Vec<usize>,
    pub trips: Vec<TripData>,
}

fn default_mode() -> String {
    "BUS".to_owned()
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripData {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub times: Vec<StopTime>,
    #[serde(default)]
    pub fare: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferData {
    pub from: String,
    pub to: String,
    /// seconds
    pub duration: Time,
    /// seconds, defaults to the duration
    #[serde(default)]
    pub cost: Option<i32>,
    #[serde(default)]
    pub both_ways: bool,
}

/// `HH:MM[:SS]`, or `arrival/departure` when the vehicle dwells at the stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTime {
    pub arrival: Time,
    pub departure: Time,
}

impl FromStr for StopTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((arrival, departure)) => Ok(StopTime {
                arrival: parse_time(arrival)?,
                departure: parse_time(departure)?,
            }),
            None => {
                let time = parse_time(s)?;
                Ok(StopTime { arrival: time, departure: time })
            }
        }
    }
}

impl Display for StopTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.arrival == self.departure {
            write!(f, "{}", format_time(self.arrival))
        } else {
            write!(f, "{}/{}", format_time(self.arrival), format_time(self.departure))
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimetableError {
    UnknownStop(#[from] UnknownStopNameError),
    DuplicateStop(String),
    Time { route: String, source: TimeParseError },
    TripLength { route: String, expected: usize, found: usize },
    InvalidPosition { route: String, pos: usize },
    Precondition(#[from] PreconditionError),
    Transfer(#[from] TransferError),
}

impl Display for TimetableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimetableError::UnknownStop(err) => write!(f, "Building timetable: {}", err),
            TimetableError::DuplicateStop(name) => write!(f, "Building timetable: stop '{}' defined twice", name),
            TimetableError::Time { route, source } => write!(f, "Building timetable: route '{}': {}", route, source),
            TimetableError::TripLength { route, expected, found } => write!(
                f, "Building timetable: route '{}' has {} stops, but a trip has {} times", route, expected, found
            ),
            TimetableError::InvalidPosition { route, pos } => write!(
                f, "Building timetable: route '{}' has no stop position {}", route, pos
            ),
            TimetableError::Precondition(err) => write!(f, "Building timetable: {}", err),
            TimetableError::Transfer(err) => write!(f, "Building timetable: {}", err),
        }
    }
}

/// In-memory transit data provider
#[derive(Debug, Clone)]
pub struct Timetable {
    stop_names: Vec<String>,
    stop_index: HashMap<String, StopId>,
    stop_costs: Vec<Cost>,
    routes: Vec<Route>,
    routes_by_stop: Vec<Vec<RouteId>>,
    transfers: TransferIndex,
}

impl Timetable {
    pub fn stop_id(&self, name: &str) -> Result<StopId, UnknownStopNameError> {
        self.stop_index.get(name).copied().ok_or_else(|| UnknownStopNameError(name.to_owned()))
    }

    pub fn stop_names(&self) -> &[String] {
        &self.stop_names
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn num_trips(&self) -> usize {
        self.routes.iter().map(|r| r.trips.len()).sum()
    }
}

impl TryFrom<TimetableData> for Timetable {
    type Error = TimetableError;

    fn try_from(data: TimetableData) -> Result<Self, Self::Error> {
        let mut stop_index = HashMap::with_capacity(data.stops.len());
        for (idx, stop) in data.stops.iter().enumerate() {
            if stop_index.insert(stop.name.clone(), StopId(idx as u32)).is_some() {
                return Err(TimetableError::DuplicateStop(stop.name.clone()));
            }
        }
        let lookup = |name: &str| -> Result<StopId, UnknownStopNameError> {
            stop_index.get(name).copied().ok_or_else(|| UnknownStopNameError(name.to_owned()))
        };

        let stop_costs = data.stops.iter()
            .map(|s| seconds_to_cost(s.cost.unwrap_or(0)))
            .collect_vec();

        let mut next_trip_id = 0u32;
        let mut routes = Vec::with_capacity(data.routes.len());
        for (idx, route) in data.routes.iter().enumerate() {
            let stops: Vec<StopId> = route.stops.iter()
                .map(|name| lookup(name))
                .collect::<Result<_, _>>()?;
            let mut pattern = Pattern::new(stops);
            for &pos in &route.no_boarding {
                *pattern.boarding.get_mut(pos)
                    .ok_or_else(|| TimetableError::InvalidPosition { route: route.name.clone(), pos })? = false;
            }
            for &pos in &route.no_alighting {
                *pattern.alighting.get_mut(pos)
                    .ok_or_else(|| TimetableError::InvalidPosition { route: route.name.clone(), pos })? = false;
            }

            let mut trips = Vec::with_capacity(route.trips.len());
            for trip in &route.trips {
                if trip.times.len() != pattern.len() {
                    return Err(TimetableError::TripLength {
                        route: route.name.clone(), expected: pattern.len(), found: trip.times.len(),
                    });
                }
                let id = trip.id.unwrap_or(next_trip_id);
                next_trip_id = next_trip_id.max(id) + 1;
                trips.push(TripSchedule {
                    id: TripId(id),
                    arrivals: trip.times.iter().map(|t| t.arrival).collect(),
                    departures: trip.times.iter().map(|t| t.departure).collect(),
                    fare: trip.fare,
                });
            }
            trips.sort_by_key(|t| (t.departures.first().copied(), t.arrivals.last().copied()));

            let route = Route {
                id: RouteId(idx as u32),
                name: route.name.clone(),
                mode: route.mode.clone(),
                pattern,
                trips,
            };
            route.validate()?;
            routes.push(route);
        }

        let mut transfers = Vec::with_capacity(data.transfers.len());
        for t in &data.transfers {
            let (from, to) = (lookup(&t.from)?, lookup(&t.to)?);
            let c1 = seconds_to_cost(t.cost.unwrap_or(t.duration));
            transfers.push(Transfer { from, to, duration: t.duration, c1 });
            if t.both_ways {
                transfers.push(Transfer { from: to, to: from, duration: t.duration, c1 });
            }
        }
        let transfers = TransferIndex::new(data.stops.len(), transfers)?;

        let mut routes_by_stop = vec![Vec::new(); data.stops.len()];
        for route in &routes {
            for stop in route.pattern.stops.iter().unique() {
                routes_by_stop[stop.index()].push(route.id);
            }
        }

        let timetable = Timetable {
            stop_names: data.stops.into_iter().map(|s| s.name).collect(),
            stop_index,
            stop_costs,
            routes,
            routes_by_stop,
            transfers,
        };
        timetable.validate()?;

        debug!(
            target: "timetable",
            "Built timetable with {} stops, {} routes, {} trips and {} transfers",
            timetable.num_stops(), timetable.routes.len(), timetable.num_trips(), timetable.transfers.len()
        );

        Ok(timetable)
    }
}

impl TransferProvider for Timetable {
    fn transfers_from(&self, start: StopId) -> &[Transfer] {
        self.transfers.transfers_from(start)
    }

    fn transfers_to(&self, end: StopId) -> &[Transfer] {
        self.transfers.transfers_to(end)
    }
}

impl TransitDataProvider for Timetable {
    fn num_stops(&self) -> usize {
        self.stop_names.len()
    }

    fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn routes_serving(&self, stop: StopId) -> &[RouteId] {
        self.routes_by_stop.get(stop.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    fn stop_cost(&self, stop: StopId) -> Cost {
        self.stop_costs.get(stop.index()).copied().unwrap_or(0)
    }

    fn stop_name(&self, stop: StopId) -> Cow<'_, str> {
        match self.stop_names.get(stop.index()) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(stop.to_string()),
        }
    }
}

/// Programmatic way of writing a [`TimetableData`]. Stops are created the first time they are
/// mentioned; times are parsed when the timetable is built.
#[derive(Debug, Clone, Default)]
pub struct TimetableBuilder {
    stops: Vec<StopData>,
    routes: Vec<RouteData>,
    transfers: Vec<TransferData>,
    raw_times: Vec<Vec<Vec<String>>>,
}

impl TimetableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(mut self, name: &str) -> Self {
        self.ensure_stop(name);
        self
    }

    pub fn stop_cost(mut self, name: &str, seconds: i32) -> Self {
        let idx = self.ensure_stop(name);
        self.stops[idx].cost = Some(seconds);
        self
    }

    /// Starts a new route; following calls to [`Self::trip`] add trips to it
    pub fn route(mut self, name: &str, stops: &[&str]) -> Self {
        for stop in stops {
            self.ensure_stop(stop);
        }
        self.routes.push(RouteData {
            name: name.to_owned(),
            mode: default_mode(),
            stops: stops.iter().map(|s| s.to_string()).collect(),
            no_boarding: vec![],
            no_alighting: vec![],
            trips: vec![],
        });
        self.raw_times.push(vec![]);
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        if let Some(route) = self.routes.last_mut() {
            route.mode = mode.to_owned();
        }
        self
    }

    pub fn no_boarding_at(mut self, pos: usize) -> Self {
        if let Some(route) = self.routes.last_mut() {
            route.no_boarding.push(pos);
        }
        self
    }

    pub fn no_alighting_at(mut self, pos: usize) -> Self {
        if let Some(route) = self.routes.last_mut() {
            route.no_alighting.push(pos);
        }
        self
    }

    pub fn trip(self, times: &[&str]) -> Self {
        self.trip_with_fare(times, 0)
    }

    pub fn trip_with_fare(mut self, times: &[&str], fare: i32) -> Self {
        if let (Some(route), Some(raw)) = (self.routes.last_mut(), self.raw_times.last_mut()) {
            route.trips.push(TripData { id: None, times: vec![], fare });
            raw.push(times.iter().map(|t| t.to_string()).collect());
        }
        self
    }

    pub fn transfer(self, from: &str, to: &str, duration: Time) -> Self {
        self.transfer_with_cost(from, to, duration, duration)
    }

    pub fn transfer_with_cost(mut self, from: &str, to: &str, duration: Time, cost: i32) -> Self {
        self.ensure_stop(from);
        self.ensure_stop(to);
        self.transfers.push(TransferData {
            from: from.to_owned(),
            to: to.to_owned(),
            duration,
            cost: Some(cost),
            both_ways: false,
        });
        self
    }

    pub fn into_data(mut self) -> Result<TimetableData, TimetableError> {
        for (route, raw_trips) in self.routes.iter_mut().zip(self.raw_times) {
            for (trip, raw) in route.trips.iter_mut().zip(raw_trips) {
                trip.times = raw.iter()
                    .map(|t| t.parse::<StopTime>())
                    .collect::<Result<_, _>>()
                    .map_err(|source| TimetableError::Time { route: route.name.clone(), source })?;
            }
        }
        Ok(TimetableData { stops: self.stops, routes: self.routes, transfers: self.transfers })
    }

    pub fn build(self) -> Result<Timetable, TimetableError> {
        Timetable::try_from(self.into_data()?)
    }

    fn ensure_stop(&mut self, name: &str) -> usize {
        match self.stops.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.stops.push(StopData { name: name.to_owned(), cost: None });
                self.stops.len() - 1
            }
        }
    }
}
