use std::fmt;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use common::types::errors::UnknownStopNameError;
use common::types::{Cost, Time};
use common::util::time::{parse_time, TimeParseError};
use log::info;
use routing::algorithms::queries::range::{Profile, RaptorRequest, SearchDirection};
use routing::raptor::c2::{C2Calculator, TripFareC2};
use routing::raptor::config::RaptorConfig;
use routing::transit::access_egress::AccessEgress;
use routing::transit::timetable::{Timetable, TimetableData, TimetableError};
use serde::Deserialize;

use crate::bootstrap_config::BootstrapConfig;

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1")]
    Version1 {
        /// YAML timetable, relative to the config file
        timetable: PathBuf,
        #[serde(default)]
        routing: RaptorConfig,
        /// JSON results are written to stdout if unset
        #[serde(default)]
        output: Option<PathBuf>,
        /// Day the timetable runs on, only used to print absolute times
        #[serde(default)]
        service_day: Option<NaiveDate>,
        #[serde(default)]
        queries: Vec<QueryConfig>,
    },
}

/// A routing request referring to stops by name
#[derive(Deserialize, Debug, Clone)]
pub struct QueryConfig {
    pub name: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub direction: SearchDirection,
    #[serde(default)]
    pub depart_after: Option<String>,
    #[serde(default)]
    pub arrive_by: Option<String>,
    /// seconds
    #[serde(default)]
    pub search_window: Option<Time>,
    pub access: Vec<LegConfig>,
    pub egress: Vec<LegConfig>,
    #[serde(default)]
    pub max_transfers: Option<usize>,
    #[serde(default)]
    pub extra_transfers: Option<usize>,
    /// Keeps cheaper paths alongside faster ones, comparing the summed trip fares
    #[serde(default)]
    pub fare_c2: bool,
    #[serde(default)]
    pub pass_through: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LegConfig {
    pub stop: String,
    /// seconds
    #[serde(default)]
    pub duration: Time,
    #[serde(default)]
    pub c1: Option<Cost>,
    #[serde(default)]
    pub rides: usize,
    #[serde(default)]
    pub opens: Option<String>,
    #[serde(default)]
    pub closes: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    Io(#[from] std::io::Error),
    Yaml(#[from] serde_yml::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "{}", err),
            ConfigError::Yaml(err) => write!(f, "invalid YAML: {}", err),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryConfigError {
    UnknownStop { query: String, source: UnknownStopNameError },
    Time { query: String, source: TimeParseError },
}

impl Display for QueryConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryConfigError::UnknownStop { query, source } => write!(f, "query '{}': {}", query, source),
            QueryConfigError::Time { query, source } => write!(f, "query '{}': {}", query, source),
        }
    }
}

pub(super) fn load_config(bootstrap_config: &BootstrapConfig) -> Result<Config, ConfigError> {
    let path = bootstrap_config.config_file.as_path();

    let config_file = File::open(path)?;
    let config: Config = serde_yml::from_reader(config_file)?;

    info!(target: "main", "Config read successfully from '{path:?}'");

    Ok(config)
}

#[derive(thiserror::Error, Debug)]
pub enum LoadTimetableError {
    Config(#[from] ConfigError),
    Timetable(#[from] TimetableError),
}

impl Display for LoadTimetableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadTimetableError::Config(err) => write!(f, "{}", err),
            LoadTimetableError::Timetable(err) => write!(f, "{}", err),
        }
    }
}

/// Reads the timetable, resolving `path` against the directory of the config file
pub(super) fn load_timetable(config_file: &Path, path: &Path) -> Result<Timetable, LoadTimetableError> {
    let path = match config_file.parent() {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    };
    let file = File::open(&path).map_err(ConfigError::from)?;
    let data: TimetableData = serde_yml::from_reader(file).map_err(ConfigError::from)?;
    let timetable = Timetable::try_from(data)?;

    info!(target: "main", "Timetable with {} stops and {} trips read from '{path:?}'", timetable.stop_names().len(), timetable.num_trips());

    Ok(timetable)
}

impl QueryConfig {
    pub fn to_request(&self, timetable: &Timetable) -> Result<RaptorRequest, QueryConfigError> {
        let time = |value: &Option<String>| -> Result<Option<Time>, QueryConfigError> {
            value.as_deref()
                .map(parse_time)
                .transpose()
                .map_err(|source| QueryConfigError::Time { query: self.name.clone(), source })
        };
        let stop = |name: &str| {
            timetable.stop_id(name)
                .map_err(|source| QueryConfigError::UnknownStop { query: self.name.clone(), source })
        };
        let legs = |legs: &[LegConfig]| -> Result<Vec<AccessEgress>, QueryConfigError> {
            legs.iter()
                .map(|leg| {
                    let mut access_egress = AccessEgress::flex(stop(&leg.stop)?, leg.duration, leg.rides);
                    if let Some(c1) = leg.c1 {
                        access_egress = access_egress.with_c1(c1);
                    }
                    if let (Some(open), Some(close)) = (time(&leg.opens)?, time(&leg.closes)?) {
                        access_egress = access_egress.with_opening_hours(open, close);
                    }
                    Ok(access_egress)
                })
                .collect()
        };

        Ok(RaptorRequest {
            profile: self.profile,
            direction: self.direction,
            earliest_departure: time(&self.depart_after)?,
            latest_arrival: time(&self.arrive_by)?,
            search_window: self.search_window,
            access: legs(&self.access)?,
            egress: legs(&self.egress)?,
            max_transfers: self.max_transfers,
            extra_transfers: self.extra_transfers,
            use_c2: self.fare_c2,
            c2_calculator: self.fare_c2.then(|| Arc::new(TripFareC2) as Arc<dyn C2Calculator>),
            pass_through_points: self.pass_through.iter().map(|name| stop(name)).collect::<Result<_, _>>()?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use routing::raptor::config::SlackConfig;
    use routing::transit::timetable::TimetableBuilder;
    use tempfile::NamedTempFile;

    use super::*;

    const CONFIG: &str = r#"
version: "1"
timetable: network.yaml
service_day: 2024-03-31
routing:
  slack:
    board_slack: 30
queries:
  - name: morning
    depart_after: "10:00"
    access: [{ stop: A, duration: 60 }]
    egress: [{ stop: C }]
  - name: evening
    profile: multi_criteria
    direction: reverse
    arrive_by: "18:30"
    search_window: 1800
    access: [{ stop: A, duration: 120, rides: 1, opens: "06:00", closes: "20:00" }]
    egress: [{ stop: C, duration: 60, c1: 9000 }]
    fare_c2: true
    pass_through: [B]
"#;

    fn timetable() -> Timetable {
        TimetableBuilder::new()
            .route("L1", &["A", "B", "C"])
            .trip(&["10:00", "10:05", "10:15"])
            .build()
            .unwrap()
    }

    fn bootstrap(path: &Path) -> BootstrapConfig {
        BootstrapConfig {
            config_file: path.to_path_buf(),
            log_level: log::LevelFilter::Info,
            output: None,
            queries: vec![],
        }
    }

    fn config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = config(CONFIG);
        let Config::Version1 { timetable, routing, output, service_day, queries } =
            load_config(&bootstrap(file.path())).unwrap();

        assert_eq!(timetable, PathBuf::from("network.yaml"));
        assert_eq!(routing.slack, SlackConfig { board_slack: 30, ..SlackConfig::default() });
        assert_eq!(output, None);
        assert_eq!(service_day, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].profile, Profile::MultiCriteria);
        assert_eq!(queries[1].direction, SearchDirection::Reverse);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let file = config("version: \"2\"\ntimetable: network.yaml\n");
        assert!(matches!(load_config(&bootstrap(file.path())), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&bootstrap(&dir.path().join("missing.yaml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_timetable_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let data = TimetableBuilder::new()
            .route("L1", &["A", "B"])
            .trip(&["10:00", "10:10"])
            .into_data()
            .unwrap();
        let file = File::create(dir.path().join("network.yaml")).unwrap();
        serde_yml::to_writer(file, &data).unwrap();

        let timetable = load_timetable(&dir.path().join("config.yaml"), Path::new("network.yaml")).unwrap();
        assert_eq!(timetable.stop_names(), &["A".to_owned(), "B".to_owned()]);
        assert_eq!(timetable.num_trips(), 1);
    }

    #[test]
    fn test_queries_to_requests() {
        let file = config(CONFIG);
        let Config::Version1 { queries, .. } = load_config(&bootstrap(file.path())).unwrap();
        let tt = timetable();

        let morning = queries[0].to_request(&tt).unwrap();
        assert_eq!(morning.earliest_departure, Some(36_000));
        assert_eq!(morning.latest_arrival, None);
        assert_eq!(morning.access, vec![AccessEgress::walk(tt.stop_id("A").unwrap(), 60)]);
        assert_eq!(morning.egress, vec![AccessEgress::walk(tt.stop_id("C").unwrap(), 0)]);
        assert!(!morning.use_c2);
        assert!(morning.c2_calculator.is_none());

        let evening = queries[1].to_request(&tt).unwrap();
        assert_eq!(evening.latest_arrival, Some(66_600));
        assert_eq!(evening.search_window, Some(1800));
        assert_eq!(evening.access[0].rides, 1);
        assert_eq!(evening.access[0].opening_hours.map(|hours| (hours.open, hours.close)), Some((21_600, 72_000)));
        assert_eq!(evening.egress[0].c1, 9000);
        assert!(evening.use_c2);
        assert!(evening.c2_calculator.is_some());
        assert_eq!(evening.pass_through_points, vec![tt.stop_id("B").unwrap()]);
    }

    #[test]
    fn test_query_with_unknown_stop() {
        let query = QueryConfig {
            name: "lost".to_owned(),
            profile: Profile::Standard,
            direction: SearchDirection::Forward,
            depart_after: Some("10:00".to_owned()),
            arrive_by: None,
            search_window: None,
            access: vec![LegConfig { stop: "X".to_owned(), duration: 0, c1: None, rides: 0, opens: None, closes: None }],
            egress: vec![],
            max_transfers: None,
            extra_transfers: None,
            fare_c2: false,
            pass_through: vec![],
        };
        let err = query.to_request(&timetable()).unwrap_err();
        assert_eq!(err.to_string(), "query 'lost': Unknown stop name 'X'");
    }
}
