pub mod bootstrap_config;
mod config;

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use bootstrap_config::BootstrapConfig;
use chrono::NaiveDate;
use common::util::logging;
use common::util::logging::run_with_spinner;
use common::util::time::to_date_time;
use config::{load_config, load_timetable, Config, ConfigError, LoadTimetableError, QueryConfig, QueryConfigError};
use log::{debug, error, info, warn};
use routing::algorithms::errors::{QueryError, QueryResult};
use routing::algorithms::queries::range::RaptorResponse;
use routing::raptor::RaptorService;
use routing::transit::timetable::Timetable;
use serde::Serialize;

fn main() {
    let _ = run()
        .inspect_err(|err| error!(target: "main", "{}", err));
}

fn run() -> Result<(), TramlineError> {
    let bootstrap_config = BootstrapConfig::read();

    logging::init(bootstrap_config.log_level);
    print_startup_message();

    let config = load_config(&bootstrap_config)?;
    let Config::Version1 { timetable, routing, output, service_day, queries } = config;
    let queries = select_queries(&bootstrap_config, queries);

    let timetable = run_with_spinner("main", "Loading timetable", || {
        load_timetable(&bootstrap_config.config_file, &timetable)
    })?;
    let service = RaptorService::new(&timetable, routing)?;
    let requests = queries.iter()
        .map(|query| query.to_request(&timetable))
        .collect::<Result<Vec<_>, _>>()?;

    let results = run_with_spinner("main", "Routing", || service.route_all(&requests));
    let reports: Vec<QueryReport> = queries.iter()
        .zip(results)
        .map(|(query, result)| QueryReport::new(&query.name, result, &timetable, service_day))
        .collect();

    let output = bootstrap_config.output.or(output);
    write_reports(&reports, output.as_deref())?;

    Ok(())
}

fn select_queries(bootstrap_config: &BootstrapConfig, queries: Vec<QueryConfig>) -> Vec<QueryConfig> {
    for name in &bootstrap_config.queries {
        if !queries.iter().any(|query| &query.name == name) {
            warn!(target: "main", "No query named '{}' in the config", name);
        }
    }
    queries.into_iter().filter(|query| bootstrap_config.selects(&query.name)).collect()
}

fn print_startup_message() {
    info!("\n  t r a m l i n e\n  transit routing\n");
}

/// Result of one configured query, as written to the output
#[derive(Serialize, Debug)]
struct QueryReport<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<RaptorResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<QueryError>,
}

impl<'a> QueryReport<'a> {
    fn new(
        name: &'a str,
        result: QueryResult<RaptorResponse>,
        timetable: &Timetable,
        service_day: Option<NaiveDate>,
    ) -> Self {
        match result {
            Ok(response) => {
                info!(target: "main", "Query '{}': {} paths", name, response.paths.len());
                for path in &response.paths {
                    if let Some(day) = service_day {
                        info!(
                            target: "main",
                            "  {} -> {}",
                            to_date_time(day, path.start_time),
                            to_date_time(day, path.end_time)
                        );
                    }
                    debug!(target: "main", "{}", path.display_with(timetable));
                }
                Self { name, response: Some(response), error: None }
            }
            Err(err) => {
                warn!(target: "main", "Query '{}' failed: {}", name, err);
                Self { name, response: None, error: Some(err) }
            }
        }
    }
}

fn write_reports(reports: &[QueryReport], output: Option<&Path>) -> Result<(), TramlineError> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, reports)?;
            info!(target: "main", "Results written to '{path:?}'");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, reports)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum TramlineError {
    Config(#[from] ConfigError),
    Timetable(#[from] LoadTimetableError),
    QueryConfig(#[from] QueryConfigError),
    Query(#[from] QueryError),
    Json(#[from] serde_json::Error),
    IO(#[from] std::io::Error),
}

impl Display for TramlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let err: &dyn Display = match self {
            TramlineError::Config(err) => err,
            TramlineError::Timetable(err) => err,
            TramlineError::QueryConfig(err) => err,
            TramlineError::Query(err) => err,
            TramlineError::Json(err) => err,
            TramlineError::IO(err) => err,
        };
        let prefix = match self {
            TramlineError::Config(_) => "Reading config file",
            TramlineError::Timetable(_) => "Loading timetable",
            TramlineError::QueryConfig(_) => "Reading queries",
            TramlineError::Query(_) => "Preparing routing",
            TramlineError::Json(_) => "Writing results",
            TramlineError::IO(_) => "Error during IO",
        };
        write!(f, "{}: {}", prefix, err)
    }
}
