use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Routes the queries of a config file against its timetable
#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct BootstrapConfig {
    #[clap(short('c'), long("config"), env("TRAMLINE_CONFIG"), default_value = "config.yaml")]
    pub config_file: PathBuf,
    /// off, error, warn, info, debug or trace
    #[clap(short('l'), long("log-level"), env("TRAMLINE_LOG_LEVEL"), default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
    /// Writes the results to this file instead of the one named in the config
    #[clap(short('o'), long("output"), env("TRAMLINE_OUTPUT"))]
    pub output: Option<PathBuf>,
    /// Only routes the queries with these names
    #[clap(short('q'), long("query"))]
    pub queries: Vec<String>,
}

impl BootstrapConfig {
    pub fn read() -> Self {
        BootstrapConfig::parse()
    }

    pub fn selects(&self, query: &str) -> bool {
        self.queries.is_empty() || self.queries.iter().any(|name| name == query)
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value.parse().map_err(|_| format!("unknown log level '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::parse_from(["tramline"]);
        assert_eq!(config.config_file, PathBuf::from("config.yaml"));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.output, None);
        assert!(config.selects("anything"));
    }

    #[test]
    fn test_arguments() {
        let config = BootstrapConfig::parse_from([
            "tramline", "-c", "other.yaml", "-l", "DEBUG", "-o", "out.json", "-q", "morning", "-q", "evening",
        ]);
        assert_eq!(config.config_file, PathBuf::from("other.yaml"));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
        assert!(config.selects("evening"));
        assert!(!config.selects("night"));
    }

    #[test]
    fn test_unknown_log_level() {
        assert!(BootstrapConfig::try_parse_from(["tramline", "-l", "loud"]).is_err());
    }
}
