use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, LevelFilter};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static MULTI: OnceLock<MultiProgress> = OnceLock::new();

pub fn init(log_level: LevelFilter) {
    let logger = env_logger::builder()
        .filter_level(log_level)
        .parse_default_env() // Allow overriding log level through RUST_LOG env var
        .build();
    let max_level = logger.filter();

    let multi = MULTI.get_or_init(MultiProgress::new).clone();

    // a second init (e.g. from tests) keeps the first logger
    if LogWrapper::new(multi, logger).try_init().is_ok() {
        log::set_max_level(max_level);
    }
}

pub fn run_with_spinner<'a, F, Out>(
    target: &'a str, task_desc: &'a str, function: F,
) -> Out where
    F: FnOnce() -> Out,
{
    let start_time = Instant::now();

    let mut pb = ProgressBar::new_spinner()
        .with_message(format!("{}...", task_desc));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.white} [{elapsed:.green}] {msg}") {
        pb = pb.with_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));

    // Set up connection with log library so that progress bars don't jump around
    let multi = MULTI.get();
    if let Some(multi) = multi {
        multi.add(pb.clone());
    }

    let out = function();

    pb.finish_and_clear();
    if let Some(multi) = multi {
        multi.remove(&pb);
    }
    let elapsed = indicatif::HumanDuration(start_time.elapsed());
    info!(target: target, "{} finished (took {})", task_desc, elapsed);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_returns_result_without_init() {
        let out = run_with_spinner("test", "Adding", || 20 + 22);
        assert_eq!(out, 42);
    }

    #[test]
    fn test_double_init_is_harmless() {
        init(LevelFilter::Warn);
        init(LevelFilter::Debug);
        assert_eq!(run_with_spinner("test", "Noop", || "done"), "done");
    }
}
