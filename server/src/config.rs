use std::path::PathBuf;
use std::time::Duration;

use timelapse_shared::DenominatorStrategy;
use timelapse_shared::normalize::DEFAULT_QUANTILE;
use timelapse_shared::record::RowPolicy;

pub const DEFAULT_DATASET_PATH: &str = "data/activity.csv";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const DEFAULT_HIGHLIGHT_DAYS: &[&str] = &["2021-01-05", "2021-01-06", "2021-01-07"];
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const CONTROL_CHANNEL_CAPACITY: usize = 16;
pub const COMMAND_TIMEOUT_SECS: u64 = 5;

fn truthy(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

pub fn dataset_path() -> PathBuf {
    std::env::var("DATASET_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH))
}

pub fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn tick_interval() -> Duration {
    std::env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_TICK_INTERVAL_MS))
}

/// `DENOMINATOR_QUANTILE` is a quantile in `(0, 1]`, or `max`.
pub fn denominator_strategy() -> DenominatorStrategy {
    let Ok(raw) = std::env::var("DENOMINATOR_QUANTILE") else {
        return DenominatorStrategy::Quantile(DEFAULT_QUANTILE);
    };
    if raw.trim().eq_ignore_ascii_case("max") {
        return DenominatorStrategy::Max;
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|q| *q > 0.0 && *q <= 1.0)
        .map(DenominatorStrategy::Quantile)
        .unwrap_or(DenominatorStrategy::Quantile(DEFAULT_QUANTILE))
}

pub fn row_policy() -> RowPolicy {
    let skip = std::env::var("SKIP_INVALID_ROWS")
        .map(|value| truthy(&value))
        .unwrap_or(false);
    if skip { RowPolicy::Skip } else { RowPolicy::Abort }
}

pub fn highlight_days() -> Vec<String> {
    let defaults = || -> Vec<String> {
        DEFAULT_HIGHLIGHT_DAYS
            .iter()
            .map(|d| d.to_string())
            .collect()
    };
    let Ok(raw) = std::env::var("HIGHLIGHT_DAYS") else {
        return defaults();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|day| !day.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}
