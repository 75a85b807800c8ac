use std::path::PathBuf;
use std::time::Duration;

/// Process settings, read from `BUNKHOUSE_*` environment variables.
/// Unset or unparsable values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// Journal appends after which the compactor rewrites the log.
    pub compact_threshold: u64,
    pub reconcile_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            compact_threshold: 1000,
            reconcile_interval: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            data_dir: lookup("BUNKHOUSE_DATA_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: lookup("BUNKHOUSE_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            compact_threshold: parsed("BUNKHOUSE_COMPACT_THRESHOLD")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.compact_threshold),
            reconcile_interval: parsed("BUNKHOUSE_RECONCILE_INTERVAL_SECS")
                .filter(|&n| n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_interval),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("bunkhouse.wal")
    }
}
