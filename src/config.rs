use std::path::PathBuf;
use std::time::Duration;

const WAL_FILE_NAME: &str = "tablebook.wal";

/// Process configuration, built once at startup and handed to constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Compact once this many events were appended since the last compaction.
    pub compact_threshold: u64,
    pub compact_interval: Duration,
    pub request_timeout: Duration,
    /// Prometheus exporter port; `None` disables the exporter.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8010,
            data_dir: PathBuf::from("./data"),
            compact_threshold: 1000,
            compact_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Read `TABLEBOOK_*` variables; unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|s| s.trim().parse().ok())
        }

        let defaults = Self::default();
        Self {
            bind: lookup("TABLEBOOK_BIND").unwrap_or(defaults.bind),
            port: parsed(lookup("TABLEBOOK_PORT")).unwrap_or(defaults.port),
            data_dir: lookup("TABLEBOOK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            compact_threshold: parsed(lookup("TABLEBOOK_COMPACT_THRESHOLD"))
                .unwrap_or(defaults.compact_threshold),
            compact_interval: parsed(lookup("TABLEBOOK_COMPACT_INTERVAL_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.compact_interval),
            request_timeout: parsed(lookup("TABLEBOOK_REQUEST_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            metrics_port: parsed(lookup("TABLEBOOK_METRICS_PORT")),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
