//! Configuration for the jockey form pipeline.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Replace an existing ride with the same (date, horse, race number)
    /// instead of appending a duplicate
    #[serde(default = "default_true")]
    pub dedup: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            dedup: true,
        }
    }
}

/// Crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URLs; empty means the per-state calendar pages for the mode
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    /// Maximum requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub follow_pagination: bool,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_min_delay_secs() -> f64 {
    0.5
}

fn default_max_delay_secs() -> f64 {
    1.5
}

fn default_concurrency() -> usize {
    3
}

fn default_max_pages() -> usize {
    200
}

fn default_max_depth() -> usize {
    2
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            requests_per_minute: default_requests_per_minute(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            concurrency: default_concurrency(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            follow_pagination: false,
        }
    }
}

/// Derived statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Number of most recent rides in `recentForm`
    #[serde(default = "default_form_window")]
    pub form_window: usize,
    /// Finishing positions up to this count as a place
    #[serde(default = "default_place_cutoff")]
    pub place_cutoff: u32,
    /// Shrink the place cutoff for small fields
    #[serde(default)]
    pub scale_places_by_field_size: bool,
}

fn default_form_window() -> usize {
    5
}

fn default_place_cutoff() -> u32 {
    3
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            form_window: default_form_window(),
            place_cutoff: default_place_cutoff(),
            scale_places_by_field_size: false,
        }
    }
}

/// Hot-form and due-for-win thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_hot_min_win_rate")]
    pub hot_min_win_rate: f64,
    #[serde(default = "default_hot_min_place_rate")]
    pub hot_min_place_rate: f64,
    #[serde(default = "default_hot_max_days_since_win")]
    pub hot_max_days_since_win: i64,
    #[serde(default = "default_hot_min_win_streak")]
    pub hot_min_win_streak: u32,
    #[serde(default = "default_due_min_days_since_win")]
    pub due_min_days_since_win: i64,
    #[serde(default = "default_due_min_place_rate")]
    pub due_min_place_rate: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Length of each list in the roster summary
    #[serde(default = "default_summary_top_n")]
    pub summary_top_n: usize,
}

fn default_hot_min_win_rate() -> f64 {
    0.2
}

fn default_hot_min_place_rate() -> f64 {
    0.5
}

fn default_hot_max_days_since_win() -> i64 {
    7
}

fn default_hot_min_win_streak() -> u32 {
    2
}

fn default_due_min_days_since_win() -> i64 {
    10
}

fn default_due_min_place_rate() -> f64 {
    0.2
}

fn default_max_results() -> usize {
    100
}

fn default_summary_top_n() -> usize {
    10
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            hot_min_win_rate: default_hot_min_win_rate(),
            hot_min_place_rate: default_hot_min_place_rate(),
            hot_max_days_since_win: default_hot_max_days_since_win(),
            hot_min_win_streak: default_hot_min_win_streak(),
            due_min_days_since_win: default_due_min_days_since_win(),
            due_min_place_rate: default_due_min_place_rate(),
            max_results: default_max_results(),
            summary_top_n: default_summary_top_n(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// IANA name of the timezone "today" is computed in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Australia/Sydney".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            crawler: CrawlerConfig::default(),
            stats: StatsConfig::default(),
            classification: ClassificationConfig::default(),
            timezone: default_timezone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, a config file and the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?);

        // Explicit file must exist; the implicit one is optional
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        let config = builder
            // Override with environment variables (FORM_STORAGE__DATA_DIR, etc.)
            .add_source(
                config::Environment::with_prefix("FORM")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("crawler.seeds")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.timezone()?;
        Ok(config)
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {}", self.timezone, e))
    }

    /// Today's calendar date in the configured timezone
    pub fn today(&self) -> anyhow::Result<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.timezone()?).date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.storage.dedup);
        assert_eq!(config.stats.form_window, 5);
        assert_eq!(config.stats.place_cutoff, 3);
        assert_eq!(config.classification.max_results, 100);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Australia::Sydney);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.toml");
        std::fs::write(
            &path,
            r#"
timezone = "Australia/Perth"

[storage]
data_dir = "/tmp/form-data"
dedup = false

[classification]
max_results = 25
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/form-data"));
        assert!(!config.storage.dedup);
        assert_eq!(config.classification.max_results, 25);
        assert_eq!(config.classification.summary_top_n, 10);
        assert_eq!(config.crawler.concurrency, 3);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Australia::Perth);
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(config.timezone().is_err());
        assert!(config.today().is_err());
    }
}
