use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplayConfig {
    /// Access log to replay
    #[serde(default)]
    #[validate(custom = "validate_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1))]
    pub concurrency: usize,

    /// Substrings that exclude a request path from replay
    #[serde(default)]
    pub filters: Vec<String>,

    /// Seconds between throughput reports
    #[serde(default = "default_report_interval")]
    #[validate(range(min = 1))]
    pub report_interval: u64,

    /// Prefix prepended to every extracted path
    #[serde(default)]
    #[validate(custom = "validate_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub keep_cookies: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub suppress_errors: bool,

    /// Loop over the log source until interrupted
    #[serde(default)]
    pub repeat: bool,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// Capacity of the line queue between the pump and the workers
    #[serde(default = "default_queue_size")]
    #[validate(range(min = 1))]
    pub queue_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::new(),
            concurrency: default_concurrency(),
            filters: Vec::new(),
            report_interval: default_report_interval(),
            base_url: String::new(),
            keep_cookies: false,
            verbose: false,
            suppress_errors: false,
            repeat: false,
            timeout_secs: default_timeout(),
            queue_size: default_queue_size(),
        }
    }
}

impl ReplayConfig {
    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Values given on the command line. `None` keeps whatever the file (or the
/// defaults) provided.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_file: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub filters: Option<Vec<String>>,
    pub report_interval: Option<u64>,
    pub base_url: Option<String>,
    pub keep_cookies: bool,
    pub verbose: bool,
    pub suppress_errors: bool,
    pub repeat: bool,
    pub timeout_secs: Option<u64>,
    pub queue_size: Option<usize>,
}

/// One configuration file as written. Keys the file leaves out stay `None`,
/// so a child file can still set a value back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    pub log_file: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub filters: Option<Vec<String>>,
    pub report_interval: Option<u64>,
    pub base_url: Option<String>,
    pub keep_cookies: Option<bool>,
    pub verbose: Option<bool>,
    pub suppress_errors: Option<bool>,
    pub repeat: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub queue_size: Option<usize>,

    /// Optional path to a parent configuration file to inherit from
    pub extends: Option<String>,
}

impl ConfigLayer {
    /// Stacks `self` on top of `parent`. Values set here win; filters are
    /// concatenated parent-first.
    pub fn over(self, parent: ConfigLayer) -> ConfigLayer {
        let filters = match (parent.filters, self.filters) {
            (Some(mut inherited), Some(own)) => {
                inherited.extend(own);
                Some(inherited)
            }
            (inherited, own) => own.or(inherited),
        };

        ConfigLayer {
            log_file: self.log_file.or(parent.log_file),
            concurrency: self.concurrency.or(parent.concurrency),
            filters,
            report_interval: self.report_interval.or(parent.report_interval),
            base_url: self.base_url.or(parent.base_url),
            keep_cookies: self.keep_cookies.or(parent.keep_cookies),
            verbose: self.verbose.or(parent.verbose),
            suppress_errors: self.suppress_errors.or(parent.suppress_errors),
            repeat: self.repeat.or(parent.repeat),
            timeout_secs: self.timeout_secs.or(parent.timeout_secs),
            queue_size: self.queue_size.or(parent.queue_size),
            extends: None,
        }
    }

    pub fn into_config(self) -> ReplayConfig {
        let defaults = ReplayConfig::default();
        ReplayConfig {
            log_file: self.log_file.unwrap_or(defaults.log_file),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            filters: self.filters.unwrap_or(defaults.filters),
            report_interval: self.report_interval.unwrap_or(defaults.report_interval),
            base_url: self.base_url.unwrap_or(defaults.base_url),
            keep_cookies: self.keep_cookies.unwrap_or(defaults.keep_cookies),
            verbose: self.verbose.unwrap_or(defaults.verbose),
            suppress_errors: self.suppress_errors.unwrap_or(defaults.suppress_errors),
            repeat: self.repeat.unwrap_or(defaults.repeat),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            queue_size: self.queue_size.unwrap_or(defaults.queue_size),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_report_interval() -> u64 {
    1
}

fn default_timeout() -> u64 {
    10
}

fn default_queue_size() -> usize {
    1
}

fn validate_log_file(path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::new("log_file_required"));
    }
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ValidationError> {
    if base_url.is_empty() {
        return Ok(());
    }
    url::Url::parse(base_url)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_base_url"))
}
