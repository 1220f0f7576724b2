//! Data access layer configuration.

use crate::error::{DalError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Page size used when draining a scroll.
pub const DEFAULT_SCROLL_BATCH_SIZE: u64 = 10_000;

/// Server-side lifetime of a scroll cursor between two advances.
pub const DEFAULT_SCROLL_EXPIRY: &str = "1m";

/// Upper bound on non-empty batches fetched by one exhaustive search.
pub const DEFAULT_MAX_SCROLL_BATCHES: usize = 100_000;

/// Connection and behaviour settings.
#[derive(Debug, Clone)]
pub struct QuarryConfig {
    /// Engine URL(s). Only the first one is used by the single-node transport.
    pub urls: Vec<String>,
    /// Index every operation targets.
    pub index: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Default scroll expiry for exhaustive searches.
    pub scroll_expiry: String,
    /// Page size of every scroll batch.
    pub scroll_batch_size: u64,
    /// Safety cap on scroll iterations.
    pub max_scroll_batches: usize,
    /// Overall deadline for one exhaustive search.
    pub scroll_timeout: Option<Duration>,
}

impl QuarryConfig {
    /// Configuration for a single node and index.
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            index: index.into(),
            ..Self::default()
        }
    }

    /// Load configuration from `QUARRY_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// `QUARRY_URL` and `QUARRY_INDEX` fall back to the defaults; numeric
    /// variables that do not parse are rejected.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(url) = var("URL") {
            config.urls = url
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
        }
        if let Some(index) = var("INDEX") {
            config.index = index;
        }
        config.username = var("USERNAME");
        config.password = var("PASSWORD");
        if let Some(secs) = parsed_var::<u64>("REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(expiry) = var("SCROLL_EXPIRY") {
            config.scroll_expiry = expiry;
        }
        if let Some(size) = parsed_var("SCROLL_BATCH_SIZE")? {
            config.scroll_batch_size = size;
        }
        if let Some(max) = parsed_var("MAX_SCROLL_BATCHES")? {
            config.max_scroll_batches = max;
        }
        if let Some(secs) = parsed_var::<u64>("SCROLL_TIMEOUT_SECS")? {
            config.scroll_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the target index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the default scroll expiry, e.g. `"5m"`.
    pub fn with_scroll_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.scroll_expiry = expiry.into();
        self
    }

    /// Set the scroll page size.
    pub fn with_scroll_batch_size(mut self, size: u64) -> Self {
        self.scroll_batch_size = size;
        self
    }

    /// Set the scroll iteration cap.
    pub fn with_max_scroll_batches(mut self, max: usize) -> Self {
        self.max_scroll_batches = max;
        self
    }

    /// Bound the wall-clock duration of an exhaustive search.
    pub fn with_scroll_timeout(mut self, timeout: Duration) -> Self {
        self.scroll_timeout = Some(timeout);
        self
    }

    /// Reject settings no operation could work with.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(DalError::InvalidArgument("no URLs provided".to_string()));
        }
        if self.index.trim().is_empty() {
            return Err(DalError::InvalidArgument("index name is empty".to_string()));
        }
        if self.scroll_batch_size == 0 {
            return Err(DalError::InvalidArgument(
                "scroll batch size must be positive".to_string(),
            ));
        }
        if self.max_scroll_batches == 0 {
            return Err(DalError::InvalidArgument(
                "max scroll batches must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            urls: vec!["http://localhost:9200".to_string()],
            index: "quarry".to_string(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
            scroll_expiry: DEFAULT_SCROLL_EXPIRY.to_string(),
            scroll_batch_size: DEFAULT_SCROLL_BATCH_SIZE,
            max_scroll_batches: DEFAULT_MAX_SCROLL_BATCHES,
            scroll_timeout: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(format!("QUARRY_{}", key))
        .ok()
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match var(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            DalError::InvalidArgument(format!("QUARRY_{} is not a valid number: {}", key, raw))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QuarryConfig::default();
        assert_eq!(config.scroll_expiry, "1m");
        assert_eq!(config.scroll_batch_size, 10_000);
        assert!(config.scroll_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = QuarryConfig::new("http://es:9200", "users")
            .with_basic_auth("elastic", "secret")
            .with_scroll_expiry("5m")
            .with_scroll_batch_size(500)
            .with_scroll_timeout(Duration::from_secs(60));

        assert_eq!(config.urls, vec!["http://es:9200".to_string()]);
        assert_eq!(config.index, "users");
        assert_eq!(config.username.as_deref(), Some("elastic"));
        assert_eq!(config.scroll_expiry, "5m");
        assert_eq!(config.scroll_batch_size, 500);
        assert_eq!(config.scroll_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let empty_index = QuarryConfig::new("http://es:9200", " ");
        assert!(matches!(
            empty_index.validate(),
            Err(DalError::InvalidArgument(_))
        ));

        let zero_batch = QuarryConfig::default().with_scroll_batch_size(0);
        assert!(zero_batch.validate().is_err());

        let no_urls = QuarryConfig {
            urls: Vec::new(),
            ..QuarryConfig::default()
        };
        assert!(no_urls.validate().is_err());
    }

    #[test]
    fn test_missing_env_var_is_none() {
        assert!(var("NONEXISTENT_SETTING_31337").is_none());
        assert!(parsed_var::<u64>("NONEXISTENT_SETTING_31337").unwrap().is_none());
    }
}
