use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::SkyfeedError;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Content-search provider
    pub search_api_url: String,
    pub search_page_size: u32,

    // Account/data service (optional; absent means anonymous sessions)
    pub engagement_api_url: Option<String>,
    pub engagement_api_token: Option<String>,

    // Scheduling
    pub initial_batch_size: usize,
    pub page_batch_size: usize,
    /// Overrides the built-in partition universe when set.
    pub partitions: Option<Vec<String>>,
    /// Fixed seed for partition sampling. Random when unset.
    pub rng_seed: Option<u64>,

    pub http_timeout: Duration,
    pub fallback_image_url: String,
}

pub const DEFAULT_SEARCH_API_URL: &str = "https://images-api.nasa.gov";
pub const DEFAULT_FALLBACK_IMAGE_URL: &str = "https://images-assets.nasa.gov/image/placeholder.jpg";

impl Default for Config {
    fn default() -> Self {
        Self {
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
            search_page_size: 15,
            engagement_api_url: None,
            engagement_api_token: None,
            initial_batch_size: 8,
            page_batch_size: 4,
            partitions: None,
            rng_seed: None,
            http_timeout: Duration::from_secs(20),
            fallback_image_url: DEFAULT_FALLBACK_IMAGE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, SkyfeedError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SkyfeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            search_api_url: get("SEARCH_API_URL").unwrap_or(defaults.search_api_url),
            search_page_size: parsed(&get, "SEARCH_PAGE_SIZE")?.unwrap_or(defaults.search_page_size),
            engagement_api_url: get("ENGAGEMENT_API_URL"),
            engagement_api_token: get("ENGAGEMENT_API_TOKEN"),
            initial_batch_size: parsed(&get, "INITIAL_BATCH_SIZE")?
                .unwrap_or(defaults.initial_batch_size),
            page_batch_size: parsed(&get, "PAGE_BATCH_SIZE")?.unwrap_or(defaults.page_batch_size),
            partitions: get("SKYFEED_PARTITIONS").map(partition_list).transpose()?,
            rng_seed: parsed(&get, "SKYFEED_RNG_SEED")?,
            http_timeout: parsed(&get, "HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            fallback_image_url: get("FALLBACK_IMAGE_URL").unwrap_or(defaults.fallback_image_url),
        })
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        let token = if self.engagement_api_token.is_some() { "[set]" } else { "(none)" };
        info!(
            search_api_url = self.search_api_url.as_str(),
            search_page_size = self.search_page_size,
            engagement_api_url = self.engagement_api_url.as_deref().unwrap_or("(none)"),
            engagement_api_token = token,
            initial_batch_size = self.initial_batch_size,
            page_batch_size = self.page_batch_size,
            custom_partitions = self.partitions.as_ref().map(Vec::len).unwrap_or(0),
            rng_seed = ?self.rng_seed,
            http_timeout_secs = self.http_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}

/// Comma-separated partition override. Must yield at least one partition.
fn partition_list(raw: String) -> Result<Vec<String>, SkyfeedError> {
    let partitions: Vec<String> = raw
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if partitions.is_empty() {
        return Err(SkyfeedError::Config(format!(
            "SKYFEED_PARTITIONS has no partitions, got {raw:?}"
        )));
    }
    Ok(partitions)
}

fn parsed<T, G>(get: &G, key: &str) -> Result<Option<T>, SkyfeedError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SkyfeedError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.search_api_url, DEFAULT_SEARCH_API_URL);
        assert_eq!(config.search_page_size, 15);
        assert_eq!(config.initial_batch_size, 8);
        assert_eq!(config.page_batch_size, 4);
        assert!(config.engagement_api_url.is_none());
        assert!(config.partitions.is_none());
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("PAGE_BATCH_SIZE", "2"),
            ("SKYFEED_PARTITIONS", "nebula, galaxy,,mars "),
            ("SKYFEED_RNG_SEED", "42"),
            ("HTTP_TIMEOUT_SECS", "3"),
            ("ENGAGEMENT_API_URL", "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(config.page_batch_size, 2);
        assert_eq!(
            config.partitions,
            Some(vec!["nebula".to_string(), "galaxy".to_string(), "mars".to_string()])
        );
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.engagement_api_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn bad_number_is_config_error() {
        let err = Config::from_lookup(lookup(&[("INITIAL_BATCH_SIZE", "eight")])).unwrap_err();
        assert!(matches!(err, SkyfeedError::Config(ref m) if m.contains("INITIAL_BATCH_SIZE")));
    }

    #[test]
    fn blank_partition_list_is_config_error() {
        let err = Config::from_lookup(lookup(&[("SKYFEED_PARTITIONS", " , ,")])).unwrap_err();
        assert!(matches!(err, SkyfeedError::Config(_)), "got {err:?}");
    }
}
