//! Environment loading for `ServiceConfig`
//!
//! Unset or blank variables fall back to the builder defaults. A variable
//! that is set but malformed is an error, never silently defaulted.

use std::fmt::Display;
use std::str::FromStr;

use crate::fetcher::FetchBackendKind;

use super::builder::ServiceConfigBuilder;
use super::types::{ConfigError, ServiceConfig};

impl ServiceConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut builder = ServiceConfigBuilder::default();

        if let Some(host) = env.string("API_HOST") {
            builder = builder.api_host(host);
        }
        if let Some(port) = env.parse::<u16>("API_PORT")? {
            builder = builder.api_port(port);
        }

        let defaults = ServiceConfig::default();
        let searxng_host = env
            .string("SEARXNG_HOST")
            .unwrap_or(defaults.searxng_host);
        let searxng_port = env
            .parse::<u16>("SEARXNG_PORT")?
            .unwrap_or(defaults.searxng_port);
        builder = builder.searxng(searxng_host, searxng_port);
        if let Some(path) = env.string("SEARXNG_BASE_PATH") {
            builder = builder.searxng_base_path(path);
        }
        if let Some(language) = env.string("SEARCH_LANGUAGE") {
            builder = builder.search_language(language);
        }
        if let Some(limit) = env.parse::<usize>("DEFAULT_SEARCH_LIMIT")? {
            builder = builder.default_search_limit(limit);
        }
        let enabled = env
            .string("ENABLED_ENGINES")
            .unwrap_or(defaults.enabled_engines);
        let disabled = env
            .string("DISABLED_ENGINES")
            .unwrap_or(defaults.disabled_engines);
        builder = builder.engines(enabled, disabled);

        if let Some(enabled) = env.flag("CACHE_ENABLED")? {
            builder = builder.cache_enabled(enabled);
        }
        if let Some(url) = env.string("REDIS_URL") {
            builder = builder.redis_url(url);
        }
        if let Some(hours) = env.parse::<u64>("CACHE_TTL_HOURS")? {
            builder = builder.cache_ttl_hours(hours);
        }
        if let Some(secs) = env.parse::<u64>("SEARCH_CACHE_TTL_SECS")? {
            builder = builder.search_cache_ttl_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("CACHE_RECHECK_SECS")? {
            builder = builder.cache_recheck_secs(secs);
        }
        if let Some(millis) = env.parse::<u64>("CACHE_TIMEOUT_MS")? {
            builder = builder.cache_timeout_ms(millis);
        }

        if let Some(size) = env.parse::<usize>("POOL_SIZE")? {
            builder = builder.pool_size(size);
        }
        if let Some(secs) = env.parse::<u64>("POOL_ACQUIRE_TIMEOUT_SECS")? {
            builder = builder.pool_acquire_timeout_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("FETCH_TIMEOUT_SECS")? {
            builder = builder.fetch_timeout_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("BATCH_TIMEOUT_SECS")? {
            builder = builder.batch_timeout_secs(secs);
        }
        if let Some(retries) = env.parse::<u8>("FETCH_RETRIES")? {
            builder = builder.fetch_retries(retries);
        }
        if let Some(secs) = env.parse::<u64>("SHUTDOWN_DRAIN_SECS")? {
            builder = builder.shutdown_drain_secs(secs);
        }

        if let Some(threshold) = env.parse::<f64>("CONTENT_FILTER_THRESHOLD")? {
            builder = builder.content_filter_threshold(threshold);
        }
        if let Some(words) = env.parse::<usize>("WORD_COUNT_THRESHOLD")? {
            builder = builder.word_count_threshold(words);
        }
        if let Some(words) = env.parse::<usize>("MIN_WORD_COUNT")? {
            builder = builder.min_word_count(words);
        }

        if let Some(kind) = env.parse::<FetchBackendKind>("FETCH_BACKEND")? {
            builder = builder.fetch_backend(kind);
        }
        let reader_url = env.string("READER_URL").unwrap_or(defaults.reader_url);
        builder = builder.reader(reader_url, env.string("READER_API_KEY"));

        if let Some(headless) = env.flag("HEADLESS")? {
            builder = builder.headless(headless);
        }
        if let Some(level) = env.string("LOG_LEVEL") {
            builder = builder.log_level(level);
        }

        builder.build()
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.string(key)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::Parse {
                    key,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        self.string(key)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Parse {
                    key,
                    value,
                    reason: "expected true/false".to_string(),
                }),
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load(&[]).expect("defaults");
        assert_eq!(config.api_port(), crate::utils::DEFAULT_API_PORT);
        assert_eq!(config.searxng_api_base(), "http://localhost:8080/search");
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("POOL_SIZE", "8"),
            ("CACHE_ENABLED", "false"),
            ("FETCH_BACKEND", "reader"),
            ("SEARXNG_HOST", "searx.internal"),
            ("SEARXNG_PORT", "9000"),
        ])
        .expect("valid overrides");
        assert_eq!(config.pool_size(), 8);
        assert!(!config.cache_enabled());
        assert_eq!(config.fetch_backend(), FetchBackendKind::Reader);
        assert_eq!(config.searxng_api_base(), "http://searx.internal:9000/search");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("POOL_SIZE", "   ")]).expect("blank is unset");
        assert_eq!(config.pool_size(), crate::utils::DEFAULT_POOL_SIZE);
    }

    #[test]
    fn malformed_number_names_the_key() {
        let err = load(&[("POOL_SIZE", "many")]).unwrap_err();
        match err {
            ConfigError::Parse { key, value, .. } => {
                assert_eq!(key, "POOL_SIZE");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_flag_is_rejected() {
        assert!(matches!(
            load(&[("CACHE_ENABLED", "maybe")]),
            Err(ConfigError::Parse { key: "CACHE_ENABLED", .. })
        ));
    }

    #[test]
    fn summary_omits_secrets() {
        let config = load(&[
            ("REDIS_URL", "redis://:hunter2@cache:6379/0"),
            ("READER_API_KEY", "sk-secret"),
        ])
        .unwrap();
        let json = serde_json::to_string(&config.summary()).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("api_base"));
    }
}
