//! Server configuration, loaded from environment variables with defaults.
//!
//! No config-file format is introduced here (spec.md §1 puts "the on-disk
//! config loader and validation" out of scope as an external collaborator);
//! this module only covers what the translate pipeline itself needs to run.
//! Grounded on the teacher binary's `parse_port_env`/`parse_bool_env`
//! helpers in `bin/clarium_server.rs`.

use std::env;
use std::time::Duration;

/// Runtime knobs for the HTTP server, the parser, and the parse cache.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// spec.md §4.3: default 50.
    pub max_parse_depth: usize,
    /// spec.md §4.3: default 10 000.
    pub max_query_length: usize,
    /// spec.md §4.4: bounded size for the LRU parse cache.
    pub cache_capacity: usize,
    /// spec.md §4.4: time-to-live for a cache entry.
    pub cache_ttl: Duration,
    /// spec.md §5: interval on which the background sweep removes
    /// TTL-expired cache entries.
    pub cache_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 7890,
            max_parse_depth: 50,
            max_query_length: 10_000,
            cache_capacity: 10_000,
            cache_ttl: Duration::from_secs(300),
            cache_sweep_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Build a config from environment variables, falling back to
    /// [`ServerConfig::default`] for anything unset or unparseable.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            http_port: parse_env("RSEARCH_HTTP_PORT").unwrap_or(default.http_port),
            max_parse_depth: parse_env("RSEARCH_MAX_PARSE_DEPTH").unwrap_or(default.max_parse_depth),
            max_query_length: parse_env("RSEARCH_MAX_QUERY_LENGTH").unwrap_or(default.max_query_length),
            cache_capacity: parse_env("RSEARCH_CACHE_CAPACITY").unwrap_or(default.cache_capacity),
            cache_ttl: parse_env("RSEARCH_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.cache_ttl),
            cache_sweep_interval: parse_env("RSEARCH_CACHE_SWEEP_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.cache_sweep_interval),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
