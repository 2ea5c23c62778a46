use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Log output format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// General settings, applying to the whole gateway.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// Number of backend shards.
    ///
    /// _Default:_ `1`
    #[serde(default = "General::shards")]
    pub shards: usize,

    /// Target string used when a session doesn't provide one.
    ///
    /// _Default:_ `@primary`
    #[serde(default = "General::default_target")]
    pub default_target: String,

    /// Maximum amount of time, in milliseconds, a single execution
    /// may take, including waiting on all shards. `0` disables the limit.
    ///
    /// _Default:_ `0`
    #[serde(default = "General::query_timeout_ms")]
    pub query_timeout: u64,

    /// Record scatter query statistics.
    ///
    /// _Default:_ `true`
    #[serde(default = "General::scatter_stats")]
    pub scatter_stats: bool,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Default log level, overridden by `RUST_LOG`.
    ///
    /// _Default:_ `info`
    #[serde(default = "General::log_level")]
    pub log_level: String,

    /// Port for the statistics HTTP endpoint. Disabled if not set.
    #[serde(default = "General::stats_port")]
    pub stats_port: Option<u16>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            shards: Self::shards(),
            default_target: Self::default_target(),
            query_timeout: Self::query_timeout_ms(),
            scatter_stats: Self::scatter_stats(),
            log_format: LogFormat::default(),
            log_level: Self::log_level(),
            stats_port: Self::stats_port(),
        }
    }
}

impl General {
    fn env_or_default<T: std::str::FromStr>(env_var: &str, default: T) -> T {
        env::var(env_var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn env_string_or_default(env_var: &str, default: &str) -> String {
        env::var(env_var).unwrap_or_else(|_| default.to_string())
    }

    fn env_bool_or_default(env_var: &str, default: bool) -> bool {
        env::var(env_var)
            .ok()
            .and_then(|v| match v.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn shards() -> usize {
        Self::env_or_default("SHARDGATE_SHARDS", 1)
    }

    fn default_target() -> String {
        Self::env_string_or_default("SHARDGATE_DEFAULT_TARGET", "@primary")
    }

    fn query_timeout_ms() -> u64 {
        Self::env_or_default("SHARDGATE_QUERY_TIMEOUT", 0)
    }

    fn scatter_stats() -> bool {
        Self::env_bool_or_default("SHARDGATE_SCATTER_STATS", true)
    }

    fn log_level() -> String {
        Self::env_string_or_default("SHARDGATE_LOG_LEVEL", "info")
    }

    fn stats_port() -> Option<u16> {
        env::var("SHARDGATE_STATS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
    }

    /// Execution time limit, if any.
    pub fn query_timeout(&self) -> Option<Duration> {
        if self.query_timeout == 0 {
            None
        } else {
            Some(Duration::from_millis(self.query_timeout))
        }
    }
}
