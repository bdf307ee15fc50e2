use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{SyncSettings, TopUpPolicy};
use crate::model::RestrictedZone;
use crate::synth::SynthBands;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub synth: SynthBands,
    #[serde(default)]
    pub topup: TopUpPolicy,
    #[serde(default)]
    pub web: WebConfig,
    /// Initial zone set; used until the zones endpoint (if any) delivers one.
    #[serde(default)]
    pub static_zones: Vec<RestrictedZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Snapshot-fetch endpoint, `{ "drones": [...] }`.
    pub records_url: String,
    /// Zones endpoint, `{ "restricted_zones": [...] }`. Optional; without it
    /// only `static_zones` apply.
    #[serde(default)]
    pub zones_url: Option<String>,
    /// Push channel, `ws://` or `wss://`.
    pub push_url: String,
    #[serde(default = "default_reconnect_delay", deserialize_with = "duration_str")]
    pub reconnect_delay: Duration,
    #[serde(default, deserialize_with = "opt_duration_str")]
    pub zone_refresh: Option<Duration>,
    #[serde(default = "default_request_timeout", deserialize_with = "duration_str")]
    pub request_timeout: Duration,
    #[serde(default = "default_fallback_count")]
    pub bootstrap_fallback_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_fallback_count() -> usize {
    10
}

fn duration_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn opt_duration_str<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !self.feed.push_url.starts_with("ws://") && !self.feed.push_url.starts_with("wss://") {
            return invalid(format!("push_url must be ws:// or wss://: {}", self.feed.push_url));
        }
        if self.feed.reconnect_delay.is_zero() {
            return invalid("reconnect_delay must be non-zero".to_string());
        }
        self.synth.validate().map_err(ConfigError::Invalid)?;
        for zone in &self.static_zones {
            if !(zone.radius_km > 0.0) {
                return invalid(format!(
                    "zone {:?} has non-positive radius {}",
                    zone.name, zone.radius_km
                ));
            }
        }
        Ok(())
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            records_url: self.feed.records_url.clone(),
            zones_url: self.feed.zones_url.clone(),
            push_url: self.feed.push_url.clone(),
            reconnect_delay: self.feed.reconnect_delay,
            zone_refresh: self.feed.zone_refresh,
            bootstrap_fallback_count: self.feed.bootstrap_fallback_count,
            topup: self.topup.clone(),
            static_zones: self.static_zones.clone(),
        }
    }
}
