// src/config/mod.rs
//! Deployment configuration: one target city, one brand, one schedule.

pub mod ai;

pub use ai::AiConfig;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

/// Longest accepted aggregation interval (one year).
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            city: "Tel Aviv Yafo".to_string(),
            latitude: 32.0853,
            longitude: 34.7818,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    pub name: String,
    pub search_query: String,
    pub search_limit: u32,
    /// Reddit sort order: "new" | "hot" | "relevance" | "top"
    pub search_sort: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: "Gymshark".to_string(),
            search_query: "gymshark".to_string(),
            search_limit: 10,
            search_sort: "new".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 8 * 3600,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/aggregator.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 4,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub brand: BrandConfig,
    pub ai: AiConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load from an explicit TOML file, then apply env overrides.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Some(v) = env_str("TARGET_CITY") {
            self.target.city = v;
        }
        if let Some(v) = env_parse::<f64>("TARGET_LATITUDE")? {
            self.target.latitude = v;
        }
        if let Some(v) = env_parse::<f64>("TARGET_LONGITUDE")? {
            self.target.longitude = v;
        }
        if let Some(v) = env_str("BRAND_NAME") {
            self.brand.name = v;
        }
        if let Some(v) = env_str("SOCIAL_SEARCH_QUERY") {
            self.brand.search_query = v;
        }
        if let Some(v) = env_str("AI_PROVIDER") {
            self.ai.provider = v;
        }
        if let Some(v) = env_str("AI_MODEL") {
            self.ai.model = Some(v);
        }
        if let Some(v) = env_parse::<u64>("AGGREGATION_INTERVAL_SECS")? {
            self.schedule.interval_secs = v;
        }
        if let Some(v) = env_str("DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(v);
        }
        Ok(())
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(Error::Configuration(msg.to_string()));
        if self.target.city.trim().is_empty() {
            return bad("target.city must not be empty");
        }
        if !(-90.0..=90.0).contains(&self.target.latitude) {
            return bad("target.latitude must be within -90..=90");
        }
        if !(-180.0..=180.0).contains(&self.target.longitude) {
            return bad("target.longitude must be within -180..=180");
        }
        if self.brand.name.trim().is_empty() || self.brand.search_query.trim().is_empty() {
            return bad("brand.name and brand.search_query must not be empty");
        }
        if !(1..=100).contains(&self.brand.search_limit) {
            return bad("brand.search_limit must be within 1..=100");
        }
        if self.schedule.interval_secs == 0 {
            return bad("schedule.interval_secs must be positive");
        }
        if self.schedule.interval_secs > MAX_INTERVAL_SECS {
            return bad("schedule.interval_secs must not exceed one year");
        }
        if self.http.timeout_secs == 0 {
            return bad("http.timeout_secs must be positive");
        }
        Ok(())
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_str(key) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key}={v}: {e}")),
        None => Ok(None),
    }
}
