// src/config/app.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::alerts::AlertThresholds;
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::source_weights::SourceWeights;

pub const ENV_CONFIG_PATH: &str = "RATING_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// Values that say "read me from the environment".
const ENV_MARKER: &str = "env";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source → weight. Only sources listed here are queried.
    pub weights: SourceWeights,
    pub credentials: Credentials,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub yahoo: YahooConfig,
    pub alerts: AlertThresholds,
    pub smtp: Option<SmtpConfig>,
    pub batch: BatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            weights: SourceWeights::default_seed(),
            credentials: Credentials::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            yahoo: YahooConfig::default(),
            alerts: AlertThresholds::default(),
            smtp: None,
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// `"ENV"` means: read from `TIPRANKS_API_KEY`.
    pub tipranks_api_key: Option<String>,
    /// `"ENV"` means: read from `POLYGON_API_KEY`.
    pub polygon_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-adapter budget; a slower provider counts as unavailable.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    /// Mirror `recommendationMean` so that 5 = strong buy.
    pub invert_scale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    /// `"ENV"` means: read from `SMTP_PASS`.
    pub password: String,
    pub from: String,
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub tickers: Vec<String>,
    pub output: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["AAPL".into(), "MSFT".into(), "GOOGL".into()],
            output: PathBuf::from("data/updated_stocks.csv"),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path (TOML, or JSON by extension) and resolve
    /// `"ENV"` placeholders.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut cfg: AppConfig = if is_json {
            serde_json::from_str(&content).context("parsing config json")?
        } else {
            toml::from_str(&content).context("parsing config toml")?
        };
        cfg.resolve_env()?;
        cfg.weights
            .validate()
            .map_err(|e| anyhow!("invalid [weights]: {e}"))?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $RATING_CONFIG_PATH
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        tracing::info!("no config file found, using built-in defaults");
        let mut cfg = Self::default();
        cfg.resolve_env()?;
        Ok(cfg)
    }

    /// Swap `"ENV"` placeholders for environment values. A missing provider
    /// key only disables that provider; a missing SMTP password is an error.
    fn resolve_env(&mut self) -> Result<()> {
        self.credentials.tipranks_api_key =
            resolve_optional(self.credentials.tipranks_api_key.take(), "TIPRANKS_API_KEY");
        self.credentials.polygon_api_key =
            resolve_optional(self.credentials.polygon_api_key.take(), "POLYGON_API_KEY");

        if let Some(smtp) = self.smtp.as_mut() {
            if is_env_marker(&smtp.password) {
                smtp.password =
                    env::var("SMTP_PASS").map_err(|_| anyhow!("Missing SMTP_PASS env var"))?;
            }
        }
        Ok(())
    }
}

fn is_env_marker(v: &str) -> bool {
    v.trim().eq_ignore_ascii_case(ENV_MARKER)
}

fn resolve_optional(value: Option<String>, var: &str) -> Option<String> {
    match value {
        Some(v) if is_env_marker(&v) => match env::var(var) {
            Ok(k) if !k.trim().is_empty() => Some(k),
            _ => {
                tracing::warn!(var, "credential set to ENV but variable is missing; provider disabled");
                None
            }
        },
        Some(v) if v.trim().is_empty() => None,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::SourceId;

    #[test]
    fn defaults_when_sections_missing() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.cache.capacity, 100);
        assert_eq!(cfg.fetch.timeout_secs, 15);
        assert_eq!(cfg.batch.tickers, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn full_toml() {
        let src = r#"
[weights]
yahoo = 0.6
tradingview = 0.4

[credentials]
polygon_api_key = "abc"

[cache]
capacity = 8

[fetch]
timeout_secs = 3

[yahoo]
invert_scale = true

[alerts]
strong_buy = 4.0

[smtp]
host = "smtp.example.com"
username = "bot"
password = "pw"
from = "bot@example.com"
to = "me@example.com"

[batch]
tickers = ["NVDA"]
output = "out/latest.csv"
"#;
        let cfg: AppConfig = toml::from_str(src).unwrap();
        assert_eq!(cfg.weights.weight_for(SourceId::Yahoo), Some(0.6));
        assert_eq!(cfg.weights.weight_for(SourceId::TipRanks), None);
        assert_eq!(cfg.credentials.polygon_api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.cache.capacity, 8);
        assert!(cfg.yahoo.invert_scale);
        assert_eq!(cfg.alerts.strong_buy, 4.0);
        assert_eq!(cfg.alerts.min_roe, 5.0);
        assert_eq!(cfg.smtp.as_ref().map(|s| s.port), Some(587));
        assert_eq!(cfg.batch.output, PathBuf::from("out/latest.csv"));
    }

    #[serial_test::serial]
    #[test]
    fn env_marker_resolution() {
        env::set_var("TIPRANKS_API_KEY", "tr-key");
        env::remove_var("POLYGON_API_KEY");

        let mut cfg = AppConfig::default();
        cfg.credentials.tipranks_api_key = Some("ENV".into());
        cfg.credentials.polygon_api_key = Some("env".into());
        cfg.resolve_env().unwrap();

        assert_eq!(cfg.credentials.tipranks_api_key.as_deref(), Some("tr-key"));
        assert_eq!(cfg.credentials.polygon_api_key, None);
        env::remove_var("TIPRANKS_API_KEY");
    }

    #[test]
    fn negative_weight_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("app.toml");
        fs::write(&p, "[weights]\nyahoo = -1.0\n").unwrap();
        assert!(AppConfig::load_from_file(&p).is_err());
    }
}
