use serde::Deserialize;

use crate::scoring::{RuleSpec, ScoringEngine};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

fn default_true() -> bool {
    true
}

// ============================================================
// Scoring Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Probability at or above which a claim is classified fraudulent.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Raw score before any rule fires.
    #[serde(default = "default_bias")]
    pub bias: f64,
    /// Fired rules with |weight| at or below this are scored but not reported.
    #[serde(default = "default_min_significance")]
    pub min_significance: f64,
    /// Replaces the built-in rule catalog when non-empty.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            bias: -1.5,
            min_significance: 0.25,
            rules: Vec::new(),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

fn default_bias() -> f64 {
    -1.5
}

fn default_min_significance() -> f64 {
    0.25
}

// ============================================================
// Feature Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct FeatureConfig {
    /// Dollar difference between total and itemised amounts that is tolerated.
    #[serde(default = "default_mismatch_abs_tolerance")]
    pub mismatch_abs_tolerance: f64,
    /// Fraction of the total that is tolerated.
    #[serde(default = "default_mismatch_rel_tolerance")]
    pub mismatch_rel_tolerance: f64,
    /// Sentinel for `claim_to_premium_ratio` when the premium is zero.
    #[serde(default = "default_premium_ratio_cap")]
    pub premium_ratio_cap: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            mismatch_abs_tolerance: 1.0,
            mismatch_rel_tolerance: 0.01,
            premium_ratio_cap: 1000.0,
        }
    }
}

fn default_mismatch_abs_tolerance() -> f64 {
    1.0
}

fn default_mismatch_rel_tolerance() -> f64 {
    0.01
}

fn default_premium_ratio_cap() -> f64 {
    1000.0
}

// ============================================================
// Store Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// PostgreSQL URL. Claims are kept in memory when unset.
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Delay before the single retry of a failed append.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            retry_backoff_ms: 100,
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_retry_backoff_ms() -> u64 {
    100
}

// ============================================================
// Analytics Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Longest a writer waits for the counters before counting contention and retrying.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Historical labelled claims CSV used to seed the counters at startup.
    pub seed_csv_path: Option<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 50,
            seed_csv_path: None,
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    50
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    8000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        ScoringEngine::new(&self.scoring)
            .map_err(|e| eyre::eyre!("Invalid scoring configuration: {}", e))?;

        let features = &self.features;
        for (name, value) in [
            ("mismatch_abs_tolerance", features.mismatch_abs_tolerance),
            ("mismatch_rel_tolerance", features.mismatch_rel_tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(eyre::eyre!(
                    "features.{} must be finite and non-negative, got {}",
                    name,
                    value
                ));
            }
        }
        if !(features.premium_ratio_cap.is_finite() && features.premium_ratio_cap > 0.0) {
            return Err(eyre::eyre!(
                "features.premium_ratio_cap must be positive, got {}",
                features.premium_ratio_cap
            ));
        }

        if self.store.max_connections == 0 {
            return Err(eyre::eyre!("store.max_connections must be at least 1"));
        }
        if self.analytics.lock_timeout_ms == 0 {
            return Err(eyre::eyre!("analytics.lock_timeout_ms must be at least 1"));
        }
        Ok(())
    }
}
