//! Configuration file management.
//!
//! `config.toml` lives in the data directory. Every field has a default, so
//! a missing file or a partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use waitlist_core::Rewards;
use waitlist_tiers::schedule::{TierBand, TierSchedule};
use waitlist_tiers::TierError;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "WAITLIST_DATA_DIR";

/// Errors found while validating a loaded configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid tier table: {0}")]
    Tiers(#[from] TierError),

    #[error("rewards.batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("advanced.event_buffer must be at least 1")]
    ZeroEventBuffer,

    #[error("advanced.max_subscriptions must be at least 1")]
    ZeroSubscriptions,
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Tier band table.
    #[serde(default)]
    pub tiers: TiersConfig,
    /// Spot rewards.
    #[serde(default)]
    pub rewards: Rewards,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Tier bands, cheapest first. The last band has no upper bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default = "default_bands")]
    pub bands: Vec<TierBand>,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level for waitlist targets: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Most polling subscriptions open at once.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions: usize,
    /// Seconds a subscription may go unpolled before it is dropped.
    #[serde(default = "default_subscription_idle_secs")]
    pub subscription_idle_secs: u64,
}

fn default_bands() -> Vec<TierBand> {
    TierSchedule::reference().bands().to_vec()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_max_subscriptions() -> usize {
    crate::events::DEFAULT_MAX_SUBSCRIPTIONS
}

fn default_subscription_idle_secs() -> u64 {
    crate::events::DEFAULT_SUBSCRIPTION_IDLE.as_secs()
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_buffer: default_event_buffer(),
            max_subscriptions: default_max_subscriptions(),
            subscription_idle_secs: default_subscription_idle_secs(),
        }
    }
}

impl AdvancedConfig {
    /// How long a subscription may go unpolled.
    pub fn subscription_idle(&self) -> Duration {
        Duration::from_secs(self.subscription_idle_secs)
    }
}

impl TiersConfig {
    /// Validated schedule.
    pub fn schedule(&self) -> Result<TierSchedule, TierError> {
        TierSchedule::new(self.bands.clone())
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load and validate a specific config file. Missing file = defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<DaemonConfig>(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject tables and settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiers.schedule()?;
        if self.rewards.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.advanced.event_buffer == 0 {
            return Err(ConfigError::ZeroEventBuffer);
        }
        if self.advanced.max_subscriptions == 0 {
            return Err(ConfigError::ZeroSubscriptions);
        }
        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Waitlist")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".waitlist")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/waitlist"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.rewards.batch_size, 3);
        assert_eq!(config.rewards.spots_per_batch, 10);
        assert_eq!(config.rewards.spots_per_share, 5);
        assert_eq!(config.advanced.log_level, "info");
        assert_eq!(config.tiers.bands.len(), 6);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.tiers.bands, config.tiers.bands);
    }

    #[test]
    fn test_partial_config() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [rewards]
            spots_per_share = 7
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.rewards.spots_per_share, 7);
        assert_eq!(parsed.rewards.batch_size, 3);
        assert_eq!(parsed.tiers.bands.len(), 6);
    }

    #[test]
    fn test_custom_bands() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [tiers]
            bands = [
                { upper_bound = 10, price_cents = 500 },
                { price_cents = 900 },
            ]
            "#,
        )
        .expect("parse");
        let schedule = parsed.tiers.schedule().expect("valid");
        assert_eq!(schedule.quote(10).tier, 1);
        assert_eq!(schedule.quote(11).price_cents, 900);
    }

    #[test]
    fn test_invalid_bands_rejected() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [tiers]
            bands = [
                { upper_bound = 20, price_cents = 500 },
                { upper_bound = 10, price_cents = 600 },
                { price_cents = 900 },
            ]
            "#,
        )
        .expect("parse");
        assert!(matches!(parsed.validate(), Err(ConfigError::Tiers(_))));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut config = DaemonConfig::default();
        config.rewards.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn test_subscription_limits() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [advanced]
            max_subscriptions = 8
            subscription_idle_secs = 30
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.advanced.max_subscriptions, 8);
        assert_eq!(parsed.advanced.subscription_idle(), Duration::from_secs(30));
        assert_eq!(parsed.advanced.event_buffer, 1000);

        let mut config = DaemonConfig::default();
        config.advanced.max_subscriptions = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroSubscriptions)));
    }
}
