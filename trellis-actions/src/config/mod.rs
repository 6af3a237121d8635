//! Configuration for the actions middleware
//!
//! Loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `TRELLIS_ACTIONS_` prefix)
//! 2. `./trellis.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # trellis.toml
//! key_hex = "6b0a…64 hex chars…"
//! max_body_bytes = 1048576
//! ```
//!
//! The key is the only setting most deployments care about: without one,
//! a random per-process key is generated at startup and encrypted results
//! do not survive restarts or load-balance across instances.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Settings for the actions middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Hex-encoded 32-byte AES-256 key. `None` means generate per process.
    pub key_hex: Option<String>,

    /// Maximum number of bytes buffered from a request body before the
    /// middleware gives up with 413.
    pub max_body_bytes: usize,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            key_hex: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ActionsConfig {
    /// Load configuration with standard precedence
    /// (env > `./trellis.toml` > defaults).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use trellis_actions::config::ActionsConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = ActionsConfig::load()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load() -> anyhow::Result<Self> {
        Ok(Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("trellis.toml"))
            .merge(Env::prefixed("TRELLIS_ACTIONS_"))
            .extract()?)
    }

    /// Load configuration from a specific TOML file (env still wins).
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        Ok(Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRELLIS_ACTIONS_"))
            .extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ActionsConfig::default();
        assert!(config.key_hex.is_none());
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = ActionsConfig {
            key_hex: Some("ab".repeat(32)),
            max_body_bytes: 4096,
        };

        let toml = toml_round_trip(&config);
        assert_eq!(toml.key_hex, config.key_hex);
        assert_eq!(toml.max_body_bytes, 4096);
    }

    fn toml_round_trip(config: &ActionsConfig) -> ActionsConfig {
        let json = serde_json::to_string(config).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: ActionsConfig = serde_json::from_str("{}").unwrap();
        assert!(config.key_hex.is_none());
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }
}
