//! Application configuration.
//!
//! One TOML file composes the per-crate configurations; every key has a
//! compiled-in default so a missing file or a partial file still yields a
//! runnable (and tightly limited) engine.

use aegis_dispatch::DispatchConfig;
use aegis_registry::RegistryConfig;
use aegis_safety::SafetyPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Account the session trades under. Checked against the policy's
    /// paper-account gate on every placement.
    #[serde(default = "default_account")]
    pub account: String,
    #[serde(default)]
    pub safety: SafetyPolicy,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

fn default_account() -> String {
    "DU0000001".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account: default_account(),
            safety: SafetyPolicy::default(),
            registry: RegistryConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and sanity-check a TOML configuration file.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {path}: {e}")))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("failed to parse {path}: {e}")))?;
        config.safety.validate()?;
        Ok(config)
    }

    /// Resolve configuration from an explicit path, the `AEGIS_CONFIG`
    /// environment variable, or the compiled-in defaults, in that order.
    pub fn load(path: Option<&str>) -> EngineResult<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("AEGIS_CONFIG").ok());
        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compose_sub_configs() {
        let config = AppConfig::default();
        assert_eq!(config.account, "DU0000001");
        assert!(config.safety.trading_enabled);
        assert!(config.registry.activate_on_partial_fill);
        assert_eq!(config.dispatch.ack_timeout_ms, 5000);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let raw = r#"
            account = "DF7654321"

            [safety]
            max_daily_orders = 5

            [dispatch]
            ack_timeout_ms = 250
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.account, "DF7654321");
        assert_eq!(config.safety.max_daily_orders, 5);
        assert_eq!(config.safety.max_orders_per_minute, 10);
        assert_eq!(config.dispatch.ack_timeout_ms, 250);
        assert!(config.registry.activate_on_partial_fill);
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.safety.max_daily_orders, 200);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = AppConfig::from_file("/nonexistent/aegis.toml").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
