//! Configuration types for order-engine

use crate::gateway::{BinanceConfig, BinanceGateway, SharedGateway, BINANCE_TESTNET_URL};
use crate::orders::paper::DEFAULT_COMMISSION_RATE;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
/// Environment variable holding the API secret
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";
/// Optional base URL override
pub const BASE_URL_VAR: &str = "BINANCE_BASE_URL";

const MIN_CREDENTIAL_LEN: usize = 20;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Exchange connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Use the futures testnet regardless of `base_url`
    #[serde(default)]
    pub testnet: bool,

    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    crate::gateway::BINANCE_FUTURES_URL.to_string()
}
fn default_recv_window_ms() -> u64 {
    5000
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            testnet: false,
            recv_window_ms: default_recv_window_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// URL requests go to, honouring the testnet switch
    pub fn effective_base_url(&self) -> &str {
        if self.testnet {
            BINANCE_TESTNET_URL
        } else {
            &self.base_url
        }
    }
}

/// Engine behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Simulate every order even when credentials are present
    #[serde(default)]
    pub test_mode: bool,

    /// Commission charged on simulated fills
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
}

fn default_commission_rate() -> Decimal {
    DEFAULT_COMMISSION_RATE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            commission_rate: default_commission_rate(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus exporter port, disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Also append logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Build a gateway from credentials, or `None` for simulation-only
    pub fn build_gateway(
        &self,
        credentials: Option<Credentials>,
    ) -> anyhow::Result<Option<SharedGateway>> {
        let Some(credentials) = credentials else {
            tracing::warn!(
                "No valid API credentials found, orders will be simulated locally"
            );
            return Ok(None);
        };

        let base_url = match credentials.base_url {
            Some(url) if !self.gateway.testnet => url,
            _ => self.gateway.effective_base_url().to_string(),
        };

        let mut config = BinanceConfig::new(credentials.api_key, credentials.api_secret);
        config.base_url = base_url;
        config.recv_window_ms = self.gateway.recv_window_ms;
        config.timeout = Duration::from_secs(self.gateway.timeout_secs);

        let gateway = BinanceGateway::new(config)?;
        Ok(Some(Arc::new(gateway)))
    }
}

/// API credentials read from the environment
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; short or missing values yield `None`
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)?.trim().to_string();
        let api_secret = lookup(API_SECRET_VAR)?.trim().to_string();

        if api_key.len() < MIN_CREDENTIAL_LEN || api_secret.len() < MIN_CREDENTIAL_LEN {
            tracing::warn!(
                min_len = MIN_CREDENTIAL_LEN,
                "API credentials look invalid, ignoring them"
            );
            return None;
        }

        let base_url = lookup(BASE_URL_VAR)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Some(Self {
            api_key,
            api_secret,
            base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [gateway]
            base_url = "https://example.invalid"
            recv_window_ms = 3000
            timeout_secs = 5

            [engine]
            test_mode = true
            commission_rate = 0.0004

            [telemetry]
            log_level = "debug"
            log_format = "json"
            metrics_port = 9090
            log_file = "logs/order-engine.log"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.gateway.base_url, "https://example.invalid");
        assert_eq!(config.gateway.recv_window_ms, 3000);
        assert!(config.engine.test_mode);
        assert_eq!(config.engine.commission_rate, dec!(0.0004));
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
        assert_eq!(
            config.telemetry.log_file,
            Some(PathBuf::from("logs/order-engine.log"))
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[engine]\ntest_mode = true\n").unwrap();
        assert!(config.engine.test_mode);
        assert_eq!(config.engine.commission_rate, dec!(0.0002));
        assert_eq!(config.gateway.timeout_secs, 10);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
        assert!(config.telemetry.metrics_port.is_none());
        assert!(config.telemetry.log_file.is_none());
    }

    #[test]
    fn test_testnet_overrides_base_url() {
        let mut gateway = GatewayConfig::default();
        assert_eq!(gateway.effective_base_url(), "https://fapi.binance.com");
        gateway.testnet = true;
        assert_eq!(gateway.effective_base_url(), BINANCE_TESTNET_URL);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert!(!config.engine.test_mode);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\ntest_mode = true").unwrap();
        let config = Config::load_or_default(file.path()).unwrap();
        assert!(config.engine.test_mode);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\ntest_mode = ").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_credentials_require_min_length() {
        let key = "k".repeat(24);
        let secret = "s".repeat(24);

        let creds = Credentials::from_lookup(lookup(&[
            (API_KEY_VAR, key.as_str()),
            (API_SECRET_VAR, secret.as_str()),
        ]))
        .unwrap();
        assert_eq!(creds.api_key, key);
        assert!(creds.base_url.is_none());

        assert!(Credentials::from_lookup(lookup(&[
            (API_KEY_VAR, "short"),
            (API_SECRET_VAR, secret.as_str()),
        ]))
        .is_none());
        assert!(Credentials::from_lookup(lookup(&[(API_KEY_VAR, key.as_str())])).is_none());
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials {
            api_key: "k".repeat(24),
            api_secret: "s".repeat(24),
            base_url: None,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("kkkk"));
        assert!(!debug.contains("ssss"));
    }

    #[test]
    fn test_build_gateway_without_credentials() {
        let config = Config::default();
        assert!(config.build_gateway(None).unwrap().is_none());
    }

    #[test]
    fn test_build_gateway_with_credentials() {
        let config = Config::default();
        let creds = Credentials {
            api_key: "k".repeat(24),
            api_secret: "s".repeat(24),
            base_url: Some("http://127.0.0.1:1".to_string()),
        };
        assert!(config.build_gateway(Some(creds)).unwrap().is_some());
    }
}
