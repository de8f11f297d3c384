// =============================================================================
// Gateway Configuration — JSON file with env overrides and atomic save
// =============================================================================
//
// Every tunable of the gateway lives here: the symbol watchlist, the default
// candle resolution, the upstream endpoint, and the key-level detector
// parameters. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file. Persistence uses the tmp + rename
// pattern to prevent corruption on crash.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::KeyLevelParams;

/// Default config file name, next to the binary's working directory.
pub const CONFIG_FILE: &str = "gateway_config.json";

fn default_symbols() -> Vec<String> {
    vec!["NABIL".to_string(), "MNBBL".to_string()]
}

fn default_resolution() -> String {
    "D".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Symbols evaluated when a request does not name any explicitly.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Candle resolution requested from the provider ("D" = daily).
    #[serde(default = "default_resolution")]
    pub resolution: String,

    /// Address the REST API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the market-data provider. Usually supplied via the
    /// `GATEWAY_UPSTREAM_URL` environment variable rather than the file.
    #[serde(default)]
    pub upstream_url: String,

    /// Optional path to an extra root certificate (PEM) for the provider.
    #[serde(default)]
    pub ca_cert: Option<String>,

    /// Support/resistance detector parameters.
    #[serde(default)]
    pub key_levels: KeyLevelParams,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            resolution: default_resolution(),
            bind_addr: default_bind_addr(),
            upstream_url: String::new(),
            ca_cert: None,
            key_levels: KeyLevelParams::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read gateway config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse gateway config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            resolution = %config.resolution,
            "gateway config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` atomically (write `.tmp`, rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise gateway config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "gateway config saved");
        Ok(())
    }

    /// Apply environment variable overrides on top of the file values.
    ///
    /// Recognised variables: `GATEWAY_SYMBOLS` (comma-separated),
    /// `GATEWAY_BIND_ADDR`, `GATEWAY_UPSTREAM_URL`, `GATEWAY_CA_CERT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(syms) = std::env::var("GATEWAY_SYMBOLS") {
            let parsed: Vec<String> = syms
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.symbols = parsed;
            }
        }
        if let Ok(addr) = std::env::var("GATEWAY_BIND_ADDR") {
            if !addr.is_empty() {
                self.bind_addr = addr;
            }
        }
        if let Ok(url) = std::env::var("GATEWAY_UPSTREAM_URL") {
            if !url.is_empty() {
                self.upstream_url = url;
            }
        }
        if let Ok(cert) = std::env::var("GATEWAY_CA_CERT") {
            if !cert.is_empty() {
                self.ca_cert = Some(cert);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.symbols, vec!["NABIL", "MNBBL"]);
        assert_eq!(cfg.resolution, "D");
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert!(cfg.upstream_url.is_empty());
        assert!(cfg.ca_cert.is_none());
        assert_eq!(cfg.key_levels.pivot_window, 5);
        assert!((cfg.key_levels.cluster_tolerance_pct - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.key_levels.top_n, 3);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.symbols, vec!["NABIL", "MNBBL"]);
        assert_eq!(cfg.resolution, "D");
        assert_eq!(cfg.key_levels.pivot_window, 5);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbols": ["ADBL"], "key_levels": { "top_n": 5 } }"#;
        let cfg: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbols, vec!["ADBL"]);
        assert_eq!(cfg.key_levels.top_n, 5);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.key_levels.pivot_window, 5);
        assert_eq!(cfg.resolution, "D");
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = GatewayConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.symbols, cfg2.symbols);
        assert_eq!(cfg.resolution, cfg2.resolution);
        assert_eq!(cfg.key_levels.top_n, cfg2.key_levels.top_n);
    }
}
