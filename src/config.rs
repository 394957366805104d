//! Module: config
//!
//! Purpose: the startup configuration document (JSON). Names the laser,
//! sets the default sampling settings, and carries the Wi-Fi details:
//! either credentials for an existing network or the parameters for
//! hosting one.
//!
//! Every field is optional. A missing or invalid document is logged and
//! falls back to built-in defaults; configuration problems are never fatal
//! (the scope must come up regardless).
//!
//! Parsed zero-copy from the raw document, so it works against a baked-in
//! `include_str!` on the device and plain literals in tests.

use serde::Deserialize;
use thiserror::Error;

use crate::settings::{DEFAULT_DURATION_MS, DEFAULT_RESOLUTION_MS};

/// Soft-AP channel used when the document names none. 1-11 is safe in most
/// countries.
pub const DEFAULT_HOST_CHANNEL: u8 = 1;

/// IP the board claims when the document names none.
pub const DEFAULT_IP: &str = "192.168.1.1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Parse(serde_json_core::de::Error),
}

/// The config.json schema.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceConfig<'a> {
    /// Laser display name, shown by the status endpoint.
    #[serde(borrow, default)]
    pub name: Option<&'a str>,

    /// Default sampling resolution, ms.
    #[serde(default)]
    pub default_resolution: Option<f64>,

    /// Default packet duration, ms.
    #[serde(default)]
    pub default_duration: Option<f64>,

    /// Host our own network instead of joining one (mainly for testing).
    #[serde(default)]
    pub host: bool,

    /// Station mode: network to join. Required unless `host` is set.
    #[serde(borrow, default)]
    pub ssid: Option<&'a str>,

    /// Station mode: password; absent means an open network.
    #[serde(borrow, default)]
    pub password: Option<&'a str>,

    /// Soft-AP mode: network name to host.
    #[serde(borrow, default)]
    pub host_ssid: Option<&'a str>,

    /// Soft-AP mode: password. Hosting fails below 8 characters.
    #[serde(borrow, default)]
    pub host_password: Option<&'a str>,

    /// Soft-AP mode: Wi-Fi channel.
    #[serde(default)]
    pub host_channel: Option<u8>,

    /// Static IP for the board (also the gateway in soft-AP mode).
    #[serde(borrow, default)]
    pub default_ip: Option<&'a str>,
}

impl<'a> DeviceConfig<'a> {
    /// Parse a raw JSON document.
    pub fn from_json(raw: &'a str) -> Result<Self, ConfigError> {
        serde_json_core::from_str::<Self>(raw)
            .map(|(config, _)| config)
            .map_err(ConfigError::Parse)
    }

    /// Parse, falling back to defaults on any problem. This is the boot
    /// path: log the failure and keep going.
    pub fn load(raw: &'a str) -> Self {
        let config = match Self::from_json(raw) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{err}; using built-in defaults");
                Self::default()
            }
        };

        if config.host {
            if config.host_ssid.is_none() || config.host_password.is_none() {
                log::warn!("missing host_ssid or host_password");
            } else if config.host_password.map_or(0, str::len) < 8 {
                log::warn!("hosting will fail: host_password has fewer than 8 characters");
            }
        } else if config.ssid.is_none() {
            log::warn!("missing WiFi ssid");
        }

        config
    }

    /// Display name, empty when unnamed.
    pub fn display_name(&self) -> &'a str {
        self.name.unwrap_or("")
    }

    /// Default sampling resolution, ms.
    pub fn resolution_ms(&self) -> f64 {
        self.default_resolution.unwrap_or(DEFAULT_RESOLUTION_MS)
    }

    /// Default packet duration, ms.
    pub fn duration_ms(&self) -> f64 {
        self.default_duration.unwrap_or(DEFAULT_DURATION_MS)
    }

    /// Soft-AP channel.
    pub fn channel(&self) -> u8 {
        self.host_channel.unwrap_or(DEFAULT_HOST_CHANNEL)
    }

    /// Board IP as a string; parsing it belongs to the network layer.
    pub fn ip(&self) -> &'a str {
        self.default_ip.unwrap_or(DEFAULT_IP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let raw = r#"{
            "name": "TiSapph",
            "default_resolution": 1.5,
            "default_duration": 80.0,
            "ssid": "labnet",
            "password": "hunter22",
            "default_ip": "10.0.0.17"
        }"#;
        let config = DeviceConfig::from_json(raw).unwrap();

        assert_eq!(config.display_name(), "TiSapph");
        assert_eq!(config.resolution_ms(), 1.5);
        assert_eq!(config.duration_ms(), 80.0);
        assert!(!config.host);
        assert_eq!(config.ssid, Some("labnet"));
        assert_eq!(config.ip(), "10.0.0.17");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let config = DeviceConfig::from_json(r#"{"ssid":"labnet"}"#).unwrap();

        assert_eq!(config.display_name(), "");
        assert_eq!(config.resolution_ms(), DEFAULT_RESOLUTION_MS);
        assert_eq!(config.duration_ms(), DEFAULT_DURATION_MS);
        assert_eq!(config.channel(), DEFAULT_HOST_CHANNEL);
        assert_eq!(config.ip(), DEFAULT_IP);
    }

    #[test]
    fn test_invalid_document_is_not_fatal() {
        let config = DeviceConfig::load("garbage {");

        assert_eq!(config.display_name(), "");
        assert_eq!(config.resolution_ms(), DEFAULT_RESOLUTION_MS);
    }

    #[test]
    fn test_host_mode_fields() {
        let raw = r#"{
            "host": true,
            "host_ssid": "scope-ap",
            "host_password": "beampath1",
            "host_channel": 6
        }"#;
        let config = DeviceConfig::from_json(raw).unwrap();

        assert!(config.host);
        assert_eq!(config.host_ssid, Some("scope-ap"));
        assert_eq!(config.channel(), 6);
    }
}
