//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bwt_core::{ConnectionConfig, ConnectionPolicy, PollerConfig};
use bwt_types::{DeviceAddress, DeviceConfig, Passkey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::DeviceArgs;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection reuse policy
    #[serde(default)]
    pub policy: ConnectionPolicy,

    /// Connect timeout per attempt in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Read timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,

    /// Characteristic holding the salt level, if not the broadcast one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic: Option<String>,

    /// Time spent scanning for an uncached device, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_timeout: Option<u64>,

    /// Default softener, written by `bwt setup`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceConfig>,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bwt")
            .join("config.toml")
    }

    /// Config file location, honoring `--config` / `BWT_CONFIG`
    pub fn path(override_path: Option<&Path>) -> PathBuf {
        override_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path)
    }

    /// Load config from file, or return default if not found
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load config from file; a missing file yields the default config
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Connection settings from the file, with an optional connect timeout override
    pub fn connection_config(&self, connect_timeout: Option<u64>) -> Result<ConnectionConfig> {
        let mut connection = ConnectionConfig::default();
        if let Some(secs) = connect_timeout.or(self.connect_timeout) {
            connection = connection.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.read_timeout {
            connection = connection.read_timeout(Duration::from_secs(secs));
        }
        if let Some(uuid) = &self.characteristic {
            let uuid = Uuid::parse_str(uuid)
                .with_context(|| format!("Invalid characteristic UUID in config: {}", uuid))?;
            connection = connection.characteristic(uuid);
        }
        connection.validate()?;
        Ok(connection)
    }

    /// Poller settings from the file, with optional overrides
    pub fn poller_config(
        &self,
        connect_timeout: Option<u64>,
        policy: Option<ConnectionPolicy>,
    ) -> Result<PollerConfig> {
        Ok(PollerConfig::default()
            .connection(self.connection_config(connect_timeout)?)
            .policy(policy.unwrap_or(self.policy)))
    }

    /// Scan timeout for device lookups, if configured
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout.map(Duration::from_secs)
    }
}

/// Resolve the device from args (or env), falling back to the configured device.
///
/// A passkey given without an address applies to the configured device. An
/// address given without a passkey reuses the configured passkey when it names
/// the configured device, and the default passkey otherwise.
pub fn resolve_device(args: &DeviceArgs, config: &Config) -> Result<DeviceConfig> {
    let passkey = args
        .passkey
        .as_deref()
        .map(Passkey::parse)
        .transpose()
        .context("Invalid --passkey")?;

    let device = match (args.address.as_deref(), &config.device) {
        (Some(address), configured) => {
            let address = DeviceAddress::parse(address).context("Invalid --address")?;
            match configured {
                Some(device) if device.address == address => device.clone(),
                _ => DeviceConfig::new(address, Passkey::default()),
            }
        }
        (None, Some(device)) => device.clone(),
        (None, None) => bail!(
            "No device specified. Use --address <MAC> or set BWT_DEVICE environment variable.\n\
             Run 'bwt setup --address <MAC>' to save a default device, or 'bwt scan' to find one."
        ),
    };

    Ok(match passkey {
        Some(passkey) => DeviceConfig { passkey, ..device },
        None => device,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(address: Option<&str>, passkey: Option<&str>) -> DeviceArgs {
        DeviceArgs {
            address: address.map(str::to_string),
            passkey: passkey.map(str::to_string),
            timeout: None,
        }
    }

    fn configured() -> Config {
        Config {
            device: Some(
                DeviceConfig::from_input("AA:BB:CC:DD:EE:FF", "654321")
                    .unwrap()
                    .with_name("Kitchen"),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_device_prefers_arg() {
        let device = resolve_device(&args(Some("11:22:33:44:55:66"), None), &configured()).unwrap();
        assert_eq!(device.address.to_string(), "11:22:33:44:55:66");
        assert_eq!(device.passkey.as_str(), "123456");
        assert!(device.name.is_none());
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let device = resolve_device(&args(None, None), &configured()).unwrap();
        assert_eq!(device.address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(device.passkey.as_str(), "654321");
        assert_eq!(device.name.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_resolve_device_rejects_padded_address() {
        let err = resolve_device(&args(Some(" 11:22:33:44:55:66"), None), &configured());
        assert!(err.is_err());
        let padded = args(Some("11:22:33:44:55:66"), Some("123456 "));
        assert!(resolve_device(&padded, &configured()).is_err());
    }

    #[test]
    fn test_resolve_device_same_address_keeps_config() {
        let device = resolve_device(&args(Some("aa-bb-cc-dd-ee-ff"), None), &configured()).unwrap();
        assert_eq!(device.passkey.as_str(), "654321");
        assert_eq!(device.name.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_resolve_device_passkey_override() {
        let device = resolve_device(&args(None, Some("000111")), &configured()).unwrap();
        assert_eq!(device.passkey.as_str(), "000111");
    }

    #[test]
    fn test_resolve_device_none_when_both_empty() {
        let err = resolve_device(&args(None, None), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("No device specified"));
    }

    #[test]
    fn test_resolve_device_rejects_bad_input() {
        assert!(resolve_device(&args(Some("not-a-mac"), None), &Config::default()).is_err());
        assert!(resolve_device(&args(None, Some("12ab")), &configured()).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            policy: ConnectionPolicy::Persistent,
            connect_timeout: Some(20),
            ..configured()
        };
        config.save(&path).unwrap();

        let loaded = Config::try_load(&path).unwrap();
        assert_eq!(loaded, config);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("policy = \"persistent\""));
        assert!(text.contains("address = \"AA:BB:CC:DD:EE:FF\""));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "policy = \"sometimes\"").unwrap();
        assert!(Config::try_load(&path).is_err());
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_path_override() {
        let custom = PathBuf::from("/tmp/bwt-test.toml");
        assert_eq!(Config::path(Some(&custom)), custom);
        assert!(Config::path(None).ends_with("bwt/config.toml"));
    }

    #[test]
    fn test_connection_config_overrides() {
        let config = Config {
            connect_timeout: Some(15),
            read_timeout: Some(5),
            characteristic: Some("d973f2e1-b19e-11e2-9e96-0800200c9a66".to_string()),
            ..Default::default()
        };
        let connection = config.connection_config(Some(20)).unwrap();
        assert_eq!(connection.connect_timeout, Duration::from_secs(20));
        assert_eq!(connection.read_timeout, Duration::from_secs(5));
        assert_eq!(
            connection.characteristic.to_string(),
            "d973f2e1-b19e-11e2-9e96-0800200c9a66"
        );

        let connection = config.connection_config(None).unwrap();
        assert_eq!(connection.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_connection_config_rejects_out_of_range() {
        let config = Config {
            read_timeout: Some(60),
            ..Default::default()
        };
        assert!(config.connection_config(None).is_err());
        assert!(Config::default().connection_config(Some(0)).is_err());

        let bad_uuid = Config {
            characteristic: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(bad_uuid.connection_config(None).is_err());
    }

    #[test]
    fn test_poller_config_policy_override() {
        let config = Config {
            policy: ConnectionPolicy::Persistent,
            ..Default::default()
        };
        assert_eq!(
            config.poller_config(None, None).unwrap().policy,
            ConnectionPolicy::Persistent
        );
        assert_eq!(
            config
                .poller_config(None, Some(ConnectionPolicy::PerPoll))
                .unwrap()
                .policy,
            ConnectionPolicy::PerPoll
        );
    }
}
