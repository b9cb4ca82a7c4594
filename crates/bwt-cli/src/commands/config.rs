//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use bwt_core::ConnectionPolicy;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;
use crate::util::write_output;

pub fn cmd_config(action: ConfigAction, path: &Path, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Path => write_output(&format!("{}\n", path.display())),
        ConfigAction::Show => {
            let config = Config::try_load(path)?;
            let content = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&redacted(config)?)? + "\n",
                OutputFormat::Text => {
                    let body = toml::to_string_pretty(&redacted(config)?)
                        .context("Failed to serialize config")?;
                    format!("# {}\n{}", path.display(), body)
                }
            };
            write_output(&content)
        }
        ConfigAction::SetPolicy { policy } => {
            let mut config = Config::try_load(path)?;
            config.policy = ConnectionPolicy::from(policy);
            config.save(path)?;
            write_output(&format!("policy = {}\n", config.policy))
        }
    }
}

/// The config as shown to the user, with the passkey masked.
fn redacted(config: Config) -> Result<toml::Value> {
    let mut value = toml::Value::try_from(config).context("Failed to serialize config")?;
    if let Some(device) = value.get_mut("device").and_then(toml::Value::as_table_mut)
        && device.contains_key("passkey")
    {
        device.insert(
            "passkey".to_string(),
            toml::Value::String("******".to_string()),
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwt_types::DeviceConfig;

    #[test]
    fn test_redacted_masks_passkey() {
        let config = Config {
            device: Some(DeviceConfig::from_input("AA:BB:CC:DD:EE:FF", "987654").unwrap()),
            ..Default::default()
        };
        let table = redacted(config).unwrap();
        let device = table["device"].as_table().unwrap();
        assert_eq!(device["passkey"].as_str(), Some("******"));
        assert_eq!(device["address"].as_str(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(table["policy"].as_str(), Some("per_poll"));
    }

    #[test]
    fn test_set_policy_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        cmd_config(
            ConfigAction::SetPolicy {
                policy: crate::cli::PolicyArg::Persistent,
            },
            &path,
            OutputFormat::Text,
        )
        .unwrap();
        assert_eq!(
            Config::try_load(&path).unwrap().policy,
            ConnectionPolicy::Persistent
        );
    }
}
