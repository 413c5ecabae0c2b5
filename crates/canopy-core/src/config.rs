//! Device configuration management.
//!
//! Handles loading, saving, and validating the canopy configuration:
//! which sensor families are enabled and which bus addresses they sit at.
//! Addresses default to the real hardware values and rarely need
//! overriding; the validation exists so two enabled probes can never be
//! configured onto the same address.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};
use crate::transport::BusAddress;

/// Main device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    /// Aquatic pH/EC probe pair.
    pub aquatic: AquaticConfig,

    /// Atmospheric probe.
    pub atmospheric: ProbeConfig,

    /// Soil probe.
    pub soil: ProbeConfig,
}

/// Configuration for the two-probe aquatic family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AquaticConfig {
    /// Whether the aquatic probes are attached.
    pub enabled: bool,

    /// Bus address of the pH probe.
    pub ph_address: u8,

    /// Bus address of the EC probe.
    pub ec_address: u8,
}

/// Configuration for a single-probe family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Whether the probe is attached.
    pub enabled: bool,

    /// Bus address of the probe.
    pub address: u8,
}

impl Default for AquaticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ph_address: BusAddress::AQUATIC_PH.get(),
            ec_address: BusAddress::AQUATIC_EC.get(),
        }
    }
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            aquatic: AquaticConfig::default(),
            atmospheric: ProbeConfig {
                enabled: true,
                address: BusAddress::ATMOSPHERIC.get(),
            },
            soil: ProbeConfig {
                enabled: true,
                address: BusAddress::SOIL.get(),
            },
        }
    }
}

impl CanopyConfig {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, unparsable,
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CanopyError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed, or
    /// if the result fails validation.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The default configuration file location.
    ///
    /// On the device: `/etc/canopy/config.toml`.
    /// For development: the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            PathBuf::from("/etc/canopy/config.toml")
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "canopy")
                .map(|dirs| dirs.config_dir().join("config.toml"))
                .unwrap_or_else(|| PathBuf::from("./config.toml"))
        }
    }

    /// Validate that no two enabled probes share a bus address.
    ///
    /// Each handle exclusively owns its address on the shared bus; a
    /// duplicate here would put two sessions on one peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`CanopyError::ConfigValidation`] naming the duplicate.
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<u8> = Vec::new();
        let mut claim = |address: u8| -> Result<()> {
            if seen.contains(&address) {
                return Err(CanopyError::ConfigValidation(format!(
                    "bus address {} assigned to more than one enabled sensor",
                    BusAddress::new(address)
                )));
            }
            seen.push(address);
            Ok(())
        };

        if self.aquatic.enabled {
            claim(self.aquatic.ph_address)?;
            claim(self.aquatic.ec_address)?;
        }
        if self.atmospheric.enabled {
            claim(self.atmospheric.address)?;
        }
        if self.soil.enabled {
            claim(self.soil.address)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_hardware_addresses_and_validate() {
        let config = CanopyConfig::default();
        assert_eq!(config.aquatic.ph_address, 0x63);
        assert_eq!(config.aquatic.ec_address, 0x64);
        assert_eq!(config.atmospheric.address, 0x76);
        assert_eq!(config.soil.address, 0x36);
        config.validate().unwrap();
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CanopyConfig::default();
        config.soil.enabled = false;
        config.save(&path).unwrap();

        let loaded = CanopyConfig::load(&path).unwrap();
        assert!(!loaded.soil.enabled);
        assert_eq!(loaded.aquatic.ph_address, 0x63);
    }

    #[test]
    fn test_load_missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CanopyConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, CanopyError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = CanopyConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert!(config.aquatic.enabled);
    }

    #[test]
    fn test_duplicate_address_fails_validation() {
        let mut config = CanopyConfig::default();
        config.soil.address = config.atmospheric.address;

        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("0x76"));
    }

    #[test]
    fn test_duplicate_address_on_disabled_sensor_is_allowed() {
        let mut config = CanopyConfig::default();
        config.soil.address = config.atmospheric.address;
        config.soil.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = CanopyConfig::load(&path).unwrap_err();
        assert!(matches!(err, CanopyError::ConfigParse(_)));
    }
}
