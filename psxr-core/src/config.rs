// Session configuration
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which device services BIOS calls at reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiosDevice {
    /// Never load an image; run fully high-level emulated.
    Hle,
    /// Load the configured image file into ROM.
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to a 512KB BIOS image, if one is configured.
    pub bios_path: Option<PathBuf>,
    pub bios_device: BiosDevice,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bios_path: None,
            bios_device: BiosDevice::Hle,
        }
    }
}

impl Config {
    /// Configuration backed by an image file.
    pub fn with_bios(path: impl Into<PathBuf>) -> Self {
        Self {
            bios_path: Some(path.into()),
            bios_device: BiosDevice::Image,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Config> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}
