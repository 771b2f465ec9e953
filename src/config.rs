use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::core::session::SessionOptions;

pub const DEFAULT_CONFIG_FILE: &str = "export-wizard.toml";
const ENV_PREFIX: &str = "EXPORT_WIZARD_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub verbose: bool,
    pub log_json: bool,
    pub log_file: Option<PathBuf>,
    pub auto_start_export: bool,
    pub simulation: SimulationConfig,
}

/// How the simulated device and export backend behave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_device: InitialDevice,
    pub probe_delay_ms: u64,
    pub unlock_delay_ms: u64,
    /// When set, unlock attempts resolve on their own by comparing against
    /// this value. When unset, the operator resolves them.
    pub passphrase: Option<String>,
    pub export_delay_ms: u64,
    pub export_outcome: ExportMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialDevice {
    /// Do not probe; the operator reports the device.
    None,
    Missing,
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    Succeed,
    Fail,
    Manual,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_json: false,
            log_file: None,
            auto_start_export: true,
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_device: InitialDevice::Missing,
            probe_delay_ms: 1200,
            unlock_delay_ms: 800,
            passphrase: None,
            export_delay_ms: 1500,
            export_outcome: ExportMode::Manual,
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then the TOML file, then `EXPORT_WIZARD_*`
    /// environment variables, then `overrides` (typically CLI flags).
    ///
    /// An explicit `path` must exist. Without one, `export-wizard.toml` in the
    /// working directory is used if present.
    pub fn load<T: Serialize>(path: Option<&Path>, overrides: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("config file {} does not exist", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().context("Failed to load configuration")
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            auto_start_export: self.auto_start_export,
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulator_timings() {
        let config = AppConfig::default();
        assert!(config.auto_start_export);
        assert_eq!(config.simulation.initial_device, InitialDevice::Missing);
        assert_eq!(config.simulation.probe_delay_ms, 1200);
        assert_eq!(config.simulation.export_outcome, ExportMode::Manual);
    }

    #[test]
    fn serializes_to_toml() {
        let text = AppConfig::default().to_toml().unwrap();
        assert!(text.contains("[simulation]"));
        assert!(text.contains("initial_device = \"missing\""));
    }
}
