// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Host configuration for the `seq-model` tool.
//!
//! Read from YAML, or from TOML when the file extension is `.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::music::Scale;
use crate::project::Project;
use crate::types::ModelEnum;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Storage volume
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Values applied to newly created projects
    #[serde(default)]
    pub project: ProjectDefaults,
}

impl AppConfig {
    /// Load a configuration file, picking the format from its extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        if is_toml(path) {
            Self::from_toml(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Save to a file, in TOML when the extension is `.toml`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_yaml()?
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<()> {
        self.project.scale()?;
        if self.storage.default_slot >= crate::file_manager::SLOT_COUNT {
            return Err(anyhow!(
                "default slot {} out of range (0..{})",
                self.storage.default_slot,
                crate::file_manager::SLOT_COUNT
            ));
        }
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Directory used as the storage volume
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Slot used when a command gives none
    #[serde(default)]
    pub default_slot: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from("volume")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_slot: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing_subscriber` env filter, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDefaults {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_tempo")]
    pub tempo: f32,
    #[serde(default = "default_swing")]
    pub swing: i32,
    /// Scale name, matched case-insensitively
    #[serde(default = "default_scale")]
    pub scale: String,
}

fn default_project_name() -> String {
    crate::project::DEFAULT_NAME.to_string()
}

fn default_tempo() -> f32 {
    120.0
}

fn default_swing() -> i32 {
    50
}

fn default_scale() -> String {
    "major".to_string()
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            tempo: default_tempo(),
            swing: default_swing(),
            scale: default_scale(),
        }
    }
}

impl ProjectDefaults {
    pub fn scale(&self) -> Result<Scale> {
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.name().eq_ignore_ascii_case(&self.scale))
            .ok_or_else(|| anyhow!("Unknown scale: {:?}", self.scale))
    }

    /// A fresh project carrying these defaults
    pub fn new_project(&self) -> Result<Project> {
        let mut project = Project::new();
        project.set_name(&self.name);
        project.set_tempo(self.tempo, false);
        project.set_swing(self.swing, false);
        project.set_scale(self.scale()?);
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
storage:
  root: "/media/card"
  default_slot: 4
logging:
  filter: "seq_model=debug"
project:
  name: "LIVE"
  tempo: 96
  scale: "Dorian"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/media/card"));
        assert_eq!(config.storage.default_slot, 4);
        assert_eq!(config.logging.filter, "seq_model=debug");
        assert_eq!(config.project.tempo, 96.0);
        assert_eq!(config.project.swing, 50);
        assert_eq!(config.project.scale().unwrap(), Scale::Dorian);
    }

    #[test]
    fn test_defaults_for_empty_document() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
[storage]
root = "sd"

[project]
tempo = 140.0
scale = "minor pentatonic"
"#;
        let config = AppConfig::from_toml(text).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("sd"));
        assert_eq!(config.project.scale().unwrap(), Scale::MinorPentatonic);
    }

    #[test]
    fn test_save_and_load_by_extension() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.default_slot = 9;

        for name in ["seq.yaml", "seq.toml"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(AppConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.project.scale = "bebop".to_string();
        assert!(config.validate().is_err());
        config.project.scale = "major".to_string();
        config.storage.default_slot = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_new_project() {
        let defaults = ProjectDefaults {
            name: "JAM".to_string(),
            tempo: 2000.0,
            swing: 60,
            scale: "blues".to_string(),
        };
        let project = defaults.new_project().unwrap();
        assert_eq!(project.name(), "JAM");
        assert_eq!(project.tempo(), 1000.0);
        assert_eq!(project.swing(), 60);
        assert_eq!(project.scale(), Scale::Blues);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(AppConfig::load(dir.path().join("none.yaml")).is_err());
    }
}
