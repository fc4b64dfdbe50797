// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::columns::ColumnCandidates;
use crate::report::Branding;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    pub columns: ColumnCandidates,
    pub branding: Branding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("Ecommerce_Sales_Data_2024_2025.csv"),
            output_dir: PathBuf::from("output"),
            preview_rows: 100,
            columns: ColumnCandidates::default(),
            branding: Branding::default(),
        }
    }
}

/// Read `path`, or fall back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let config_str = toml::to_string_pretty(config)?;
    fs::write(path, config_str).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_config(&dir.path().join("absent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "preview_rows = 25\n\n[columns]\namount = [\"Net\"]\n\n[branding]\ntitle = \"Q3 Review\"\n",
        )?;

        let config = load_config(&path)?;
        assert_eq!(config.preview_rows, 25);
        assert_eq!(config.columns.amount, vec!["Net".to_string()]);
        assert_eq!(config.columns.date, ColumnCandidates::default().date);
        assert_eq!(config.branding.title, "Q3 Review");
        assert_eq!(config.branding.banner, Branding::default().banner);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.data_path = PathBuf::from("data/orders.csv");
        config.columns.category = vec!["Segment".to_string()];

        save_config(&config, &path)?;
        assert_eq!(load_config(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "preview_rows = \"many\"")?;
        assert!(load_config(&path).is_err());
        Ok(())
    }
}
