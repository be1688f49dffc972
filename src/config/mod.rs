//! Configuration parsing and validation.
//!
//! Handles loading the run configuration from a YAML file, with environment
//! variable interpolation so passwords can stay out of the file itself.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::{
    BadDelimiterSnafu, ConfigError, EmptyDatabaseSnafu, EmptyHostSnafu, EmptyInputPathSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Main configuration for a load run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub inputs: InputConfig,
}

/// Connection parameters for the warehouse database.
///
/// Only these options are recognized; anything else in the YAML is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseConfig {
    pub host: String,
    /// Port (default: 5432).
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

/// Paths to the three CSV extracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Product extract (`id;name;alcohol_content_ml;price`).
    pub product: PathBuf,
    /// Member extract (`id;gender;year`).
    pub member: PathBuf,
    /// Sale extract (`timestamp;product_id;member_id;price`).
    pub sale: PathBuf,
    /// Field delimiter (default: `;`).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ';'
}

impl InputConfig {
    /// The delimiter as the single byte the CSV reader wants.
    ///
    /// Validation guarantees the configured character is ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let result = vars::interpolate(&content);
        if !result.is_ok() {
            let message = result.errors.join("\n");
            return EnvInterpolationSnafu { message }.fail();
        }

        let config: Config = serde_yaml::from_str(&result.text).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.warehouse.host.is_empty(), EmptyHostSnafu);
        ensure!(!self.warehouse.dbname.is_empty(), EmptyDatabaseSnafu);
        ensure!(
            self.inputs.delimiter.is_ascii(),
            BadDelimiterSnafu {
                delimiter: self.inputs.delimiter
            }
        );

        let inputs = [
            ("product", &self.inputs.product),
            ("member", &self.inputs.member),
            ("sale", &self.inputs.sale),
        ];
        for (input, path) in inputs {
            ensure!(!path.as_os_str().is_empty(), EmptyInputPathSnafu { input });
        }
        Ok(())
    }
}
