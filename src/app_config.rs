// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::core::models::Rule;

/// Config file used when `--config` isn't given. It's optional.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/addrfix/addrfix.toml";

/// Prefix for environment overrides, e.g. `ADDRFIX_RULES__CITY_THRESHOLD=0.2`
/// (note the double underscore to reach into sections).
pub const ENV_PREFIX: &str = "ADDRFIX";

/// Full application configuration, after defaults, config file, environment,
/// and CLI flags have been merged.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub rules: RulesConfig,
    pub report: ReportConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory holding `fa.csv`, `fe.csv`, and `r_fe_fa.csv`.
    pub input_dir: String,
    /// Directory the cleaned tables are written to.
    pub output_dir: String,
}

impl DataConfig {
    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.input_dir).as_ref())
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_dir).as_ref())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RulesConfig {
    /// CLI names of the rules to run. They always run in their fixed order.
    pub enabled: Vec<String>,
    /// Normalised edit distance below which street spellings are merged.
    pub street_threshold: f64,
    /// Normalised edit distance below which city spellings are merged.
    pub city_threshold: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: Rule::iter().map(|r| r.to_string()).collect(),
            street_threshold: 0.10,
            city_threshold: 0.10,
        }
    }
}

impl RulesConfig {
    /// Enabled rules in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error naming any unknown rule.
    pub fn enabled_rules(&self) -> Result<Vec<Rule>> {
        let mut chosen = Vec::new();
        for name in &self.enabled {
            let rule = Rule::from_str(name.trim()).map_err(|_| {
                anyhow!(
                    "Unknown rule {:?}; expected one of {:?}",
                    name,
                    Rule::iter().map(|r| r.to_string()).collect::<Vec<_>>()
                )
            })?;
            chosen.push(rule);
        }
        Ok(Rule::iter().filter(|r| chosen.contains(r)).collect())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("street_threshold", self.street_threshold),
            ("city_threshold", self.city_threshold),
        ]
        .iter()
        {
            if !(0.0..=1.0).contains(value) {
                bail!("rules.{} must be between 0 and 1, got {}", name, value);
            }
        }
        self.enabled_rules().map(|_| ())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Number of sample proposals/splits printed per section.
    pub samples: usize,
    /// Run the shared-address split pass after resolving proposals.
    pub split_shared_addresses: bool,
}

impl AppConfig {
    /// Deserializes and validates merged settings.
    pub fn from_settings(settings: config::Config) -> Result<AppConfig> {
        let app_config: AppConfig = settings.try_into()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Checks threshold ranges and rule names.
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()
    }
}

/// Settings with every key at its default value.
pub fn default_settings() -> Result<config::Config> {
    let defaults = RulesConfig::default();
    let mut settings = config::Config::default();
    settings
        .set_default("data.input_dir", "data")?
        .set_default("data.output_dir", "data_cleaned_split_all_rules")?
        .set_default("rules.enabled", defaults.enabled)?
        .set_default("rules.street_threshold", defaults.street_threshold)?
        .set_default("rules.city_threshold", defaults.city_threshold)?
        .set_default("report.samples", 5i64)?
        .set_default("report.split_shared_addresses", false)?;
    Ok(settings)
}

/// Builds settings from defaults, then the config file, then environment
/// variables.
///
/// A config file given explicitly must exist; the default one is optional.
pub fn load_settings(config_file: Option<&str>) -> Result<config::Config> {
    let mut settings = default_settings()?;

    if let Some(config_file) = config_file {
        settings
            .merge(config::File::with_name(&shellexpand::tilde(config_file)))
            .with_context(|| format!("Failed to load config file {}", config_file))?;
    } else {
        settings.merge(
            config::File::with_name(&shellexpand::tilde(DEFAULT_CONFIG_PATH)).required(false),
        )?;
    }

    // Override with environment variables, if present
    settings.merge(config::Environment::with_prefix(ENV_PREFIX).separator("__"))?;

    Ok(settings)
}
