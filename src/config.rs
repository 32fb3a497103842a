//! Layered configuration for the county pipeline.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`COUNTY_PLANS_*`, `__` separates sections)
//! 2. A TOML file (`county-plans.toml` in the working directory, or an explicit path)
//! 3. Built-in defaults (the file names the filing export ships with)
//!
//! `COUNTY_PLANS_DATA__CROSSWALK=/srv/hud.csv` maps to `data.crosswalk`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "COUNTY_PLANS_";
pub const DEFAULT_CONFIG_FILE: &str = "county-plans.toml";
pub const DEFAULT_BOUNDARY_URL: &str =
    "https://raw.githubusercontent.com/plotly/datasets/master/geojson-counties-fips.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A configuration field has an invalid value.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

/// Input table locations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataPaths {
    pub filings: PathBuf,
    pub crosswalk: PathBuf,
    pub county_names: PathBuf,
    pub business_codes: PathBuf,
    /// Optional state label coordinates; absent means no labels
    #[serde(default)]
    pub state_centers: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            filings: PathBuf::from("F_5500_sf_2023_latest_prunned.csv"),
            crosswalk: PathBuf::from("hud_zip_crosswalk.csv"),
            county_names: PathBuf::from("fips_county_names.csv"),
            business_codes: PathBuf::from("business_codes.csv"),
            state_centers: Some(PathBuf::from("state_names_and_coords.json")),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Where county polygons come from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BoundaryConfig {
    pub url: String,
    /// Local GeoJSON file; takes precedence over `url` when set
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// SQLite cache used as a fallback when the download fails
    #[serde(default)]
    pub cache: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            url: DEFAULT_BOUNDARY_URL.to_string(),
            file: None,
            cache: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub data: DataPaths,
    #[serde(default)]
    pub boundary: BoundaryConfig,
}

impl PipelineConfig {
    /// Load from defaults, `county-plans.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Same as [`load`](Self::load) but with an explicit TOML file.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: PipelineConfig = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match config_file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boundary.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "boundary.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.boundary.file.is_none() && self.boundary.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "boundary.url".to_string(),
                reason: "either boundary.url or boundary.file must be set".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_use_export_file_names() {
        let config = PipelineConfig::default();
        assert_eq!(config.data.crosswalk, PathBuf::from("hud_zip_crosswalk.csv"));
        assert_eq!(config.boundary.url, DEFAULT_BOUNDARY_URL);
        assert_eq!(config.boundary.timeout_secs, 30);
        assert!(config.boundary.cache.is_none());
    }

    #[test]
    fn test_figment_builds_without_files() {
        Jail::expect_with(|_jail| {
            let config = PipelineConfig::load().expect("defaults extract");
            assert_eq!(config, PipelineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [data]
                crosswalk = "toml_crosswalk.csv"

                [boundary]
                file = "counties.geojson"
                timeout_secs = 5
                "#,
            )?;
            jail.set_env("COUNTY_PLANS_DATA__CROSSWALK", "env_crosswalk.csv");

            let config = PipelineConfig::load().expect("config loads");
            assert_eq!(config.data.crosswalk, PathBuf::from("env_crosswalk.csv"));
            assert_eq!(config.boundary.file, Some(PathBuf::from("counties.geojson")));
            assert_eq!(config.boundary.timeout_secs, 5);
            // untouched keys keep their defaults
            assert_eq!(config.data.county_names, PathBuf::from("fips_county_names.csv"));
            Ok(())
        });
    }

    #[test]
    fn test_zero_timeout_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("COUNTY_PLANS_BOUNDARY__TIMEOUT_SECS", "0");
            let err = PipelineConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "boundary.timeout_secs"));
            Ok(())
        });
    }
}
