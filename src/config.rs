//! Engine configuration.
//!
//! Settings load from TOML and can be overridden through environment
//! variables:
//! - `FUZZY_SAMPLE_COUNT` - samples used when defuzzifying
//! - `FUZZY_DEFUZZIFIER` - default method for combiners
//! - `FUZZY_NODATA_VALUE` - raw value that marks missing data
//! - `FUZZY_NODATA_IGNORE` - ignore missing data in arithmetic (true/false)
//! - `FUZZY_NODATA_SUBSTITUTE` - substitute for missing data
//!
//! ```toml
//! sample_count = 1000
//! default_defuzzifier = "centroid"
//!
//! [no_data]
//! value = -99999.0
//! ignore = false
//! substitute = 0.0
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};
use crate::nodata::NoData;
use crate::ops::DefuzzificationOp;

pub const DEFAULT_SAMPLE_COUNT: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Samples taken across a result's range when defuzzifying
    pub sample_count: usize,
    /// Method combiners use for names they have no explicit method for
    pub default_defuzzifier: DefuzzificationOp,
    pub no_data: NoDataConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            default_defuzzifier: DefuzzificationOp::Centroid,
            no_data: NoDataConfig::default(),
        }
    }
}

/// How missing data is spelled in raw records and how it behaves once read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoDataConfig {
    /// Raw value marking a missing reading; also written for skipped outputs
    pub value: f64,
    pub ignore: bool,
    pub substitute: Option<f64>,
}

impl Default for NoDataConfig {
    fn default() -> Self {
        Self {
            value: -99999.,
            ignore: false,
            substitute: None,
        }
    }
}

impl NoDataConfig {
    pub fn sentinel(&self) -> NoData {
        NoData {
            ignore: self.ignore,
            substitute: self.substitute,
        }
    }

    pub fn matches(&self, raw: f64) -> bool {
        raw == self.value || (raw.is_nan() && self.value.is_nan())
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FuzzyError::Config(format!("failed to read {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "loading engine config");

        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The sentinel raw no-data readings turn into for this run.
    pub fn sentinel(&self) -> NoData {
        self.no_data.sentinel()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_count < 2 {
            return Err(FuzzyError::Config(format!(
                "sample_count must be at least 2, got {}",
                self.sample_count
            )));
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
            val.trim()
                .parse()
                .map_err(|_| FuzzyError::Config(format!("{key} has an invalid value \"{val}\"")))
        }

        if let Some(val) = var("FUZZY_SAMPLE_COUNT") {
            self.sample_count = parse("FUZZY_SAMPLE_COUNT", &val)?;
        }
        if let Some(val) = var("FUZZY_DEFUZZIFIER") {
            self.default_defuzzifier = val.parse()?;
        }
        if let Some(val) = var("FUZZY_NODATA_VALUE") {
            self.no_data.value = parse("FUZZY_NODATA_VALUE", &val)?;
        }
        if let Some(val) = var("FUZZY_NODATA_IGNORE") {
            self.no_data.ignore = parse("FUZZY_NODATA_IGNORE", &val)?;
        }
        if let Some(val) = var("FUZZY_NODATA_SUBSTITUTE") {
            self.no_data.substitute = match val.trim() {
                "" | "none" => None,
                v => Some(parse("FUZZY_NODATA_SUBSTITUTE", v)?),
            };
        }

        self.validate()
    }
}
