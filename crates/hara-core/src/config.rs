//! Matching and output configuration (parsed from hara.toml).
//!
//! Every field is optional in the file; absent sections fall back to the
//! defaults the matcher was tuned with.

use crate::error::HaraError;
use crate::normalize::NormalizeOptions;
use crate::similarity::{Algorithm, Scorer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the sheet results are written to.
pub const RESULT_SHEET_NAME: &str = "RESULT";

/// Settings for the exact/fuzzy matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub fuzzy_enabled: bool,
    /// Minimum combined score (0–100) a fuzzy candidate needs.
    pub fuzzy_threshold: u8,
    pub fuzzy_algorithm: Algorithm,
    pub case_sensitive: bool,
    pub strip_whitespace: bool,
    /// Weight of the scenario score in the combined fuzzy score.
    pub os_weight: f64,
    /// Weight of the hazard score in the combined fuzzy score.
    pub hazard_weight: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_enabled: true,
            fuzzy_threshold: 80,
            fuzzy_algorithm: Algorithm::Ratio,
            case_sensitive: false,
            strip_whitespace: true,
            os_weight: 0.70,
            hazard_weight: 0.30,
        }
    }
}

impl MatchConfig {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            case_sensitive: self.case_sensitive,
            strip_whitespace: self.strip_whitespace,
        }
    }

    pub fn scorer(&self) -> Scorer {
        Scorer::new(self.fuzzy_algorithm, self.normalize_options())
    }

    /// Reject settings the matcher cannot honour.
    pub fn validate(&self) -> Result<(), HaraError> {
        if self.fuzzy_threshold > 100 {
            return Err(HaraError::Config(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                self.fuzzy_threshold
            )));
        }
        for (name, weight) in [
            ("os_weight", self.os_weight),
            ("hazard_weight", self.hazard_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(HaraError::Config(format!(
                    "{name} must be a finite, non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }

    /// One-line description for run logs.
    pub fn describe(&self) -> String {
        format!(
            "Fuzzy: {}, Threshold: {}%",
            if self.fuzzy_enabled { "True" } else { "False" },
            self.fuzzy_threshold
        )
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Sheet the result table is added to (or replaces) in the workbook.
    pub result_sheet: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            result_sheet: RESULT_SHEET_NAME.into(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaraConfig {
    pub matching: MatchConfig,
    pub output: OutputConfig,
}

impl HaraConfig {
    /// Load from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            fuzzy = config.matching.fuzzy_enabled,
            threshold = config.matching.fuzzy_threshold,
            algorithm = %config.matching.fuzzy_algorithm,
            "loaded config"
        );
        Ok(config)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.matching.validate()?;
        if config.output.result_sheet.trim().is_empty() {
            return Err(HaraError::Config("output.result_sheet must not be empty".into()).into());
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
