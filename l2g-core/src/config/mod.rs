//! Configuration types for local2global

use crate::L2gError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable pointing at a TOML config file
pub const CONFIG_ENV: &str = "L2G_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub apply: ApplyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyConfig {
    /// Namespace prefix carried by every taxonomy key
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_order_by")]
    pub default_order_by: String,
    #[serde(default = "default_enable_archives")]
    pub enable_archives: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchingConfig {
    /// Term suggestions are accepted only above this score
    #[serde(default = "default_term_threshold")]
    pub term_threshold: f64,
    /// Attribute suggestions are accepted only above this score
    #[serde(default = "default_attribute_threshold")]
    pub attribute_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_enabled")]
    pub enabled: bool,
    /// Titles longer than this are ignored; the SKU is still searched
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyConfig {
    #[serde(default = "default_auto_create_terms")]
    pub auto_create_terms: bool,
    #[serde(default = "default_create_backup")]
    pub create_backup: bool,
    #[serde(default = "default_sync_variations")]
    pub sync_variations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,
    #[serde(default = "default_level")]
    pub level: String,
    /// Empty disables the audit file
    #[serde(default)]
    pub audit_file: String,
}

// Default value functions
fn default_prefix() -> String { "pa_".to_string() }
fn default_order_by() -> String { "name".to_string() }
fn default_enable_archives() -> bool { false }
fn default_term_threshold() -> f64 { 0.5 }
fn default_attribute_threshold() -> f64 { 0.7 }
fn default_inference_enabled() -> bool { true }
fn default_max_title_length() -> usize { 160 }
fn default_max_candidates() -> usize { 3 }
fn default_auto_create_terms() -> bool { false }
fn default_create_backup() -> bool { false }
fn default_sync_variations() -> bool { true }
fn default_logging_enabled() -> bool { true }
fn default_level() -> String { "info".to_string() }

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            default_order_by: default_order_by(),
            enable_archives: default_enable_archives(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            term_threshold: default_term_threshold(),
            attribute_threshold: default_attribute_threshold(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_inference_enabled(),
            max_title_length: default_max_title_length(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            auto_create_terms: default_auto_create_terms(),
            create_backup: default_create_backup(),
            sync_variations: default_sync_variations(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            level: default_level(),
            audit_file: String::new(),
        }
    }
}

impl Config {
    /// Load from `L2G_CONFIG` when set, defaults otherwise
    pub fn from_env_or_default() -> Result<Config, L2gError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => load_config(path),
            _ => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<(), L2gError> {
        for (name, value) in [
            ("matching.term_threshold", self.matching.term_threshold),
            ("matching.attribute_threshold", self.matching.attribute_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(L2gError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.inference.max_candidates == 0 {
            return Err(L2gError::Configuration(
                "inference.max_candidates must be greater than zero".to_string(),
            ));
        }

        if self.taxonomy.prefix.trim().is_empty() {
            return Err(L2gError::Configuration(
                "taxonomy.prefix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, L2gError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), L2gError> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
