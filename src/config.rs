use crate::core::{DalError, Result};
use crate::diagnostics::LogLevel;
use crate::resolve::NameResolver;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration structure parsed from a TOML file.
///
/// Every section and field is optional; omitted values take the defaults
/// the crate-level entry points use.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub access: AccessConfig,
    pub resolution: ResolutionConfig,
    pub bundle: BundleConfig,
    pub fixture: FixtureConfig,
}

/// Accessor behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub log_level: LogLevel,
    pub combine: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        AccessConfig {
            log_level: LogLevel::Info,
            combine: true,
        }
    }
}

/// Physical table name candidates tried after the literal dataset name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        ResolutionConfig {
            prefixes: vec!["df_".to_string()],
            suffixes: vec!["_dta".to_string()],
        }
    }
}

/// Accessor-bundle entry naming conventions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub generic_entry: String,
    pub getter_prefix: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        BundleConfig {
            generic_entry: crate::legacy::DEFAULT_GENERIC_ENTRY.to_string(),
            getter_prefix: crate::legacy::DEFAULT_GETTER_PREFIX.to_string(),
        }
    }
}

/// Mock fixture location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub path: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            path: PathBuf::from(crate::mock::DEFAULT_FIXTURE_PATH),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    pub fn resolver(&self) -> NameResolver {
        NameResolver::new(self.resolution.prefixes.clone(), self.resolution.suffixes.clone())
    }
}

impl FromStr for Config {
    type Err = DalError;

    fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DalError::Config(e.to_string()))
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = unidal::config::load_config("unidal.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    content.parse()
}
