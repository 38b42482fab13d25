//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/proptree/proptree.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `PROPTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::de::{value::Error as ValueError, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{DecodePolicy, ModelOptions, ReferencePolicy};

/// How cloning treats references into the cloned subtree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CloneConfig {
    pub references: ReferencePolicy,
}

/// What a failing decode leaves in the model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecodeConfig {
    pub on_error: DecodePolicy,
}

/// Raw settings for intermediate parsing: `None` means "not specified,
/// inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub clone: RawCloneConfig,
    pub decode: RawDecodeConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCloneConfig {
    pub references: Option<ReferencePolicy>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDecodeConfig {
    pub on_error: Option<DecodePolicy>,
}

/// Unified configuration for proptree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub clone: CloneConfig,
    pub decode: DecodeConfig,
}

/// Get the XDG config directory for proptree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "proptree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("proptree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            clone: CloneConfig {
                references: overlay.clone.references.unwrap_or(self.clone.references),
            },
            decode: DecodeConfig {
                on_error: overlay.decode.on_error.unwrap_or(self.decode.on_error),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// A missing global file is skipped; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            debug!("explicit config: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current, env_source())
    }

    /// Apply `PROPTREE_*` variables as explicit overrides, e.g.
    /// `PROPTREE_CLONE__REFERENCES=rebind-to-clone`.
    fn apply_env_overrides(mut settings: Self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("clone.references") {
            settings.clone.references = parse_enum("clone.references", &val)?;
        }
        if let Ok(val) = config.get_string("decode.on_error") {
            settings.decode.on_error = parse_enum("decode.on_error", &val)?;
        }

        Ok(settings)
    }

    /// Options handed to every model built with these settings.
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            references: self.clone.references,
            on_decode_error: self.decode.on_error,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# proptree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/proptree/proptree.toml
#   Explicit: proptree --config <file>
#   Env:      PROPTREE_* environment variables, e.g. PROPTREE_CLONE__REFERENCES

[clone]
# References of a clone that pointed into the cloned subtree:
#   "preserve-original"  re-resolve by name in the clone's context
#   "rebind-to-clone"    point at the matching node of the clone
# references = "preserve-original"

[decode]
# A decode that fails halfway:
#   "discard"       validate first, leave the model untouched on error
#   "keep-partial"  keep whatever was built before the error
# on_error = "discard"
"#
        .to_string()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("PROPTREE")
        .prefix_separator("_")
        .separator("__")
}

/// Parse a kebab-case policy name the same way the TOML layer does.
fn parse_enum<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ApplicationError> {
    T::deserialize(raw.into_deserializer()).map_err(|e: ValueError| ApplicationError::Config {
        message: format!("{key}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
