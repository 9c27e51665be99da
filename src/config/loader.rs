// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, environment overrides

use crate::config::constants::{ENV_PREFIX, ENV_SECTION_SEPARATOR};
use crate::config::StitchConfig;
use crate::error::{StitchError, StitchResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader merging several TOML files over the built-in defaults
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create loader with no files; only defaults and environment apply
    pub fn new() -> Self {
        Self::with_paths(Vec::new())
    }

    /// Create loader with custom paths, later paths overriding earlier ones
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> StitchResult<StitchConfig> {
        let mut merged = toml::Value::try_from(StitchConfig::default()).map_err(|e| {
            StitchError::ConfigParse {
                source_name: "defaults".to_string(),
                reason: e.to_string(),
            }
        })?;

        for config_path in &self.config_paths {
            let file_config = Self::load_config_file(config_path)?;
            debug!(path = %config_path.display(), "merging configuration file");
            Self::merge_toml_values(&mut merged, file_config);
        }

        self.apply_environment_overrides(&mut merged);

        let config: StitchConfig = merged.try_into().map_err(|e: toml::de::Error| {
            StitchError::ConfigParse {
                source_name: "merged configuration".to_string(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate a single file without merging it into anything
    pub fn validate_config_file<P: AsRef<Path>>(path: P) -> StitchResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: StitchConfig = toml::from_str(&content).map_err(|e| StitchError::ConfigParse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(config: &StitchConfig, path: P) -> StitchResult<()> {
        std::fs::write(path, config.to_toml_string()?)?;
        Ok(())
    }

    fn load_config_file(path: &Path) -> StitchResult<toml::Value> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StitchError::ConfigParse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            // Arrays (bands, notches) replace wholesale
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    /// `STITCH_SELECTION__NOISE_MULTIPLIER=2.0` sets `selection.noise_multiplier`
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let path: Vec<String> = stripped
                .split(ENV_SECTION_SEPARATOR)
                .map(|part| part.to_lowercase())
                .collect();
            if path.iter().any(|part| part.is_empty()) {
                continue;
            }

            debug!(variable = %key, "applying environment override");
            Self::set_nested_value(config, &path, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                return;
            };
            current = table
                .entry(part.clone())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }

        if let toml::Value::Table(table) = current {
            // Integers given for float fields stay valid floats
            let value = match (table.get(last), value) {
                (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
                (_, value) => value,
            };
            table.insert(last.clone(), value);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
