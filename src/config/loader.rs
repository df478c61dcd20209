use crate::config::schema::{PluginConfig, PluginOptions, SdkDefaults, ValidationError};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Plugin id looked up in a host `plugins` array.
pub const PLUGIN_ID: &str = "beacon-sdk";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    PluginNotDeclared {
        path: Option<PathBuf>,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path),
                source,
            },
            ConfigError::PluginNotDeclared { path: None } => {
                ConfigError::PluginNotDeclared { path: Some(path) }
            }
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read plugin config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse plugin config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse plugin config TOML: {}", source),
            },
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse plugin config JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse plugin config JSON: {}", source),
            },
            ConfigError::PluginNotDeclared { path } => match path {
                Some(path) => write!(
                    f,
                    "no '{}' entry in the plugins list of {}",
                    PLUGIN_ID,
                    path.display()
                ),
                None => write!(f, "no '{}' entry in the plugins list", PLUGIN_ID),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid plugin config ({}): {}", path.display(), source),
                None => write!(f, "invalid plugin config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::PluginNotDeclared { .. } => None,
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// On-disk TOML layout: a `[plugin]` table and an optional `[defaults]` table.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    plugin: PluginOptions,
    #[serde(default)]
    defaults: SdkDefaults,
}

/// Options plus the defaults that were in effect when they were loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadedOptions {
    pub options: PluginOptions,
    pub defaults: SdkDefaults,
}

impl LoadedOptions {
    pub fn validate(&self) -> Result<PluginConfig, ConfigError> {
        self.options
            .validate(&self.defaults)
            .map_err(|source| ConfigError::Validation { path: None, source })
    }
}

pub fn load_toml_str(input: &str) -> Result<LoadedOptions, ConfigError> {
    let file: ConfigFile = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    Ok(LoadedOptions {
        options: file.plugin,
        defaults: file.defaults,
    })
}

/// Parse JSON options.
///
/// Accepts either a bare options object or a host config (`app.json` style)
/// whose `plugins` array holds a `["beacon-sdk", { ... }]` entry, optionally
/// nested under a top-level `expo` key.
pub fn load_json_str(input: &str) -> Result<LoadedOptions, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|source| ConfigError::Json { path: None, source })?;

    let host = value.get("expo").unwrap_or(&value);
    let options_value = match host.get("plugins") {
        Some(plugins) => {
            find_plugin_entry(plugins).ok_or(ConfigError::PluginNotDeclared { path: None })?
        }
        None => value.clone(),
    };

    let options: PluginOptions = serde_json::from_value(options_value)
        .map_err(|source| ConfigError::Json { path: None, source })?;
    Ok(LoadedOptions {
        options,
        defaults: SdkDefaults::default(),
    })
}

fn is_plugin_name(name: &str) -> bool {
    name == PLUGIN_ID || name.ends_with(&format!("/{PLUGIN_ID}"))
}

fn find_plugin_entry(plugins: &serde_json::Value) -> Option<serde_json::Value> {
    let empty = || serde_json::Value::Object(serde_json::Map::new());

    plugins.as_array()?.iter().find_map(|entry| match entry {
        serde_json::Value::Array(pair) => {
            let name = pair.first()?.as_str()?;
            if !is_plugin_name(name) {
                return None;
            }
            match pair.get(1) {
                Some(options) if !options.is_null() => Some(options.clone()),
                _ => Some(empty()),
            }
        }
        serde_json::Value::String(name) if is_plugin_name(name) => Some(empty()),
        _ => None,
    })
}

/// Load raw options from a `.toml` or `.json` file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadedOptions, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let loaded = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_json_str(&contents),
        _ => load_toml_str(&contents),
    };
    loaded.map_err(|error| error.with_path(path))
}

/// Load and validate in one step.
pub fn load_config(path: impl AsRef<Path>) -> Result<PluginConfig, ConfigError> {
    let path = path.as_ref();
    load_from_path(path)?
        .validate()
        .map_err(|error| error.with_path(path))
}
