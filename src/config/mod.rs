pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{
    load_config, load_from_path, load_json_str, load_toml_str, ConfigError, LoadedOptions,
    PLUGIN_ID,
};
pub use schema::{
    Credentials, PluginConfig, PluginOptions, SdkDefaults, ValidationError, ValidationIssue,
    MINIMUM_SDK_VERSION,
};
pub use version::{compare, version_at_least, MalformedVersion};
