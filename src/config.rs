//! Configuration for the initializer service

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "INITIALIZER";

/// Configuration for the initializer service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding one subdirectory per template
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,

    /// JSON document served verbatim at `/manifest.json`
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Classification keys of files that get placeholder substitution
    #[serde(default = "default_process_extensions")]
    pub process_extensions: Vec<String>,

    /// Package path in template file names that is replaced by the caller's package
    #[serde(default = "default_placeholder_package_path")]
    pub placeholder_package_path: String,

    /// Cloud metadata API settings
    #[serde(default)]
    pub capella: CapellaConfig,
}

/// Settings for the cloud metadata client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapellaConfig {
    /// Base URL of the management API
    #[serde(default = "default_capella_base_url")]
    pub base_url: String,

    /// API access key; cluster lookups are disabled without it
    #[serde(default)]
    pub access_key: Option<String>,

    /// API secret key
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_capella_timeout")]
    pub timeout_secs: u64,
}

impl Default for CapellaConfig {
    fn default() -> Self {
        CapellaConfig {
            base_url: default_capella_base_url(),
            access_key: None,
            secret_key: None,
            timeout_secs: default_capella_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            templates_path: default_templates_path(),
            manifest_path: default_manifest_path(),
            process_extensions: default_process_extensions(),
            placeholder_package_path: default_placeholder_package_path(),
            capella: CapellaConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file, overridden by
    /// `INITIALIZER__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("process_extensions")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Processable extensions as a set.
    pub fn process_extension_set(&self) -> HashSet<String> {
        self.process_extensions.iter().cloned().collect()
    }
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("templates")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("templates/manifest.json")
}

fn default_process_extensions() -> Vec<String> {
    ["md", "adoc", "java", "xml", "json", "properties", "gradle"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_placeholder_package_path() -> String {
    crate::archive::PLACEHOLDER_PACKAGE_PATH.to_string()
}

fn default_capella_base_url() -> String {
    crate::cloud::CapellaClient::DEFAULT_BASE_URL.to_string()
}

fn default_capella_timeout() -> u64 {
    10
}
