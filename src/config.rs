//! User configuration management
//!
//! Configuration is stored as JSON at `<config dir>/game-package-manager/config.json`
//! (or `$GPM_CONFIG_DIR/config.json`). It is loaded once per invocation and
//! passed to the operations that need it; nothing here is global.
//!
//! # Examples
//!
//! ```no_run
//! use gpm::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load()?;
//! println!("Unreal release registry: {}", config.unreal.release);
//!
//! config.set("unreal.snapshot", "https://nexus.example.com/repository/npm-snapshot/")?;
//! config.save()?;
//! # Ok(())
//! # }
//! ```

use crate::project::Engine;
use crate::registry::{PrereleaseRule, RegistryConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "GPM_CONFIG_DIR";

const CONFIG_FILE: &str = "config.json";

/// User configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Unreal (npm) registries
    #[serde(default = "default_unreal_registry")]
    pub unreal: RegistryConfig,

    /// Unity (UPM) registries
    #[serde(default)]
    pub unity: RegistryConfig,

    /// How pre-release versions are recognised when choosing a registry
    #[serde(default)]
    pub prerelease_rule: PrereleaseRule,

    /// Plugin sync settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Package manager subprocess settings
    #[serde(default)]
    pub subprocess: SubprocessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// npm scope whose modules are copied into `Plugins/`
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Remove each plugin's destination folder before copying
    #[serde(default)]
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessConfig {
    /// Package manager executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Kill the package manager after this many seconds (0 = wait forever)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_unreal_registry() -> RegistryConfig {
    RegistryConfig {
        release: "https://registry.npmjs.org/".to_string(),
        snapshot: String::new(),
    }
}

fn default_scope() -> String {
    "@ue-plugins".to_string()
}

fn default_program() -> String {
    if cfg!(windows) {
        "npm.cmd".to_string()
    } else {
        "npm".to_string()
    }
}

fn default_timeout_seconds() -> u64 {
    600
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            clean: false,
        }
    }
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unreal: default_unreal_registry(),
            unity: RegistryConfig::default(),
            prerelease_rule: PrereleaseRule::default(),
            sync: SyncConfig::default(),
            subprocess: SubprocessConfig::default(),
        }
    }
}

/// Keys accepted by [`Config::set`]
pub const SETTABLE_KEYS: &[&str] = &[
    "unreal.release",
    "unreal.snapshot",
    "unity.release",
    "unity.snapshot",
    "prerelease_rule",
    "sync.scope",
    "sync.clean",
    "subprocess.program",
    "subprocess.timeout_seconds",
];

impl Config {
    /// Get the default config file path
    ///
    /// Uses GPM_CONFIG_DIR if set, otherwise the platform config directory
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            if !config_dir.is_empty() {
                return Ok(PathBuf::from(config_dir).join(CONFIG_FILE));
            }
        }

        let base = dirs::config_dir()
            .ok_or_else(|| Error::Other("Could not find a configuration directory".to_string()))?;

        Ok(base.join("game-package-manager").join(CONFIG_FILE))
    }

    /// Load config from the default path
    ///
    /// A missing file yields the defaults. A corrupt file is reported as a
    /// warning and also yields the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "configuration file is corrupt, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Registries for an engine
    pub fn registries(&self, engine: Engine) -> &RegistryConfig {
        match engine {
            Engine::Unreal => &self.unreal,
            Engine::Unity => &self.unity,
        }
    }

    /// Set a value by dotted key (see [`SETTABLE_KEYS`])
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "unreal.release" => self.unreal.release = registry_url(value)?,
            "unreal.snapshot" => self.unreal.snapshot = registry_url(value)?,
            "unity.release" => self.unity.release = registry_url(value)?,
            "unity.snapshot" => self.unity.snapshot = registry_url(value)?,
            "prerelease_rule" => self.prerelease_rule = value.parse()?,
            "sync.scope" => {
                if value.trim().is_empty() {
                    return Err(Error::Other("sync.scope cannot be empty".to_string()));
                }
                self.sync.scope = value.trim().to_string();
            }
            "sync.clean" => self.sync.clean = parse_bool(value)?,
            "subprocess.program" => {
                if value.trim().is_empty() {
                    return Err(Error::Other("subprocess.program cannot be empty".to_string()));
                }
                self.subprocess.program = value.trim().to_string();
            }
            "subprocess.timeout_seconds" => {
                self.subprocess.timeout_seconds = value.parse().map_err(|_| {
                    Error::Other(format!("Invalid number of seconds: '{}'", value))
                })?
            }
            _ => {
                return Err(Error::Other(format!(
                    "Unknown configuration key '{}'. Available keys: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Validate a registry URL; the empty string clears it
fn registry_url(value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    let url = url::Url::parse(value)
        .map_err(|e| Error::Other(format!("Invalid registry URL '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" | "file" => Ok(value.to_string()),
        other => Err(Error::Other(format!(
            "Unsupported registry URL scheme '{}' in '{}'",
            other, value
        ))),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .map_err(|_| Error::Other("Invalid boolean value. Use 'true' or 'false'".to_string()))
}
