//! Publishing a plugin or package folder to a registry
//!
//! Publishing is two steps: describe the folder as an npm package (a
//! [`PackageDraft`] written into its `package.json`), then run `npm publish`
//! against the release or snapshot registry picked from the draft's version.

use crate::config::Config;
use crate::manifest::{read_object, write_object, UPlugin};
use crate::package_manager::{CommandOutput, PackageManager};
use crate::project::Engine;
use crate::registry::{select_channel, Channel};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PUBLISH_VERSION: &str = "1.0.0";

/// Fields gpm manages in the published `package.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDraft {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for PackageDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: DEFAULT_PUBLISH_VERSION.to_string(),
            description: String::new(),
            keywords: Vec::new(),
        }
    }
}

/// Guess which engine a package folder targets
///
/// A top-level `.uplugin` means Unreal; a `package.json` with a `unity` field
/// means Unity; anything else is treated as Unreal.
pub fn detect_package_engine<P: AsRef<Path>>(dir: P) -> Result<Engine> {
    let dir = dir.as_ref();
    if UPlugin::find(dir)?.is_some() {
        return Ok(Engine::Unreal);
    }

    let package_json = dir.join("package.json");
    if package_json.is_file() {
        if let Ok(document) = read_object(&package_json) {
            if document.contains_key("unity") {
                return Ok(Engine::Unity);
            }
        }
    }

    Ok(Engine::Unreal)
}

/// Build a draft from what the folder already declares
///
/// `package.json` fields are used when present. For Unreal plugins without a
/// declared name, the `.uplugin` descriptor supplies the name (file stem,
/// lowercased), description and version; without one, the folder name is
/// used.
pub fn analyze_package<P: AsRef<Path>>(dir: P, engine: Engine) -> Result<PackageDraft> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Other(format!(
            "Package directory does not exist: {}",
            dir.display()
        )));
    }

    let mut draft = PackageDraft::default();

    let package_json = dir.join("package.json");
    if package_json.is_file() {
        let document = read_object(&package_json)?;
        if let Some(name) = document.get("name").and_then(Value::as_str) {
            draft.name = name.to_string();
        }
        if let Some(version) = document.get("version").and_then(Value::as_str) {
            draft.version = version.to_string();
        }
        if let Some(description) = document.get("description").and_then(Value::as_str) {
            draft.description = description.to_string();
        }
        if let Some(keywords) = document.get("keywords").and_then(Value::as_array) {
            draft.keywords = keywords
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
    }

    if engine == Engine::Unreal && draft.name.is_empty() {
        match UPlugin::find(dir)? {
            Some(uplugin_path) => {
                let uplugin = UPlugin::load(&uplugin_path)?;
                draft.name = UPlugin::name(&uplugin_path)
                    .unwrap_or_default()
                    .to_lowercase();
                if draft.description.is_empty() {
                    draft.description = uplugin
                        .description
                        .filter(|d| !d.is_empty())
                        .or(uplugin.friendly_name)
                        .unwrap_or_default();
                }
                if !package_json.is_file() {
                    if let Some(version) = uplugin.version_name.filter(|v| !v.is_empty()) {
                        draft.version = version;
                    }
                }
            }
            None => {
                draft.name = folder_name(dir).to_lowercase();
                if draft.description.is_empty() {
                    draft.description = "Imported from .uplugin".to_string();
                }
            }
        }
    }

    Ok(draft)
}

fn folder_name(dir: &Path) -> String {
    let resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Merge `draft` into `dir/package.json`, keeping every other field
pub fn write_package_json(dir: &Path, draft: &PackageDraft) -> Result<PathBuf> {
    let path = dir.join("package.json");
    let mut document = if path.is_file() {
        read_object(&path)?
    } else {
        Map::new()
    };

    document.insert("name".to_string(), Value::String(draft.name.clone()));
    document.insert("version".to_string(), Value::String(draft.version.clone()));
    document.insert(
        "description".to_string(),
        Value::String(draft.description.clone()),
    );
    document.insert(
        "keywords".to_string(),
        Value::Array(draft.keywords.iter().cloned().map(Value::String).collect()),
    );

    write_object(&path, &document)?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub registry: String,
    pub channel: Channel,
    pub package_json: PathBuf,
    /// `None` for a dry run
    pub output: Option<CommandOutput>,
}

/// Publish the folder `dir` as `draft`
///
/// The registry is selected before anything is written; when none is
/// configured for the draft's version the call fails with
/// [`Error::NoRegistryConfigured`] and the folder is left untouched.
pub fn publish(
    dir: &Path,
    draft: &PackageDraft,
    engine: Engine,
    config: &Config,
    package_manager: &dyn PackageManager,
    dry_run: bool,
) -> Result<PublishOutcome> {
    if draft.name.trim().is_empty() {
        return Err(Error::InvalidManifest(
            "package name is required to publish".to_string(),
        ));
    }
    if draft.version.trim().is_empty() {
        return Err(Error::InvalidManifest(
            "package version is required to publish".to_string(),
        ));
    }

    let registries = config.registries(engine);
    let channel = select_channel(registries, &draft.version, config.prerelease_rule);
    let registry = registries.url(channel).to_string();

    if registry.is_empty() {
        return Err(Error::NoRegistryConfigured {
            engine: engine.as_str(),
            channel: channel.as_str(),
        });
    }

    if dry_run {
        return Ok(PublishOutcome {
            registry,
            channel,
            package_json: dir.join("package.json"),
            output: None,
        });
    }

    let package_json = write_package_json(dir, draft)?;
    let output = package_manager.publish(&registry, dir)?;

    Ok(PublishOutcome {
        registry,
        channel,
        package_json,
        output: Some(output),
    })
}
