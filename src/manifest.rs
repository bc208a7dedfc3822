//! Manifest handling for Unreal `package.json` and Unity `Packages/manifest.json`
//!
//! Each engine keeps its declared dependencies in a different file:
//!
//! - Unreal projects use an npm `package.json` in the project root. The
//!   installed-package list is the union of `dependencies` and
//!   `devDependencies`, with `devDependencies` winning on collisions.
//! - Unity projects use `Packages/manifest.json` with a `dependencies` map and
//!   an optional `scopedRegistries` array.
//!
//! Both files are parsed into typed records. A dependency whose version is not
//! a string is rejected with [`Error::InvalidManifest`] instead of being
//! skipped.
//!
//! # Examples
//!
//! ```no_run
//! use gpm::{read_installed, write_install, Engine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! write_install(Engine::Unity, ".", "com.unity.textmeshpro", "3.0.6")?;
//!
//! for package in read_installed(Engine::Unity, ".")? {
//!     println!("{} @ {}", package.id, package.version);
//! }
//! # Ok(())
//! # }
//! ```

use crate::project::{unity_manifest_path, Engine};
use crate::{Error, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A dependency declared in a project manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub id: String,
    pub version: String,
}

/// Ordered `name -> version` map as it appears in a manifest
///
/// Keeps document order. A key declared twice keeps its first position and
/// takes the last value, matching how JSON objects are read by npm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<(String, String)>);

impl Dependencies {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, version)| version.as_str())
    }

    /// Set a version, keeping the position of an existing key
    pub fn insert(&mut self, id: impl Into<String>, version: impl Into<String>) {
        let id = id.into();
        let version = version.into();
        match self.0.iter_mut().find(|(name, _)| *name == id) {
            Some(entry) => entry.1 = version,
            None => self.0.push((id, version)),
        }
    }

    /// Overlay `other` on top of `self`; values from `other` win
    pub fn merge(&mut self, other: &Dependencies) {
        for (id, version) in &other.0 {
            self.insert(id.clone(), version.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, version)| (id.as_str(), version.as_str()))
    }

    pub fn to_installed(&self) -> Vec<InstalledPackage> {
        self.0
            .iter()
            .map(|(id, version)| InstalledPackage {
                id: id.clone(),
                version: version.clone(),
            })
            .collect()
    }
}

impl<'de> Deserialize<'de> for Dependencies {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DependenciesVisitor;

        impl<'de> Visitor<'de> for DependenciesVisitor {
            type Value = Dependencies;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of package names to version strings")
            }

            fn visit_map<M>(self, mut access: M) -> std::result::Result<Dependencies, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut deps = Dependencies::new();
                while let Some(id) = access.next_key::<String>()? {
                    let version: Value = access.next_value()?;
                    match version {
                        Value::String(version) => deps.insert(id, version),
                        other => {
                            return Err(de::Error::custom(format!(
                                "version of '{}' must be a string, found {}",
                                id, other
                            )))
                        }
                    }
                }
                Ok(deps)
            }
        }

        deserializer.deserialize_map(DependenciesVisitor)
    }
}

/// Unreal project `package.json`, restricted to the fields gpm reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub dependencies: Option<Dependencies>,

    #[serde(default)]
    pub dev_dependencies: Option<Dependencies>,
}

impl PackageJson {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_file(path.as_ref())
    }

    /// `dependencies` overlaid with `devDependencies`
    pub fn merged_dependencies(&self) -> Dependencies {
        let mut merged = self.dependencies.clone().unwrap_or_default();
        if let Some(dev) = &self.dev_dependencies {
            merged.merge(dev);
        }
        merged
    }
}

/// Entry of the Unity manifest `scopedRegistries` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedRegistry {
    #[serde(default)]
    pub name: String,

    pub url: String,

    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Unity `Packages/manifest.json`, restricted to the fields gpm reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnityManifest {
    #[serde(default)]
    pub dependencies: Option<Dependencies>,

    #[serde(default)]
    pub scoped_registries: Vec<ScopedRegistry>,
}

impl UnityManifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_file(path.as_ref())
    }
}

fn parse_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidManifest(format!("{}: {}", path.display(), e)))
}

/// Path of the dependency manifest for `engine` under `root`
pub fn manifest_path<P: AsRef<Path>>(engine: Engine, root: P) -> PathBuf {
    match engine {
        Engine::Unreal => root.as_ref().join("package.json"),
        Engine::Unity => unity_manifest_path(root),
    }
}

/// List the dependencies declared by a project
///
/// A missing manifest yields an empty list.
pub fn read_installed<P: AsRef<Path>>(engine: Engine, root: P) -> Result<Vec<InstalledPackage>> {
    let path = manifest_path(engine, root);
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let deps = match engine {
        Engine::Unreal => PackageJson::load(&path)?.merged_dependencies(),
        Engine::Unity => UnityManifest::load(&path)?
            .dependencies
            .unwrap_or_default(),
    };

    Ok(deps.to_installed())
}

/// Record `package_id@version` in the project's manifest
///
/// Unity: `dependencies[package_id] = version` is written into
/// `Packages/manifest.json`, leaving every other field as it was. New keys are
/// appended; an existing key keeps its position. Fails with
/// [`Error::ManifestMissing`] when the manifest does not exist.
///
/// Unreal: `package.json` is owned by the package manager subprocess, so this
/// is a no-op.
pub fn write_install<P: AsRef<Path>>(
    engine: Engine,
    root: P,
    package_id: &str,
    version: &str,
) -> Result<()> {
    match engine {
        Engine::Unity => write_unity_dependency(&unity_manifest_path(root), package_id, version),
        Engine::Unreal => {
            tracing::debug!(
                package = package_id,
                "package.json is updated by the package manager, nothing to write"
            );
            Ok(())
        }
    }
}

fn write_unity_dependency(path: &Path, package_id: &str, version: &str) -> Result<()> {
    if !path.is_file() {
        return Err(Error::ManifestMissing(path.to_path_buf()));
    }

    // Validate the shape before editing the raw document
    UnityManifest::load(path)?;

    let mut document = read_object(path)?;
    let deps = document
        .entry("dependencies")
        .or_insert_with(|| Value::Object(Map::new()));
    if deps.is_null() {
        *deps = Value::Object(Map::new());
    }
    let deps = deps.as_object_mut().ok_or_else(|| {
        Error::InvalidManifest(format!("{}: 'dependencies' must be an object", path.display()))
    })?;
    deps.insert(package_id.to_string(), Value::String(version.to_string()));

    write_object(path, &document)?;
    tracing::info!(package = package_id, version, manifest = %path.display(), "updated manifest");
    Ok(())
}

/// Read a JSON file whose top level must be an object, preserving key order
pub fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::InvalidManifest(format!(
            "{}: top level must be a JSON object",
            path.display()
        ))),
        Err(e) => Err(Error::InvalidManifest(format!("{}: {}", path.display(), e))),
    }
}

/// Write a JSON object with 2-space indentation and a trailing newline
pub fn write_object(path: &Path, document: &Map<String, Value>) -> Result<()> {
    let mut content = serde_json::to_string_pretty(document)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// `package.json` of an installed module, as seen by the plugin sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDescriptor {
    /// Unity packages declare their minimum editor version here
    pub unity: Option<Value>,
}

impl ModuleDescriptor {
    /// Pick the sync flags out of any JSON document
    ///
    /// Only the `unity` key is looked at, whatever its siblings contain. A
    /// document that is not an object declares nothing.
    pub fn from_document(document: &Value) -> Self {
        Self {
            unity: document.get("unity").cloned(),
        }
    }

    /// Whether the module declares itself a Unity package
    ///
    /// Uses JavaScript truthiness: `false`, `0`, `""` and `null` do not count.
    pub fn targets_unity(&self) -> bool {
        match &self.unity {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

/// Unreal Engine plugin file (.uplugin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UPlugin {
    #[serde(rename = "VersionName", default)]
    pub version_name: Option<String>,

    #[serde(rename = "FriendlyName", default)]
    pub friendly_name: Option<String>,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UPlugin {
    /// Find .uplugin file in the given directory
    pub fn find<P: AsRef<Path>>(dir: P) -> Result<Option<PathBuf>> {
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("uplugin") {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Load .uplugin file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_file(path.as_ref())
    }

    /// Get plugin name from filename
    pub fn name<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unity_project(manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Packages")).unwrap();
        fs::write(dir.path().join("Packages/manifest.json"), manifest).unwrap();
        dir
    }

    fn pkg(id: &str, version: &str) -> InstalledPackage {
        InstalledPackage {
            id: id.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_unity_read_keeps_document_order() {
        let dir = unity_project(
            r#"{"dependencies": {"com.z.last": "3.0.0", "com.a.first": "1.0.0", "com.m.mid": "file:../Local"}}"#,
        );

        let installed = read_installed(Engine::Unity, dir.path()).unwrap();
        assert_eq!(
            installed,
            vec![
                pkg("com.z.last", "3.0.0"),
                pkg("com.a.first", "1.0.0"),
                pkg("com.m.mid", "file:../Local"),
            ]
        );
    }

    #[test]
    fn test_unity_without_dependencies_key() {
        let dir = unity_project(r#"{"scopedRegistries": []}"#);
        assert!(read_installed(Engine::Unity, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_manifest_reads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_installed(Engine::Unreal, dir.path()).unwrap().is_empty());
        assert!(read_installed(Engine::Unity, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_unreal_dev_dependencies_override() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "name": "shooter",
                "dependencies": {"@ue-plugins/a": "1.0.0", "@ue-plugins/b": "2.0.0"},
                "devDependencies": {"@ue-plugins/a": "1.1.0-beta", "eslint": "^9.0.0"}
            }"#,
        )
        .unwrap();

        let installed = read_installed(Engine::Unreal, dir.path()).unwrap();
        assert_eq!(
            installed,
            vec![
                pkg("@ue-plugins/a", "1.1.0-beta"),
                pkg("@ue-plugins/b", "2.0.0"),
                pkg("eslint", "^9.0.0"),
            ]
        );
    }

    #[test]
    fn test_unreal_null_dependencies() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": null, "devDependencies": {"x": "1.0.0"}}"#,
        )
        .unwrap();

        let installed = read_installed(Engine::Unreal, dir.path()).unwrap();
        assert_eq!(installed, vec![pkg("x", "1.0.0")]);
    }

    #[test]
    fn test_unreal_ignores_unrelated_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": 42, "version": null, "dependencies": {"@ue-plugins/a": "1.0.0"}}"#,
        )
        .unwrap();

        let installed = read_installed(Engine::Unreal, dir.path()).unwrap();
        assert_eq!(installed, vec![pkg("@ue-plugins/a", "1.0.0")]);
    }

    #[test]
    fn test_non_string_version_is_rejected() {
        let dir = unity_project(r#"{"dependencies": {"com.a.b": 1}}"#);
        let err = read_installed(Engine::Unity, dir.path()).unwrap_err();
        match err {
            Error::InvalidManifest(msg) => assert!(msg.contains("com.a.b"), "{}", msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_install_end_to_end() {
        let dir = unity_project(r#"{"dependencies": {"com.a.b": "1.0.0"}}"#);

        assert_eq!(
            read_installed(Engine::Unity, dir.path()).unwrap(),
            vec![pkg("com.a.b", "1.0.0")]
        );

        write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap();

        assert_eq!(
            read_installed(Engine::Unity, dir.path()).unwrap(),
            vec![pkg("com.a.b", "1.0.0"), pkg("com.c.d", "2.0.0")]
        );
    }

    #[test]
    fn test_write_install_is_idempotent() {
        let dir = unity_project(r#"{"dependencies": {"com.a.b": "1.0.0"}}"#);
        let path = dir.path().join("Packages/manifest.json");

        write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap();
        let first = fs::read_to_string(&path).unwrap();
        write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_write_install_preserves_other_fields_and_positions() {
        let dir = unity_project(
            r#"{
  "scopedRegistries": [{"name": "Company", "url": "https://upm.example.com", "scopes": ["com.company"]}],
  "dependencies": {"com.a.b": "1.0.0", "com.c.d": "1.0.0", "com.e.f": "1.0.0"},
  "testables": ["com.a.b"]
}"#,
        );

        write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap();

        let content = fs::read_to_string(dir.path().join("Packages/manifest.json")).unwrap();
        let scoped = content.find("scopedRegistries").unwrap();
        let deps = content.find("\"dependencies\"").unwrap();
        let testables = content.find("testables").unwrap();
        assert!(scoped < deps && deps < testables);
        assert!(content.contains("  \"dependencies\": {\n    \"com.a.b\""));

        let installed = read_installed(Engine::Unity, dir.path()).unwrap();
        assert_eq!(
            installed,
            vec![
                pkg("com.a.b", "1.0.0"),
                pkg("com.c.d", "2.0.0"),
                pkg("com.e.f", "1.0.0"),
            ]
        );

        let manifest = UnityManifest::load(dir.path().join("Packages/manifest.json")).unwrap();
        assert_eq!(manifest.scoped_registries.len(), 1);
        assert_eq!(manifest.scoped_registries[0].scopes, vec!["com.company"]);
    }

    #[test]
    fn test_write_install_adds_missing_dependencies_object() {
        let dir = unity_project(r#"{"enableLockFile": true}"#);
        write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap();

        let installed = read_installed(Engine::Unity, dir.path()).unwrap();
        assert_eq!(installed, vec![pkg("com.c.d", "2.0.0")]);
    }

    #[test]
    fn test_write_install_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = write_install(Engine::Unity, dir.path(), "com.c.d", "2.0.0").unwrap_err();
        assert!(matches!(err, Error::ManifestMissing(_)));
    }

    #[test]
    fn test_write_install_unreal_is_noop() {
        let dir = TempDir::new().unwrap();
        write_install(Engine::Unreal, dir.path(), "@ue-plugins/a", "1.0.0").unwrap();
        assert!(!dir.path().join("package.json").exists());
    }

    #[test]
    fn test_module_descriptor_truthiness() {
        let parse = |json: &str| {
            ModuleDescriptor::from_document(&serde_json::from_str::<Value>(json).unwrap())
        };

        assert!(parse(r#"{"unity": "2021.3"}"#).targets_unity());
        assert!(parse(r#"{"unity": true}"#).targets_unity());
        assert!(parse(r#"{"unity": {}}"#).targets_unity());
        assert!(!parse(r#"{"unity": ""}"#).targets_unity());
        assert!(!parse(r#"{"unity": false}"#).targets_unity());
        assert!(!parse(r#"{"unity": 0}"#).targets_unity());
        assert!(!parse(r#"{"unity": null}"#).targets_unity());
        assert!(!parse(r#"{"name": "x"}"#).targets_unity());
        assert!(parse(r#"{"name": 42, "unity": "2021.3"}"#).targets_unity());
        assert!(!parse(r#"["unity"]"#).targets_unity());
        assert!(!parse(r#""unity""#).targets_unity());
    }

    #[test]
    fn test_uplugin_name() {
        let path = std::path::Path::new("/path/to/MyPlugin.uplugin");
        assert_eq!(UPlugin::name(path), Some("MyPlugin".to_string()));
    }

    #[test]
    fn test_uplugin_parse() {
        let json = r#"{
            "FileVersion": 3,
            "Version": 1,
            "VersionName": "1.0.0",
            "FriendlyName": "My Plugin",
            "Description": "A test plugin",
            "Category": "Gameplay",
            "Modules": []
        }"#;

        let uplugin: UPlugin = serde_json::from_str(json).unwrap();
        assert_eq!(uplugin.version_name.as_deref(), Some("1.0.0"));
        assert_eq!(uplugin.friendly_name.as_deref(), Some("My Plugin"));
        assert_eq!(uplugin.description.as_deref(), Some("A test plugin"));
    }
}
