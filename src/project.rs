//! Project detection
//!
//! A project is a directory on disk. Its engine is inferred from marker files:
//! Unity projects carry `Packages/manifest.json`, Unreal projects carry a
//! `*.uproject` file in the root.
//!
//! # Examples
//!
//! ```no_run
//! use gpm::{detect_engine, Engine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! match detect_engine(".")? {
//!     Some(Engine::Unreal) => println!("Unreal project"),
//!     Some(Engine::Unity) => println!("Unity project"),
//!     None => println!("No supported project"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension of the Unreal project file (`MyGame.uproject`)
pub const UPROJECT_EXTENSION: &str = "uproject";

/// Supported game engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Unreal,
    Unity,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Unreal => "unreal",
            Engine::Unity => "unity",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unreal" | "ue" => Ok(Engine::Unreal),
            "unity" => Ok(Engine::Unity),
            other => Err(Error::Other(format!(
                "Unknown engine '{}'. Use 'unreal' or 'unity'",
                other
            ))),
        }
    }
}

/// Path of the Unity manifest relative to a project root
pub fn unity_manifest_path<P: AsRef<Path>>(root: P) -> PathBuf {
    root.as_ref().join("Packages").join("manifest.json")
}

/// Classify a directory as a Unity or Unreal project
///
/// The Unity marker is checked first and wins when both are present.
/// Returns `Ok(None)` when neither marker exists. A directory that cannot be
/// listed is reported as [`Error::UnreadableProject`] rather than being
/// silently treated as undetected.
pub fn detect_engine<P: AsRef<Path>>(path: P) -> Result<Option<Engine>> {
    let path = path.as_ref();

    if unity_manifest_path(path).is_file() {
        return Ok(Some(Engine::Unity));
    }

    let entries = fs::read_dir(path).map_err(|source| Error::UnreadableProject {
        path: path.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if name
            .to_string_lossy()
            .ends_with(&format!(".{}", UPROJECT_EXTENSION))
        {
            return Ok(Some(Engine::Unreal));
        }
    }

    Ok(None)
}

/// A detected project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub engine: Engine,
}

impl Project {
    /// Detect the project at `root`, failing when no engine marker is found
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        match detect_engine(&root)? {
            Some(engine) => Ok(Self { root, engine }),
            None => Err(Error::NoSupportedProject(root)),
        }
    }

    /// Unity `Packages/manifest.json` or Unreal `package.json`
    pub fn manifest_path(&self) -> PathBuf {
        match self.engine {
            Engine::Unity => unity_manifest_path(&self.root),
            Engine::Unreal => self.root.join("package.json"),
        }
    }

    /// Destination of synced Unreal plugins
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("Plugins")
    }

    /// Installed modules under `node_modules/<scope>`
    pub fn scope_dir(&self, scope: &str) -> PathBuf {
        let mut dir = self.root.join("node_modules");
        for segment in scope.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }
}
