//! Plugin synchronisation from `node_modules/<scope>` into `Plugins/`
//!
//! npm installs Unreal plugins as ordinary packages under a scope such as
//! `@ue-plugins`. Unreal only loads plugins from the project's `Plugins/`
//! folder, so after every install the qualifying modules are copied there.
//!
//! A module qualifies when:
//!
//! 1. it is a directory,
//! 2. it has a `*.uplugin` file at its top level (subfolders are not searched),
//! 3. its `package.json`, if any, does not declare a truthy `unity` field.
//!
//! A `package.json` that cannot be parsed is logged and ignored. Failures are
//! recorded per module and never abort the remaining modules.
//!
//! # Examples
//!
//! ```no_run
//! use gpm::{sync_plugins, SyncOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = sync_plugins("node_modules/@ue-plugins", "Plugins", &SyncOptions::default())?;
//! println!("{} synced, {} failed", report.synced_count(), report.failed_count());
//! # Ok(())
//! # }
//! ```

use crate::manifest::ModuleDescriptor;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension of the Unreal plugin descriptor (`MyPlugin.uplugin`)
pub const PLUGIN_MARKER_EXTENSION: &str = "uplugin";

/// npm descriptor inside an installed module
pub const MODULE_DESCRIPTOR: &str = "package.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// File extension that marks a module as an engine plugin (without the dot)
    pub marker_extension: String,

    /// Remove the destination folder of each plugin before copying.
    /// When false, files that no longer exist in the source are left behind.
    pub clean: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            marker_extension: PLUGIN_MARKER_EXTENSION.to_string(),
            clean: false,
        }
    }
}

/// Why a module was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoMarkerFile,
    OtherEngine,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMarkerFile => f.write_str("no marker file"),
            SkipReason::OtherEngine => f.write_str("marked for other engine"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced { files: usize },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

/// Result for one candidate module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Per-module results, in source directory listing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub modules: Vec<ModuleReport>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn synced(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules
            .iter()
            .filter(|m| matches!(m.outcome, SyncOutcome::Synced { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules
            .iter()
            .filter(|m| matches!(m.outcome, SyncOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules
            .iter()
            .filter(|m| matches!(m.outcome, SyncOutcome::Failed { .. }))
    }

    pub fn synced_count(&self) -> usize {
        self.synced().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Copy every qualifying module of `source_scope_dir` into `dest_plugins_dir`
///
/// An absent `source_scope_dir` is not an error: the report is empty and
/// `dest_plugins_dir` is not created. Errors are only returned when the scope
/// directory itself cannot be listed or the destination cannot be created.
pub fn sync_plugins<P: AsRef<Path>, Q: AsRef<Path>>(
    source_scope_dir: P,
    dest_plugins_dir: Q,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let source_scope_dir = source_scope_dir.as_ref();
    let dest_plugins_dir = dest_plugins_dir.as_ref();

    if !source_scope_dir.is_dir() {
        info!(source = %source_scope_dir.display(), "no scoped modules installed, nothing to sync");
        return Ok(SyncReport::default());
    }

    fs::create_dir_all(dest_plugins_dir)?;

    let mut report = SyncReport::default();

    for entry in fs::read_dir(source_scope_dir)? {
        let entry = entry?;
        let source = entry.path();
        if !source.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let destination = dest_plugins_dir.join(&name);
        let outcome = sync_module(&name, &source, &destination, options);

        match &outcome {
            SyncOutcome::Synced { files } => info!(module = %name, files, "synced"),
            SyncOutcome::Skipped { reason } => info!(module = %name, %reason, "skipped"),
            SyncOutcome::Failed { error } => warn!(module = %name, %error, "failed to sync"),
        }

        report.modules.push(ModuleReport {
            name,
            source,
            destination,
            outcome,
        });
    }

    Ok(report)
}

fn sync_module(name: &str, source: &Path, destination: &Path, options: &SyncOptions) -> SyncOutcome {
    match has_marker_file(source, &options.marker_extension) {
        Ok(true) => {}
        Ok(false) => {
            return SyncOutcome::Skipped {
                reason: SkipReason::NoMarkerFile,
            }
        }
        Err(e) => {
            return SyncOutcome::Failed {
                error: e.to_string(),
            }
        }
    }

    if targets_other_engine(name, source) {
        return SyncOutcome::Skipped {
            reason: SkipReason::OtherEngine,
        };
    }

    if options.clean && destination.exists() {
        debug!(module = name, destination = %destination.display(), "clearing destination");
        if let Err(e) = fs::remove_dir_all(destination) {
            return SyncOutcome::Failed {
                error: format!("could not clear {}: {}", destination.display(), e),
            };
        }
    }

    match copy_tree(source, destination) {
        Ok(files) => SyncOutcome::Synced { files },
        Err(e) => SyncOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Whether `dir` directly contains a file named `*.<extension>`
fn has_marker_file(dir: &Path, extension: &str) -> Result<bool> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(&suffix) && entry.path().is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn targets_other_engine(name: &str, module_dir: &Path) -> bool {
    let descriptor = module_dir.join(MODULE_DESCRIPTOR);
    if !descriptor.is_file() {
        return false;
    }

    let parsed = fs::read_to_string(&descriptor)
        .map_err(Error::from)
        .and_then(|content| serde_json::from_str::<Value>(&content).map_err(Error::from));

    match parsed {
        Ok(document) => ModuleDescriptor::from_document(&document).targets_unity(),
        Err(e) => {
            warn!(module = name, error = %e, "could not read package.json, treating as an Unreal plugin");
            false
        }
    }
}

/// Recursively copy `source` into `destination`, returning the number of files
///
/// Existing files are overwritten; files only present at the destination are
/// kept.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    fs::create_dir_all(destination)?;

    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(true).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Other(format!("{}: {}", entry.path().display(), e)))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }

    Ok(files)
}
