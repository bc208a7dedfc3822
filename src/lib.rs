//! GPM - package management for Unreal Engine and Unity projects
//!
//! GPM wraps the package managers each engine already uses and adds the glue
//! they lack:
//!
//! - Project detection from engine marker files
//! - Reading the declared dependencies of `package.json` / `Packages/manifest.json`
//! - Writing Unity manifest dependencies without disturbing other fields
//! - Copying npm-installed Unreal plugins into the project's `Plugins/` folder
//! - Routing installs and publishes to release or snapshot registries
//!
//! # Examples
//!
//! ```no_run
//! use gpm::{read_installed, Project};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let project = Project::open(".")?;
//!
//! for package in read_installed(project.engine, &project.root)? {
//!     println!("{} @ {}", package.id, package.version);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`project`] - Engine detection and project layout
//! - [`manifest`] - Read and write dependency manifests
//! - [`registry`] - Release/snapshot registry selection
//! - [`sync`] - Copy installed plugins into `Plugins/`
//! - [`package_manager`] - npm subprocess collaborator
//! - [`installer`] - Install orchestration
//! - [`publish`] - Publish orchestration
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod config;
pub mod error;
pub mod installer;
pub mod logging;
pub mod manifest;
pub mod package_manager;
pub mod project;
pub mod publish;
pub mod registry;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use installer::{install, InstallOutcome, InstallRequest};
pub use manifest::{read_installed, write_install, InstalledPackage, UPlugin};
pub use package_manager::{CommandOutput, NpmCli, PackageManager};
pub use project::{detect_engine, Engine, Project};
pub use publish::{analyze_package, detect_package_engine, publish, PackageDraft, PublishOutcome};
pub use registry::{select_channel, select_registry, Channel, PrereleaseRule, RegistryConfig};
pub use sync::{sync_plugins, SkipReason, SyncOptions, SyncOutcome, SyncReport};
