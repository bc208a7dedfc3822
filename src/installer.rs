//! Package installation into Unreal and Unity projects
//!
//! - Unreal: npm installs the package into `node_modules/`, then the plugin
//!   sync copies the scoped plugins into `Plugins/`.
//! - Unity: the dependency is written into `Packages/manifest.json`; the
//!   Unity editor resolves it on its next refresh.
//!
//! # Examples
//!
//! ```no_run
//! use gpm::{install, Config, InstallRequest, NpmCli, Project};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let project = Project::open(".")?;
//! let npm = NpmCli::from_config(&config.subprocess);
//!
//! let request = InstallRequest::new("@ue-plugins/inventory", Some("1.2.0".to_string()));
//! let outcome = install(&project, &request, &config, &npm)?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::manifest::write_install;
use crate::package_manager::{CommandOutput, PackageManager};
use crate::project::{Engine, Project};
use crate::registry::{select_channel, Channel};
use crate::sync::{sync_plugins, SyncOptions, SyncReport};
use crate::{Error, Result};

/// Version used when none is given
pub const DEFAULT_VERSION: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub package_id: String,
    pub version: String,
    pub dry_run: bool,
}

impl InstallRequest {
    pub fn new(package_id: impl Into<String>, version: Option<String>) -> Self {
        Self {
            package_id: package_id.into(),
            version: version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            dry_run: false,
        }
    }

    /// Parse `name`, `name@version` or `@scope/name@version`
    ///
    /// An explicit `version` argument takes precedence over one embedded in
    /// the package string.
    pub fn parse(spec: &str, version: Option<String>) -> Result<Self> {
        let spec = spec.trim();
        let (name, embedded) = match spec.rfind('@') {
            Some(pos) if pos > 0 => (&spec[..pos], Some(spec[pos + 1..].to_string())),
            _ => (spec, None),
        };

        if name.is_empty() || name == "@" {
            return Err(Error::Other(format!("Invalid package name: '{}'", spec)));
        }

        Ok(Self::new(name, version.or(embedded)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// npm install ran and the plugins were synced
    Unreal {
        registry: String,
        channel: Channel,
        output: CommandOutput,
        sync: SyncReport,
    },
    /// The Unity manifest was updated
    Unity,
    /// Nothing was changed
    DryRun { plan: String },
}

impl InstallOutcome {
    pub fn message(&self) -> String {
        match self {
            InstallOutcome::Unreal { sync, .. } => format!(
                "Unreal package installed and synced ({} plugin{} copied)",
                sync.synced_count(),
                if sync.synced_count() == 1 { "" } else { "s" }
            ),
            InstallOutcome::Unity => {
                "Unity manifest updated. Switch to Unity to finish resolution.".to_string()
            }
            InstallOutcome::DryRun { plan } => format!("[DRY RUN] {}", plan),
        }
    }
}

/// Install a package into `project`
///
/// For Unreal, the registry is chosen from the version (see
/// [`crate::select_registry`]); an empty selection fails with
/// [`Error::NoRegistryConfigured`] before npm is started. A failed npm run is
/// returned unchanged and the sync is not attempted.
pub fn install(
    project: &Project,
    request: &InstallRequest,
    config: &Config,
    package_manager: &dyn PackageManager,
) -> Result<InstallOutcome> {
    match project.engine {
        Engine::Unreal => install_unreal(project, request, config, package_manager),
        Engine::Unity => install_unity(project, request),
    }
}

fn install_unreal(
    project: &Project,
    request: &InstallRequest,
    config: &Config,
    package_manager: &dyn PackageManager,
) -> Result<InstallOutcome> {
    let registries = config.registries(Engine::Unreal);
    let channel = select_channel(registries, &request.version, config.prerelease_rule);
    let registry = registries.url(channel).to_string();

    if registry.is_empty() {
        return Err(Error::NoRegistryConfigured {
            engine: Engine::Unreal.as_str(),
            channel: channel.as_str(),
        });
    }

    if request.dry_run {
        return Ok(InstallOutcome::DryRun {
            plan: format!(
                "Would install {}@{} from {} and sync {} into {}",
                request.package_id,
                request.version,
                registry,
                config.sync.scope,
                project.plugins_dir().display()
            ),
        });
    }

    let output =
        package_manager.install_dependency(&request.package_id, &request.version, &registry, &project.root)?;

    let options = SyncOptions {
        clean: config.sync.clean,
        ..SyncOptions::default()
    };
    let sync = sync_plugins(project.scope_dir(&config.sync.scope), project.plugins_dir(), &options)?;

    Ok(InstallOutcome::Unreal {
        registry,
        channel,
        output,
        sync,
    })
}

fn install_unity(project: &Project, request: &InstallRequest) -> Result<InstallOutcome> {
    if request.dry_run {
        let manifest = project.manifest_path();
        if !manifest.is_file() {
            return Err(Error::ManifestMissing(manifest));
        }
        return Ok(InstallOutcome::DryRun {
            plan: format!(
                "Would set dependencies[\"{}\"] = \"{}\" in {}",
                request.package_id,
                request.version,
                manifest.display()
            ),
        });
    }

    write_install(Engine::Unity, &project.root, &request.package_id, &request.version)?;
    Ok(InstallOutcome::Unity)
}
