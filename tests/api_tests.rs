//! Library API tests for install, sync and publish orchestration.
//!
//! The npm subprocess is replaced by `FakeNpm`, which records every call and
//! simulates what `npm install` leaves on disk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test api_tests
//! ```


use gpm::{
    analyze_package, install, publish, read_installed, sync_plugins, Channel, CommandOutput,
    Config, Engine, Error, InstallOutcome, InstallRequest, PackageManager, PrereleaseRule,
    Project, SkipReason, SyncOptions, SyncOutcome,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use test_utils::{assertions, MockPlugin, TestProject};

// ============================================================================
// Fake package manager
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Install {
        id: String,
        version: String,
        registry: String,
        cwd: PathBuf,
    },
    Publish {
        registry: String,
        cwd: PathBuf,
    },
}

#[derive(Default)]
struct FakeNpm {
    calls: RefCell<Vec<Call>>,
    /// Plugins dropped into node_modules/@ue-plugins on install
    plugins: Vec<MockPlugin>,
    fail_with: Option<String>,
}

impl FakeNpm {
    fn with_plugins(plugins: Vec<MockPlugin>) -> Self {
        Self {
            plugins,
            ..Self::default()
        }
    }

    fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl PackageManager for FakeNpm {
    fn install_dependency(
        &self,
        id: &str,
        version: &str,
        registry_url: &str,
        cwd: &Path,
    ) -> gpm::Result<CommandOutput> {
        self.calls.borrow_mut().push(Call::Install {
            id: id.to_string(),
            version: version.to_string(),
            registry: registry_url.to_string(),
            cwd: cwd.to_path_buf(),
        });

        if let Some(stderr) = &self.fail_with {
            return Err(Error::CommandFailed {
                command: format!("npm install {}@{}", id, version),
                status: "exit code 1".to_string(),
                stderr: stderr.clone(),
            });
        }

        let scope = cwd.join("node_modules").join(test_utils::UE_SCOPE);
        fs::create_dir_all(&scope)?;
        for plugin in &self.plugins {
            plugin.create_in(&scope);
        }
        fs::write(
            cwd.join("package.json"),
            format!(r#"{{"dependencies": {{"{}": "{}"}}}}"#, id, version),
        )?;

        Ok(CommandOutput {
            stdout: "added 1 package".to_string(),
            stderr: String::new(),
        })
    }

    fn publish(&self, registry_url: &str, cwd: &Path) -> gpm::Result<CommandOutput> {
        self.calls.borrow_mut().push(Call::Publish {
            registry: registry_url.to_string(),
            cwd: cwd.to_path_buf(),
        });
        match &self.fail_with {
            Some(stderr) => Err(Error::CommandFailed {
                command: "npm publish".to_string(),
                status: "exit code 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

fn config_with(unreal_snapshot: &str) -> Config {
    let mut config = Config::default();
    config.unreal.release = "https://npm.example.com/release/".to_string();
    config.unreal.snapshot = unreal_snapshot.to_string();
    config.unity.release = "https://upm.example.com/release/".to_string();
    config
}

// ============================================================================
// Install
// ============================================================================

#[test]
fn test_unreal_install_runs_npm_then_syncs() {
    let project = TestProject::unreal();
    let npm = FakeNpm::with_plugins(vec![
        MockPlugin::new("Inventory", "1.2.0"),
        MockPlugin::new("UnityBridge", "1.0.0").for_unity("2021.3"),
    ]);
    let config = config_with("");

    let opened = Project::open(project.path()).unwrap();
    let request = InstallRequest::parse("@ue-plugins/inventory@1.2.0", None).unwrap();
    let outcome = install(&opened, &request, &config, &npm).unwrap();

    assert_eq!(
        npm.calls(),
        vec![Call::Install {
            id: "@ue-plugins/inventory".to_string(),
            version: "1.2.0".to_string(),
            registry: "https://npm.example.com/release/".to_string(),
            cwd: project.path().to_path_buf(),
        }]
    );

    match outcome {
        InstallOutcome::Unreal { sync, channel, .. } => {
            assert_eq!(channel, Channel::Release);
            assert_eq!(sync.synced_count(), 1);
            assert_eq!(
                sync.get("UnityBridge").unwrap().outcome,
                SyncOutcome::Skipped {
                    reason: SkipReason::OtherEngine
                }
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(project.has_plugin("Inventory"));
    assert!(!project.has_plugin("UnityBridge"));
    assertions::file_exists(&project.plugins_dir().join("Inventory/Source/Inventory/Inventory.cpp"));

    let installed = read_installed(Engine::Unreal, project.path()).unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].id, "@ue-plugins/inventory");
}

#[test]
fn test_unreal_prerelease_uses_snapshot_registry() {
    let project = TestProject::unreal();
    let npm = FakeNpm::default();
    let config = config_with("https://npm.example.com/snapshot/");

    let opened = Project::open(project.path()).unwrap();
    let request = InstallRequest::new("@ue-plugins/inventory", Some("2.0.0-beta.1".to_string()));
    install(&opened, &request, &config, &npm).unwrap();

    match &npm.calls()[0] {
        Call::Install { registry, .. } => assert_eq!(registry, "https://npm.example.com/snapshot/"),
        other => panic!("unexpected call: {:?}", other),
    }
}

#[test]
fn test_semver_rule_keeps_dated_versions_on_release() {
    let project = TestProject::unreal();
    let npm = FakeNpm::default();
    let mut config = config_with("https://npm.example.com/snapshot/");
    config.prerelease_rule = PrereleaseRule::Semver;

    let opened = Project::open(project.path()).unwrap();
    let request = InstallRequest::new("tools", Some("2024-05".to_string()));
    install(&opened, &request, &config, &npm).unwrap();

    match &npm.calls()[0] {
        Call::Install { registry, .. } => assert_eq!(registry, "https://npm.example.com/release/"),
        other => panic!("unexpected call: {:?}", other),
    }
}

#[test]
fn test_unreal_install_without_registry_is_refused() {
    let project = TestProject::unreal();
    let npm = FakeNpm::default();
    let mut config = Config::default();
    config.unreal.release = String::new();

    let opened = Project::open(project.path()).unwrap();
    let request = InstallRequest::new("@ue-plugins/inventory", None);
    let err = install(&opened, &request, &config, &npm).unwrap_err();

    assert!(matches!(
        err,
        Error::NoRegistryConfigured {
            engine: "unreal",
            channel: "release"
        }
    ));
    assert!(npm.calls().is_empty());
}

#[test]
fn test_npm_failure_is_passed_through_and_skips_sync() {
    let project = TestProject::unreal();
    fs::create_dir_all(project.scope_dir()).unwrap();
    MockPlugin::new("Stale", "0.1.0").create_in(&project.scope_dir());
    let npm = FakeNpm::failing("npm ERR! 404 Not Found");

    let opened = Project::open(project.path()).unwrap();
    let request = InstallRequest::new("@ue-plugins/missing", None);
    let err = install(&opened, &request, &config_with(""), &npm).unwrap_err();

    match err {
        Error::CommandFailed { stderr, .. } => assert_eq!(stderr, "npm ERR! 404 Not Found"),
        other => panic!("unexpected error: {other}"),
    }
    assertions::dir_not_exists(&project.plugins_dir());
}

#[test]
fn test_unity_install_updates_manifest_without_npm() {
    let project = TestProject::unity(r#"{"dependencies": {"com.a.b": "1.0.0"}}"#);
    let npm = FakeNpm::default();

    let opened = Project::open(project.path()).unwrap();
    assert_eq!(opened.engine, Engine::Unity);

    let request = InstallRequest::new("com.c.d", Some("2.0.0".to_string()));
    let outcome = install(&opened, &request, &Config::default(), &npm).unwrap();

    assert_eq!(outcome, InstallOutcome::Unity);
    assert!(npm.calls().is_empty());

    let installed = read_installed(Engine::Unity, project.path()).unwrap();
    let pairs: Vec<_> = installed
        .iter()
        .map(|p| (p.id.as_str(), p.version.as_str()))
        .collect();
    assert_eq!(pairs, vec![("com.a.b", "1.0.0"), ("com.c.d", "2.0.0")]);
}

#[test]
fn test_dry_run_changes_nothing() {
    let project = TestProject::unity(r#"{"dependencies": {}}"#);
    let before = project.read_unity_manifest();
    let npm = FakeNpm::default();

    let opened = Project::open(project.path()).unwrap();
    let mut request = InstallRequest::new("com.c.d", Some("2.0.0".to_string()));
    request.dry_run = true;
    let outcome = install(&opened, &request, &Config::default(), &npm).unwrap();

    assert!(matches!(outcome, InstallOutcome::DryRun { .. }));
    assert_eq!(project.read_unity_manifest(), before);
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn test_sync_report_lists_every_candidate() {
    let project = TestProject::unreal();
    let scope = project.scope_dir();
    fs::create_dir_all(&scope).unwrap();

    MockPlugin::new("Inventory", "1.0.0").create_in(&scope);
    MockPlugin::new("Broken", "1.0.0")
        .with_raw_descriptor("{ not json")
        .create_in(&scope);
    fs::create_dir_all(scope.join("helpers")).unwrap();
    fs::write(scope.join("helpers/index.js"), "").unwrap();

    let report = sync_plugins(&scope, project.plugins_dir(), &SyncOptions::default()).unwrap();

    assert_eq!(report.modules.len(), 3);
    assert_eq!(report.synced_count(), 2);
    assert_eq!(
        report.get("helpers").unwrap().outcome,
        SyncOutcome::Skipped {
            reason: SkipReason::NoMarkerFile
        }
    );
    assert!(project.has_plugin("Broken"));
}

// ============================================================================
// Publish
// ============================================================================

#[test]
fn test_publish_writes_package_json_and_uses_snapshot() {
    let plugin_root = tempfile::TempDir::new().unwrap();
    let plugin_dir = MockPlugin::new("Inventory", "1.0.0").create_in(plugin_root.path());
    fs::remove_file(plugin_dir.join("package.json")).unwrap();

    let npm = FakeNpm::default();
    let config = config_with("https://npm.example.com/snapshot/");

    let mut draft = analyze_package(&plugin_dir, Engine::Unreal).unwrap();
    assert_eq!(draft.name, "inventory");
    draft.version = "1.1.0-rc.1".to_string();

    let outcome = publish(&plugin_dir, &draft, Engine::Unreal, &config, &npm, false).unwrap();

    assert_eq!(outcome.channel, Channel::Snapshot);
    assert_eq!(
        npm.calls(),
        vec![Call::Publish {
            registry: "https://npm.example.com/snapshot/".to_string(),
            cwd: plugin_dir.clone(),
        }]
    );
    assertions::file_contains(&plugin_dir.join("package.json"), "\"version\": \"1.1.0-rc.1\"");
}

#[test]
fn test_publish_without_registry_writes_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let npm = FakeNpm::default();
    let config = Config::default();

    let mut draft = analyze_package(dir.path(), Engine::Unity).unwrap();
    draft.name = "com.company.tools".to_string();

    let err = publish(dir.path(), &draft, Engine::Unity, &config, &npm, false).unwrap_err();

    assert!(matches!(
        err,
        Error::NoRegistryConfigured {
            engine: "unity",
            channel: "release"
        }
    ));
    assert!(npm.calls().is_empty());
    assert!(!dir.path().join("package.json").exists());
}

#[test]
fn test_publish_requires_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let npm = FakeNpm::default();
    let draft = analyze_package(dir.path(), Engine::Unity).unwrap();

    let err = publish(dir.path(), &draft, Engine::Unity, &config_with(""), &npm, false).unwrap_err();
    assert!(matches!(err, Error::InvalidManifest(_)));
}

#[test]
fn test_publish_failure_surfaces_stderr() {
    let dir = tempfile::TempDir::new().unwrap();
    let npm = FakeNpm::failing("npm ERR! 403 cannot publish over existing version");
    let mut draft = analyze_package(dir.path(), Engine::Unity).unwrap();
    draft.name = "com.company.tools".to_string();

    let err = publish(dir.path(), &draft, Engine::Unity, &config_with(""), &npm, false).unwrap_err();
    assert!(err.to_string().contains("403 cannot publish"));
}
