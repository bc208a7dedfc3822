use anyhow::Result;
use gpm::{sync_plugins, Config, Engine, Project, SyncOptions, SyncOutcome, SyncReport};

use super::resolve_path;

pub fn run(path: Option<String>, clean: bool, scope: Option<String>, json: bool) -> Result<()> {
    let project_dir = resolve_path(path)?;
    let project = Project::open(&project_dir)?;
    if project.engine != Engine::Unreal {
        anyhow::bail!(
            "Plugin sync only applies to Unreal projects ({} is a {} project)",
            project.root.display(),
            project.engine
        );
    }

    let config = Config::load()?;
    let scope = scope.unwrap_or_else(|| config.sync.scope.clone());
    let source = project.scope_dir(&scope);
    let destination = project.plugins_dir();

    let options = SyncOptions {
        clean: clean || config.sync.clean,
        ..SyncOptions::default()
    };

    if !json {
        println!(
            "Syncing plugins from {} to {}...",
            source.display(),
            destination.display()
        );
        println!();
    }

    let report = sync_plugins(&source, &destination, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_empty() {
        println!("No {} modules found in node_modules.", scope);
    } else {
        print_report(&report);
    }

    if report.failed_count() > 0 {
        anyhow::bail!(
            "{} plugin{} failed to sync",
            report.failed_count(),
            if report.failed_count() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

pub fn print_report(report: &SyncReport) {
    for module in &report.modules {
        match &module.outcome {
            SyncOutcome::Synced { files } => println!(
                "  ✓ {} ({} file{})",
                module.name,
                files,
                if *files == 1 { "" } else { "s" }
            ),
            SyncOutcome::Skipped { reason } => println!("  - {} skipped: {}", module.name, reason),
            SyncOutcome::Failed { error } => println!("  ✗ {} failed: {}", module.name, error),
        }
    }
    println!();
    println!(
        "Sync complete: {} synced, {} skipped, {} failed",
        report.synced_count(),
        report.skipped_count(),
        report.failed_count()
    );
}
