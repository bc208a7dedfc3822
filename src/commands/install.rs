use anyhow::Result;
use gpm::{install, Config, InstallOutcome, InstallRequest, NpmCli, Project};

use super::{resolve_path, spinner};

pub fn run(
    package: String,
    version: Option<String>,
    path: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let project_dir = resolve_path(path)?;

    let spinner = spinner("Checking project type...");
    let project = match Project::open(&project_dir) {
        Ok(project) => project,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    let mut request = InstallRequest::parse(&package, version)?;
    request.dry_run = dry_run;

    let config = Config::load()?;
    let npm = NpmCli::from_config(&config.subprocess);

    spinner.set_message(format!(
        "Installing {}@{} for {}...",
        request.package_id, request.version, project.engine
    ));

    let outcome = match install(&project, &request, &config, &npm) {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            println!("✗ Installation of {} failed", request.package_id);
            return Err(e.into());
        }
    };

    spinner.finish_and_clear();
    println!("✓ {}", outcome.message());

    if let InstallOutcome::Unreal {
        registry,
        channel,
        sync,
        ..
    } = &outcome
    {
        println!("  Registry: {} ({})", registry, channel);
        println!();
        if sync.is_empty() {
            println!("  No {} modules found in node_modules.", config.sync.scope);
        } else {
            super::sync::print_report(sync);
        }

        if sync.failed_count() > 0 {
            anyhow::bail!(
                "{} installed, but {} plugin{} failed to sync",
                request.package_id,
                sync.failed_count(),
                if sync.failed_count() == 1 { "" } else { "s" }
            );
        }
    }

    Ok(())
}
