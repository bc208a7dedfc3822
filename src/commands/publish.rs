use anyhow::Result;
use gpm::{analyze_package, detect_package_engine, publish, Config, Engine, NpmCli};

use super::{resolve_path, spinner};

pub fn run(
    path: Option<String>,
    engine: Option<String>,
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let package_dir = resolve_path(path)?;
    if !package_dir.is_dir() {
        anyhow::bail!("Package directory does not exist: {}", package_dir.display());
    }

    let engine = match engine {
        Some(e) => e.parse::<Engine>()?,
        None => detect_package_engine(&package_dir)?,
    };

    if dry_run {
        println!("[DRY RUN] Publishing {} package...", engine);
    } else {
        println!("Publishing {} package...", engine);
    }
    println!();

    let mut draft = analyze_package(&package_dir, engine)?;
    if let Some(name) = name {
        draft.name = name;
    }
    if let Some(version) = version {
        draft.version = version;
    }
    if let Some(description) = description {
        draft.description = description;
    }

    println!("  Name:        {}", draft.name);
    println!("  Version:     {}", draft.version);
    if !draft.description.is_empty() {
        println!("  Description: {}", draft.description);
    }
    println!();

    let config = Config::load()?;
    let npm = NpmCli::from_config(&config.subprocess);

    let spinner = spinner("Publishing...");
    let outcome = match publish(&package_dir, &draft, engine, &config, &npm, dry_run) {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    match &outcome.output {
        None => {
            println!(
                "[DRY RUN] Would write {} and publish to {} ({})",
                outcome.package_json.display(),
                outcome.registry,
                outcome.channel
            );
        }
        Some(output) => {
            let stdout = output.stdout.trim();
            if !stdout.is_empty() {
                println!("{}", stdout);
                println!();
            }
            println!(
                "✓ Published {}@{} to {} ({})",
                draft.name, draft.version, outcome.registry, outcome.channel
            );
        }
    }

    Ok(())
}
