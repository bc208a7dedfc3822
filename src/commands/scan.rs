use anyhow::Result;
use gpm::{read_installed, Project};

use super::resolve_path;

pub fn run(path: Option<String>, json: bool) -> Result<()> {
    let project_dir = resolve_path(path)?;
    let project = Project::open(&project_dir)?;
    let packages = read_installed(project.engine, &project.root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    if packages.is_empty() {
        println!(
            "No packages installed in {} project at {}.",
            project.engine,
            project.root.display()
        );
        println!();
        println!("Install packages with: gpm install <package>");
        return Ok(());
    }

    println!(
        "Found {} package{} in {} project:",
        packages.len(),
        if packages.len() == 1 { "" } else { "s" },
        project.engine
    );
    for package in &packages {
        println!("  {} @ {}", package.id, package.version);
    }

    Ok(())
}
