pub mod config;
pub mod install;
pub mod publish;
pub mod scan;
pub mod sync;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::PathBuf;

/// Resolve a user-supplied project path, expanding `~` and defaulting to the
/// current directory
pub fn resolve_path(path: Option<String>) -> Result<PathBuf> {
    match path {
        Some(p) => {
            let expanded = shellexpand::tilde(&p);
            let path = PathBuf::from(expanded.as_ref());
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(env::current_dir()?.join(path))
            }
        }
        None => Ok(env::current_dir()?),
    }
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
