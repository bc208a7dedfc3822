use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Manifest not found: {}\n\n\
             Hint: Unity projects keep their dependencies in Packages/manifest.json.\n\
             Open the project once in the Unity editor to generate it.",
             .0.display())]
    ManifestMissing(PathBuf),

    #[error("No Unity or Unreal project found at {}\n\n\
             Hint: gpm recognises a project by one of these markers:\n\
             - Unity:  Packages/manifest.json\n\
             - Unreal: a *.uproject file in the project root\n\n\
             Try: gpm scan /path/to/your/project",
             .0.display())]
    NoSupportedProject(PathBuf),

    #[error("Cannot read project directory {}: {source}", .path.display())]
    UnreadableProject {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {channel} registry configured for {engine}\n\n\
             Hint: set one with:\n\
                gpm config set {engine}.{channel} <url>")]
    NoRegistryConfigured {
        engine: &'static str,
        channel: &'static str,
    },

    #[error("Command `{command}` failed ({status})\n{stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command `{command}` did not finish within {timeout:?} and was stopped")]
    CommandTimedOut {
        command: String,
        timeout: std::time::Duration,
    },

    #[error("{0}")]
    Other(String),
}
