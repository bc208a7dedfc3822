//! Registry selection
//!
//! Each engine has two package feeds: a release registry for stable builds and
//! a snapshot registry for pre-release builds. The feed is chosen from the
//! version string alone.
//!
//! # Examples
//!
//! ```
//! use gpm::{select_registry, PrereleaseRule, RegistryConfig};
//!
//! let config = RegistryConfig {
//!     release: "https://nexus.example.com/npm-release/".to_string(),
//!     snapshot: "https://nexus.example.com/npm-snapshot/".to_string(),
//! };
//!
//! assert_eq!(
//!     select_registry(&config, "1.0.0", PrereleaseRule::Hyphen),
//!     "https://nexus.example.com/npm-release/"
//! );
//! assert_eq!(
//!     select_registry(&config, "1.0.0-beta", PrereleaseRule::Hyphen),
//!     "https://nexus.example.com/npm-snapshot/"
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Release and snapshot registry URLs for one engine
///
/// An empty string means "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub release: String,

    #[serde(default)]
    pub snapshot: String,
}

impl RegistryConfig {
    pub fn url(&self, channel: Channel) -> &str {
        match channel {
            Channel::Release => &self.release,
            Channel::Snapshot => &self.snapshot,
        }
    }
}

/// How a version string is classified as pre-release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrereleaseRule {
    /// Any `-` anywhere in the version (`1.0.0-beta`, but also `2024-05`)
    #[default]
    Hyphen,

    /// Only versions that parse as semver and carry a pre-release tag.
    /// Unparseable versions are treated as stable.
    Semver,
}

impl PrereleaseRule {
    pub fn is_prerelease(&self, version: &str) -> bool {
        match self {
            PrereleaseRule::Hyphen => version.contains('-'),
            PrereleaseRule::Semver => semver::Version::parse(version.trim_start_matches('v'))
                .map(|v| !v.pre.is_empty())
                .unwrap_or(false),
        }
    }
}

impl std::str::FromStr for PrereleaseRule {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "hyphen" => Ok(PrereleaseRule::Hyphen),
            "semver" => Ok(PrereleaseRule::Semver),
            other => Err(crate::Error::Other(format!(
                "Unknown pre-release rule '{}'. Use 'hyphen' or 'semver'",
                other
            ))),
        }
    }
}

/// Which of the two registries a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Release,
    Snapshot,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Release => "release",
            Channel::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the channel for `version`
///
/// Pre-release versions go to the snapshot feed only when one is configured;
/// otherwise they fall back to release. There is no retry across channels
/// after the choice is made.
pub fn select_channel(config: &RegistryConfig, version: &str, rule: PrereleaseRule) -> Channel {
    if rule.is_prerelease(version) && !config.snapshot.is_empty() {
        Channel::Snapshot
    } else {
        Channel::Release
    }
}

/// Registry URL for `version`; may be empty when release is not configured
pub fn select_registry<'a>(config: &'a RegistryConfig, version: &str, rule: PrereleaseRule) -> &'a str {
    config.url(select_channel(config, version, rule))
}
