use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};
use thiserror::Error;

use crate::plugin_system::error::PluginSystemError;

/// Error type for version parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,
    #[error("Invalid numeric component '{component}' in version '{input}'")]
    InvalidComponent { input: String, component: String },
    #[error("Too many numeric components in version '{0}' (at most major.minor.patch)")]
    TooManyComponents(String),
    #[error("Invalid qualifier in version '{input}': {message}")]
    InvalidQualifier { input: String, message: String },
}

/// A version identifier as declared by plugins and the host.
///
/// Parsing is lenient: `v2`, `2.1` and `2.1.0` are all accepted, missing
/// components count as zero. Ordering compares the numeric components first,
/// then the qualifier (`2.0.0-beta < 2.0.0`). Build metadata is kept for
/// display but never affects ordering or equality.
#[derive(Debug, Clone)]
pub struct PluginVersion {
    inner: Version,
}

impl PluginVersion {
    /// Creates a plain `major.minor.patch` version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            inner: Version::new(major, minor, patch),
        }
    }

    /// Parses a version string like "1.2.3", "1.2", "v2" or "2.0.0-beta.1+abc"
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let (rest, build) = match trimmed.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (trimmed, None),
        };
        let (core, qualifier) = match rest.split_once('-') {
            Some((core, qualifier)) => (core, Some(qualifier)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::TooManyComponents(input.to_string()));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            *slot = part.parse::<u64>().map_err(|_| VersionError::InvalidComponent {
                input: input.to_string(),
                component: part.to_string(),
            })?;
        }

        let mut inner = Version::new(numbers[0], numbers[1], numbers[2]);
        if let Some(qualifier) = qualifier {
            inner.pre = Prerelease::new(qualifier).map_err(|e| VersionError::InvalidQualifier {
                input: input.to_string(),
                message: e.to_string(),
            })?;
        }
        if let Some(build) = build {
            inner.build = BuildMetadata::new(build).map_err(|e| VersionError::InvalidQualifier {
                input: input.to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(Self { inner })
    }

    pub fn major(&self) -> u64 {
        self.inner.major
    }

    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// The qualifier (pre-release part), empty when absent
    pub fn qualifier(&self) -> &str {
        self.inner.pre.as_str()
    }

    /// Returns a reference to the underlying `semver::Version`.
    pub fn semver(&self) -> &Version {
        &self.inner
    }
}

impl PartialEq for PluginVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PluginVersion {}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // semver's own Ord also looks at build metadata, so compare field by field.
        (self.inner.major, self.inner.minor, self.inner.patch)
            .cmp(&(other.inner.major, other.inner.minor, other.inner.patch))
            .then_with(|| self.inner.pre.cmp(&other.inner.pre))
    }
}

impl FromStr for PluginVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginVersion::parse(s)
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Rejects a plugin whose declared minimum host version is newer than the host.
pub fn check_host_compatibility(
    plugin: &str,
    min_required: &str,
    actual: &PluginVersion,
) -> Result<(), PluginSystemError> {
    let required = PluginVersion::parse(min_required).map_err(|source| {
        PluginSystemError::VersionParsing {
            plugin: plugin.to_string(),
            source,
        }
    })?;
    if required > *actual {
        return Err(PluginSystemError::IncompatibleVersion {
            plugin: plugin.to_string(),
            required: required.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
