//! # Plexus Plugin System Errors
//!
//! Defines [`PluginSystemError`], the error taxonomy of the plugin system.
//! Every variant describes the failure of exactly one plugin (or one archive);
//! the manager logs them and carries on with the rest of the batch.
//!
//! - [`NotAPlugin`](PluginSystemError::NotAPlugin): the archive has no entry
//!   point. Expected for foreign libraries in the plugin directory.
//! - [`LoadFailure`](PluginSystemError::LoadFailure): anything else that went
//!   wrong while resolving or instantiating an archive.
//! - [`IncompatibleVersion`](PluginSystemError::IncompatibleVersion) and
//!   [`MissingDependency`](PluginSystemError::MissingDependency): validation
//!   rejections at commit time.
use std::path::PathBuf;

use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("'{}' is not a plugin archive: {reason}", path.display())]
    NotAPlugin { path: PathBuf, reason: String },

    #[error("Failed to load plugin archive '{}': {message}", path.display())]
    LoadFailure { path: PathBuf, message: String },

    #[error(
        "Plugin '{plugin}' is unsupported by this host version (minimum version: {required}, current version: {actual})"
    )]
    IncompatibleVersion {
        plugin: String,
        required: String,
        actual: String,
    },

    #[error("Plugin '{plugin}' is missing required dependencies: {}", missing.join(", "))]
    MissingDependency { plugin: String, missing: Vec<String> },

    #[error("A plugin named '{plugin}' is already loaded")]
    DuplicatePlugin { plugin: String },

    #[error("Plugin '{plugin}' failed during {phase}: {message}")]
    LifecycleFailure {
        plugin: String,
        phase: LifecyclePhase,
        message: String,
    },

    #[error("Plugin '{plugin}' declares an unparseable minimum host version: {source}")]
    VersionParsing {
        plugin: String,
        #[source]
        source: VersionError,
    },
}

/// The four plugin lifecycle callbacks, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecyclePhase {
    #[error("on_load")]
    OnLoad,
    #[error("register")]
    Register,
    #[error("unregister")]
    Unregister,
    #[error("on_unload")]
    OnUnload,
}

impl PluginSystemError {
    /// Whether this failure is the expected "not a plugin" case (logged at info)
    pub fn is_not_a_plugin(&self) -> bool {
        matches!(self, PluginSystemError::NotAPlugin { .. })
    }
}

impl From<DependencyError> for PluginSystemError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::MissingPlugin { plugin, missing } => {
                PluginSystemError::MissingDependency { plugin, missing }
            }
        }
    }
}
