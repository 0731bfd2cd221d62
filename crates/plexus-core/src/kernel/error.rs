//! # Plexus Kernel Errors
//!
//! Defines the kernel-level [`Error`] type that wraps every subsystem error
//! (plugin system, configuration, host version) so that callers of the
//! [`Application`](crate::kernel::bootstrap::Application) only deal with one
//! error type, plus the matching [`Result`] alias.
use std::any::Any;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::version::VersionError;

/// Custom error type for the Plexus runtime
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Runtime configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The configured host version could not be parsed
    #[error("Invalid host version: {0}")]
    HostVersion(#[from] VersionError),

    /// I/O error with the operation and path that caused it
    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        operation: String,
        path: PathBuf,
    },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    Lifecycle {
        phase: KernelLifecyclePhase,
        message: String,
    },
}

/// Errors raised while reading the runtime configuration
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Unknown or unsupported config format for path: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to deserialize {format} config '{}': {message}", path.display())]
    Deserialize {
        format: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("Failed to serialize config to {format}: {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("PreInit")]
    PreInit,
    #[error("Init")]
    Init,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Create an I/O error carrying the failed operation and path
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}
