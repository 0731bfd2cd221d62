//! # Plexus Plugin System
//!
//! Discovers plugin archives on disk, validates them against the host and
//! the plugins already loaded, and drives their lifecycle.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`loader`]**: [`PluginLoader`] wraps one archive. `verify` checks for an
//!   entry point without running plugin code, `load` instantiates the plugin,
//!   `close` releases the archive exactly once.
//! - **[`manager`]**: [`PluginManager`] runs discovery (`pre_load`) and the
//!   lock-guarded commit phase (`load_all`, `load`, `unload`, `unload_all`).
//! - **[`registry`]**: [`PluginRegistry`] holds loaded plugins with the
//!   loaders that own their archives.
//! - **[`version`]**: host compatibility check on [`PluginVersion`].
//! - **[`dependency`]**: "every declared dependency is already loaded".
//! - **[`metadata`]**: what a plugin declares about itself.
//! - **[`traits`]**: the [`Plugin`] trait, [`PluginContext`] and the
//!   [`declare_plugin!`](crate::declare_plugin) macro.
//! - **[`error`]**: [`PluginSystemError`].
pub mod dependency;
pub mod error;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod registry;
pub mod traits;
pub mod version;

pub use error::{LifecyclePhase, PluginSystemError};
pub use loader::{DynamicLibraryArchive, PluginArchive, PluginLoader, StaticArchive, is_plugin_archive};
pub use manager::PluginManager;
pub use metadata::{MetadataBuilder, PluginMetadata};
pub use registry::{LoadedPlugin, PluginRegistry};
pub use traits::{Plugin, PluginContext, PluginError, PluginResult};
pub use version::PluginVersion;

#[cfg(test)]
mod tests;
