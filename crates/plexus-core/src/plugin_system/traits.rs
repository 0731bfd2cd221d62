use std::sync::Arc;

use crate::kernel::services::HostServices;
use crate::module::{Module, ModuleError, ModuleManager};
use crate::plugin_system::metadata::PluginMetadata;

/// Error type returned by plugin lifecycle callbacks
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl From<String> for PluginError {
    fn from(msg: String) -> Self {
        PluginError::Message(msg)
    }
}

impl From<&str> for PluginError {
    fn from(msg: &str) -> Self {
        PluginError::Message(msg.to_string())
    }
}

/// Result type of plugin lifecycle callbacks
pub type PluginResult = std::result::Result<(), PluginError>;

/// Core trait that all plugins must implement.
///
/// The manager drives the callbacks in a fixed order:
/// `on_load` → `register` while loading, `unregister` → `on_unload` while
/// unloading. Callbacks must not call back into the
/// [`PluginManager`](crate::plugin_system::PluginManager): its lock is held
/// for the whole sequence.
pub trait Plugin: Send + Sync {
    /// Declared metadata (name, authors, minimum host version, dependencies)
    fn metadata(&self) -> &PluginMetadata;

    /// Called once after the plugin passed validation, before `register`
    fn on_load(&self) -> PluginResult {
        Ok(())
    }

    /// Attach modules and other resources to the host
    fn register(&self, ctx: &PluginContext) -> PluginResult;

    /// Detach what `register` attached. Modules registered through
    /// [`PluginContext::register_module`] are released by the host afterwards
    /// even if this is left empty.
    fn unregister(&self, _ctx: &PluginContext) -> PluginResult {
        Ok(())
    }

    /// Called last, right before the instance is dropped and its archive closed
    fn on_unload(&self) -> PluginResult {
        Ok(())
    }

    /// The plugin name
    fn name(&self) -> &str {
        &self.metadata().name
    }
}

/// Handle given to `register`/`unregister`, scoped to one plugin
#[derive(Clone)]
pub struct PluginContext {
    plugin: String,
    services: HostServices,
    modules: Arc<ModuleManager>,
}

impl PluginContext {
    pub fn new(plugin: &str, services: HostServices, modules: Arc<ModuleManager>) -> Self {
        Self {
            plugin: plugin.to_string(),
            services,
            modules,
        }
    }

    /// Name of the plugin this context belongs to
    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// Shared host services (settings, event bus, notifications)
    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// The host's module registry
    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }

    /// Register a module owned by this plugin. It is shut down, unsubscribed
    /// and its settings discarded when the plugin is unloaded.
    pub fn register_module(&self, module: Arc<Module>) -> Result<(), ModuleError> {
        self.modules.register(module, Some(&self.plugin))
    }
}

/// Exports the entry point and ABI marker of a plugin archive.
///
/// Use once at the crate root of a `cdylib` plugin:
///
/// ```rust,ignore
/// plexus_core::declare_plugin!(MyPlugin, MyPlugin::new);
/// ```
///
/// The archive must be built with the same compiler and `plexus-core` version
/// as the host; the ABI marker only guards against `Plugin` trait revisions.
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_type:ty, $constructor:path) => {
        #[unsafe(no_mangle)]
        pub static _PLEXUS_PLUGIN_ABI: u32 = $crate::kernel::constants::PLUGIN_ABI_VERSION;

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C-unwind" fn _plexus_plugin_create() -> *mut ::std::boxed::Box<dyn $crate::plugin_system::Plugin> {
            let plugin: $plugin_type = $constructor();
            let boxed: ::std::boxed::Box<dyn $crate::plugin_system::Plugin> = ::std::boxed::Box::new(plugin);
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(boxed))
        }
    };
}
