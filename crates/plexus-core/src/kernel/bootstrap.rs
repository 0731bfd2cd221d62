use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::event::HostEvent;
use crate::kernel::config::RuntimeConfig;
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::services::HostServices;
use crate::module::{Module, ModuleError, ModuleManager};
use crate::plugin_system::{PluginLoader, PluginManager, PluginVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    PreInitialized,
    Initialized,
    ShutDown,
}

/// The host runtime: owns the services, the module registry and the plugin
/// manager, and drives the two-step startup.
///
/// 1. [`pre_init`](Self::pre_init) launches plugin discovery as a background
///    task.
/// 2. [`init`](Self::init) waits for discovery, commits every plugin in one
///    batch and post-initialises the modules.
pub struct Application {
    config: RuntimeConfig,
    services: HostServices,
    modules: Arc<ModuleManager>,
    plugins: Arc<PluginManager>,
    builtins: Vec<PluginLoader>,
    discovery: Option<JoinHandle<Vec<PluginLoader>>>,
    phase: Phase,
}

impl Application {
    /// Create the runtime with default services (in-process event bus,
    /// console notifications).
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_services(config, HostServices::with_defaults())
    }

    /// Create the runtime around caller-provided services
    pub fn with_services(config: RuntimeConfig, services: HostServices) -> Result<Self> {
        let host_version = PluginVersion::parse(&config.host_version)?;
        log::info!("Initializing {} v{}", constants::APP_NAME, host_version);

        services.set_toggle_messages(config.toggle_messages);
        let modules = Arc::new(ModuleManager::new());
        let plugins = Arc::new(PluginManager::new(host_version, services.clone(), modules.clone()));

        Ok(Self {
            config,
            services,
            modules,
            plugins,
            builtins: Vec::new(),
            discovery: None,
            phase: Phase::Created,
        })
    }

    /// Launch plugin discovery in the background on the current tokio
    /// runtime. Fails when called twice or outside a runtime.
    pub fn pre_init(&mut self) -> Result<()> {
        if self.phase != Phase::Created {
            return Err(Error::Lifecycle {
                phase: KernelLifecyclePhase::PreInit,
                message: "pre_init has already run".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::Lifecycle {
            phase: KernelLifecyclePhase::PreInit,
            message: format!("plugin discovery needs a tokio runtime: {e}"),
        })?;
        let dir = self.config.plugin_dir.clone();
        log::debug!("Scanning '{}' for plugins", dir.display());
        self.discovery = Some(runtime.spawn(PluginManager::pre_load(dir)));
        self.phase = Phase::PreInitialized;
        Ok(())
    }

    /// Wait for discovery, load every plugin (built-ins first) and
    /// post-initialise all modules. Returns the number of plugins loaded.
    pub async fn init(&mut self) -> Result<usize> {
        if matches!(self.phase, Phase::Initialized | Phase::ShutDown) {
            return Err(Error::Lifecycle {
                phase: KernelLifecyclePhase::Init,
                message: "init has already run".to_string(),
            });
        }

        let discovered = match self.discovery.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                log::error!("Plugin discovery task failed: {}", e);
                Vec::new()
            }),
            None => {
                log::error!("init called without pre_init; no plugins were discovered");
                Vec::new()
            }
        };

        let mut loaders = std::mem::take(&mut self.builtins);
        loaders.extend(discovered);
        let loaded = self.plugins.load_all(loaders);

        self.modules.post_init_all();
        self.phase = Phase::Initialized;
        Ok(loaded)
    }

    /// Queue an in-process plugin for the startup batch. After `init` the
    /// plugin is loaded right away and a rejection is returned.
    pub fn register_builtin(&mut self, loader: PluginLoader) -> Result<()> {
        if self.phase == Phase::Initialized {
            self.plugins.load(loader)?;
        } else {
            self.builtins.push(loader);
        }
        Ok(())
    }

    /// Register a module owned by the host itself
    pub fn register_module(&self, module: Arc<Module>) -> std::result::Result<(), ModuleError> {
        self.modules.register(module, None)
    }

    /// Verify and load one archive after startup. Returns the plugin name.
    pub fn load_archive(&self, path: &Path) -> Result<String> {
        let mut loader = PluginLoader::open(path);
        loader.verify()?;
        Ok(self.plugins.load(loader)?)
    }

    /// Post a tick to every subscribed module
    pub fn tick(&self, tick: u64) {
        self.services.events().post(&HostEvent::Tick { tick });
    }

    /// Announce shutdown and unload every plugin. Returns the number unloaded.
    pub fn shutdown(&mut self) -> usize {
        if self.phase != Phase::ShutDown {
            self.services.events().post(&HostEvent::Shutdown);
        }
        if let Some(handle) = self.discovery.take() {
            handle.abort();
        }
        self.builtins.clear();
        self.phase = Phase::ShutDown;
        let unloaded = self.plugins.unload_all();
        // Host-owned modules stay registered but leave the bus.
        for module in self.modules.modules() {
            self.services.events().unsubscribe(module.name());
        }
        unloaded
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == Phase::Initialized
    }

    pub fn plugins(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}
