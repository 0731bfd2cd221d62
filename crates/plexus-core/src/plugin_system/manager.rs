use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::fs;

use crate::event::HostEvent;
use crate::kernel::error::panic_message;
use crate::kernel::services::HostServices;
use crate::module::ModuleManager;
use crate::plugin_system::dependency::check_dependencies;
use crate::plugin_system::error::{LifecyclePhase, PluginSystemError};
use crate::plugin_system::loader::{PluginLoader, is_plugin_archive};
use crate::plugin_system::metadata::PluginMetadata;
use crate::plugin_system::registry::{LoadedPlugin, PluginRegistry};
use crate::plugin_system::traits::{Plugin, PluginContext, PluginResult};
use crate::plugin_system::version::{PluginVersion, check_host_compatibility};

/// Run one plugin lifecycle hook, turning errors and panics into
/// [`PluginSystemError::LifecycleFailure`].
fn run_hook<F>(plugin: &str, phase: LifecyclePhase, hook: F) -> Result<(), PluginSystemError>
where
    F: FnOnce() -> PluginResult,
{
    let message = match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(&*payload)),
    };
    Err(PluginSystemError::LifecycleFailure {
        plugin: plugin.to_string(),
        phase,
        message,
    })
}

/// Orchestrates discovery, validation, loading and unloading of plugins.
///
/// Every registry mutation happens under one lock, held for the whole of a
/// batch, so no caller can observe a half-registered plugin. Plugin hooks run
/// with that lock held and must not call back into the manager.
pub struct PluginManager {
    registry: Mutex<PluginRegistry>,
    host_version: PluginVersion,
    services: HostServices,
    modules: Arc<ModuleManager>,
}

impl PluginManager {
    pub fn new(host_version: PluginVersion, services: HostServices, modules: Arc<ModuleManager>) -> Self {
        Self {
            registry: Mutex::new(PluginRegistry::new()),
            host_version,
            services,
            modules,
        }
    }

    /// Scan `dir` for plugin archives and verify them.
    ///
    /// The directory is created if missing. Files whose extension does not
    /// match the platform archive format are skipped without a word.
    /// Candidates are verified concurrently on the blocking pool; the
    /// returned loaders keep directory enumeration order.
    pub async fn pre_load(dir: impl AsRef<Path>) -> Vec<PluginLoader> {
        let dir = dir.as_ref();
        if let Err(e) = fs::create_dir_all(dir).await {
            log::error!("Failed to create plugin directory '{}': {}", dir.display(), e);
            return Vec::new();
        }

        let candidates = match Self::list_archives(dir).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("Failed to read plugin directory '{}': {}", dir.display(), e);
                return Vec::new();
            }
        };

        let handles: Vec<_> = candidates
            .into_iter()
            .map(|path| {
                tokio::task::spawn_blocking(move || {
                    let mut loader = PluginLoader::open(path);
                    loader.verify().map(|()| loader)
                })
            })
            .collect();

        let mut loaders = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(loader)) => {
                    log::debug!("Found plugin archive '{}'", loader.path().display());
                    loaders.push(loader);
                }
                Ok(Err(e)) if e.is_not_a_plugin() => log::info!("{}", e),
                Ok(Err(e)) => log::error!("{}", e),
                Err(e) => log::error!("Plugin verification task failed: {}", e),
            }
        }
        loaders
    }

    async fn list_archives(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_plugin_archive(&path) {
                continue;
            }
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => archives.push(path),
                Ok(_) => {}
                Err(e) => log::error!("Failed to read metadata of '{}': {}", path.display(), e),
            }
        }
        Ok(archives)
    }

    /// Commit a batch of loaders in order. Rejected plugins are logged and
    /// skipped; each plugin's dependency check sees the plugins committed
    /// before it in the same batch. Returns the number of plugins loaded.
    pub fn load_all(&self, loaders: Vec<PluginLoader>) -> usize {
        let loaded: Vec<String> = {
            let mut registry = self.lock();
            loaders
                .into_iter()
                .filter_map(|loader| match self.commit(&mut registry, loader) {
                    Ok(name) => Some(name),
                    Err(e) => {
                        log::error!("{}", e);
                        None
                    }
                })
                .collect()
        };

        log::info!("Loaded {} plugins", loaded.len());
        for plugin in &loaded {
            self.services.events().post(&HostEvent::PluginLoaded { plugin: plugin.clone() });
        }
        loaded.len()
    }

    /// Commit a single loader after startup. Returns the plugin name.
    pub fn load(&self, loader: PluginLoader) -> Result<String, PluginSystemError> {
        let result = {
            let mut registry = self.lock();
            self.commit(&mut registry, loader)
        };
        match &result {
            Ok(name) => {
                self.services.events().post(&HostEvent::PluginLoaded { plugin: name.clone() });
            }
            Err(e) => log::error!("{}", e),
        }
        result
    }

    fn commit(&self, registry: &mut PluginRegistry, mut loader: PluginLoader) -> Result<String, PluginSystemError> {
        let plugin = loader.load()?;
        let name = plugin.name().to_string();

        if let Err(e) = self.validate(registry, plugin.as_ref()) {
            LoadedPlugin { plugin, loader }.close();
            return Err(e);
        }

        let ctx = self.context(&name);
        let activated = run_hook(&name, LifecyclePhase::OnLoad, || plugin.on_load())
            .and_then(|()| run_hook(&name, LifecyclePhase::Register, || plugin.register(&ctx)));
        if let Err(e) = activated {
            self.modules.release_owned_by(&name);
            LoadedPlugin { plugin, loader }.close();
            return Err(e);
        }

        registry
            .insert(LoadedPlugin { plugin, loader })
            .map_err(|(entry, e)| {
                entry.close();
                e
            })?;
        log::info!("Loaded plugin '{}'", name);
        Ok(name)
    }

    fn validate(&self, registry: &PluginRegistry, plugin: &dyn Plugin) -> Result<(), PluginSystemError> {
        let metadata = plugin.metadata();
        if registry.contains(&metadata.name) {
            return Err(PluginSystemError::DuplicatePlugin {
                plugin: metadata.name.clone(),
            });
        }
        check_host_compatibility(&metadata.name, &metadata.min_host_version, &self.host_version)?;
        check_dependencies(&metadata.name, &metadata.dependencies, &registry.loaded_names())?;
        Ok(())
    }

    /// Unload one plugin. Returns `false` if it was not loaded.
    pub fn unload(&self, name: &str) -> bool {
        {
            let mut registry = self.lock();
            let Some(entry) = registry.remove(name) else {
                return false;
            };
            let dependents = Self::dependents_in(&registry, name);
            if !dependents.is_empty() {
                log::warn!(
                    "Unloading plugin '{}' still required by: {}",
                    name,
                    dependents.join(", ")
                );
            }
            self.teardown(entry);
        }
        self.services.events().post(&HostEvent::PluginUnloaded { plugin: name.to_string() });
        true
    }

    /// Unload every plugin, most recently loaded first. Returns the number
    /// unloaded; zero when nothing was loaded.
    pub fn unload_all(&self) -> usize {
        let names: Vec<String> = {
            let mut registry = self.lock();
            registry
                .drain()
                .into_iter()
                .map(|entry| {
                    let name = entry.name().to_string();
                    self.teardown(entry);
                    name
                })
                .collect()
        };

        log::info!("Unloaded {} plugins", names.len());
        for plugin in &names {
            self.services.events().post(&HostEvent::PluginUnloaded { plugin: plugin.clone() });
        }
        names.len()
    }

    /// Hooks, then module release, then the archive. Never skips a step.
    fn teardown(&self, entry: LoadedPlugin) {
        let name = entry.name().to_string();
        let ctx = self.context(&name);
        if let Err(e) = run_hook(&name, LifecyclePhase::Unregister, || entry.plugin.unregister(&ctx)) {
            log::warn!("{}", e);
        }
        if let Err(e) = run_hook(&name, LifecyclePhase::OnUnload, || entry.plugin.on_unload()) {
            log::warn!("{}", e);
        }
        let released = self.modules.release_owned_by(&name);
        entry.close();
        log::info!("Unloaded plugin '{}' ({} modules released)", name, released);
    }

    fn context(&self, plugin: &str) -> PluginContext {
        PluginContext::new(plugin, self.services.clone(), self.modules.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PluginRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dependents_in(registry: &PluginRegistry, name: &str) -> Vec<String> {
        registry
            .iter()
            .filter(|e| e.metadata().depends_on(name))
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Names of loaded plugins in load order
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.lock().names()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn plugin_metadata(&self, name: &str) -> Option<PluginMetadata> {
        self.lock().get(name).map(|e| e.metadata().clone())
    }

    /// Metadata of every loaded plugin in load order
    pub fn all_metadata(&self) -> Vec<PluginMetadata> {
        self.lock().iter().map(|e| e.metadata().clone()).collect()
    }

    /// Loaded plugins that declare a dependency on `name`
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        Self::dependents_in(&self.lock(), name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn host_version(&self) -> &PluginVersion {
        &self.host_version
    }

    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("host_version", &self.host_version.to_string())
            .field("loaded", &self.loaded_plugins())
            .finish_non_exhaustive()
    }
}
