use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::kernel::error::panic_message;
use crate::module::{Module, ModuleError};

/// Run a module step that may call into listener code, logging a panic
/// instead of unwinding into the caller.
fn contained<F: FnOnce()>(module: &Module, step: &str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        log::warn!(
            "Module '{}' panicked during {}: {}",
            module.name(),
            step,
            panic_message(&*payload)
        );
    }
}

struct ModuleEntry {
    module: Arc<Module>,
    owner: Option<String>,
}

#[derive(Default)]
struct ModuleState {
    entries: Vec<ModuleEntry>,
    initialized: bool,
}

/// Registry of every module known to the host, whether registered by the
/// host itself or by a plugin.
#[derive(Default)]
pub struct ModuleManager {
    state: RwLock<ModuleState>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, optionally on behalf of a plugin.
    ///
    /// Names (and aliases) are matched case-insensitively. A rejected module
    /// loses the settings group it created at build time. Modules registered
    /// after [`post_init_all`](Self::post_init_all) are post-initialised
    /// right away.
    pub fn register(&self, module: Arc<Module>, owner: Option<&str>) -> Result<(), ModuleError> {
        let initialized = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let taken = state.entries.iter().any(|e| {
                e.module.matches(module.name()) || module.aliases().iter().any(|alias| e.module.matches(alias))
            });
            if taken {
                module.services().settings().remove_group(module.name());
                return Err(ModuleError::DuplicateModule(module.name().to_string()));
            }
            log::debug!(
                "Registering module '{}'{}",
                module.name(),
                owner.map(|o| format!(" for plugin '{o}'")).unwrap_or_default()
            );
            state.entries.push(ModuleEntry {
                module: module.clone(),
                owner: owner.map(str::to_string),
            });
            state.initialized
        };
        if initialized {
            contained(&module, "post_init", || module.post_init());
        }
        Ok(())
    }

    /// Remove a module without shutting it down
    pub fn unregister(&self, name: &str) -> Result<Arc<Module>, ModuleError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let index = state
            .entries
            .iter()
            .position(|e| e.module.name() == name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_string()))?;
        Ok(state.entries.remove(index).module)
    }

    /// Look a module up by name or alias
    pub fn get(&self, name_or_alias: &str) -> Option<Arc<Module>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .iter()
            .find(|e| e.module.matches(name_or_alias))
            .map(|e| e.module.clone())
    }

    /// All modules ordered by priority (highest first), then name
    pub fn modules(&self) -> Vec<Arc<Module>> {
        let mut modules: Vec<Arc<Module>> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.entries.iter().map(|e| e.module.clone()).collect()
        };
        modules.sort_by(|a, b| b.priority().cmp(&a.priority()).then_with(|| a.name().cmp(b.name())));
        modules
    }

    /// Modules registered by a plugin, in registration order
    pub fn owned_by(&self, plugin: &str) -> Vec<Arc<Module>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .iter()
            .filter(|e| e.owner.as_deref() == Some(plugin))
            .map(|e| e.module.clone())
            .collect()
    }

    /// Name of the plugin that registered a module, `None` for host modules
    pub fn owner_of(&self, name: &str) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .iter()
            .find(|e| e.module.name() == name)
            .and_then(|e| e.owner.clone())
    }

    /// Shut down and drop every module a plugin registered, discarding their
    /// settings. Returns the number released.
    pub fn release_owned_by(&self, plugin: &str) -> usize {
        let released: Vec<Arc<Module>> = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let (owned, kept): (Vec<ModuleEntry>, Vec<ModuleEntry>) = std::mem::take(&mut state.entries)
                .into_iter()
                .partition(|e| e.owner.as_deref() == Some(plugin));
            state.entries = kept;
            owned.into_iter().map(|e| e.module).collect()
        };

        for module in &released {
            contained(module, "shutdown", || module.shutdown());
            // A panicking listener cuts shutdown short of leaving the bus.
            module.services().events().unsubscribe(module.name());
            module.services().settings().remove_group(module.name());
            log::debug!("Released module '{}' of plugin '{}'", module.name(), plugin);
        }
        released.len()
    }

    /// Post-initialise every registered module, in registration order
    pub fn post_init_all(&self) {
        let modules: Vec<Arc<Module>> = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.initialized = true;
            state.entries.iter().map(|e| e.module.clone()).collect()
        };
        for module in modules {
            contained(&module, "post_init", || module.post_init());
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).initialized
    }

    pub fn enabled_modules(&self) -> Vec<Arc<Module>> {
        self.modules().into_iter().filter(|m| m.is_enabled()).collect()
    }

    /// Modules shown in the on-screen list: enabled, visible and listed
    pub fn array_list(&self) -> Vec<Arc<Module>> {
        self.modules()
            .into_iter()
            .filter(|m| m.is_enabled() && m.is_visible() && m.show_on_array())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.modules().iter().map(|m| m.name().to_string()).collect();
        f.debug_struct("ModuleManager")
            .field("modules", &names)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
