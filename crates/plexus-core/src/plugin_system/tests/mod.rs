pub mod dependency_tests;
pub mod loader_tests;

use std::sync::{Arc, Mutex};

use crate::event::DefaultEventBus;
use crate::kernel::services::HostServices;
use crate::module::{Category, ModuleBuilder, ModuleManager, SettingsRegistry};
use crate::notify::NotificationBridge;
use crate::plugin_system::{
    MetadataBuilder, Plugin, PluginContext, PluginLoader, PluginManager, PluginMetadata, PluginResult,
    PluginVersion,
};

/// Shared, ordered record of lifecycle calls across plugins
pub(super) type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy, PartialEq)]
pub(super) enum Fault {
    None,
    FailOnLoad,
    PanicRegister,
    FailUnregister,
    PanicOnUnload,
    PanicOnDisable,
}

/// Configurable in-process plugin
pub(super) struct TestPlugin {
    metadata: PluginMetadata,
    modules: Vec<String>,
    fault: Fault,
    log: CallLog,
}

impl TestPlugin {
    pub fn new(metadata: PluginMetadata, log: CallLog) -> Self {
        Self {
            metadata,
            modules: Vec::new(),
            fault: Fault::None,
            log,
        }
    }

    pub fn with_module(mut self, name: &str) -> Self {
        self.modules.push(name.to_string());
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.metadata.name, call));
    }
}

impl Plugin for TestPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_load(&self) -> PluginResult {
        self.record("on_load");
        if self.fault == Fault::FailOnLoad {
            return Err("refusing to load".into());
        }
        Ok(())
    }

    fn register(&self, ctx: &PluginContext) -> PluginResult {
        self.record("register");
        for name in &self.modules {
            let module = ModuleBuilder::new(name, Category::Misc).build(ctx.services())?;
            if self.fault == Fault::PanicOnDisable {
                module.on_disable(|| panic!("on_disable exploded"));
            }
            ctx.register_module(module)?;
        }
        if self.fault == Fault::PanicRegister {
            panic!("register exploded");
        }
        Ok(())
    }

    fn unregister(&self, _ctx: &PluginContext) -> PluginResult {
        self.record("unregister");
        if self.fault == Fault::FailUnregister {
            return Err("cannot unregister".into());
        }
        Ok(())
    }

    fn on_unload(&self) -> PluginResult {
        self.record("on_unload");
        if self.fault == Fault::PanicOnUnload {
            panic!("on_unload exploded");
        }
        Ok(())
    }
}

pub(super) fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Plugin with a name, minimum host version and dependencies
pub(super) fn meta(name: &str, min_host: &str, deps: &[&str]) -> PluginMetadata {
    MetadataBuilder::new(name, "1.0.0")
        .author("Test Author")
        .min_host_version(min_host)
        .dependencies(deps)
        .build()
}

/// In-process loader for a [`TestPlugin`]
pub(super) fn loader_for<F>(label: &str, make: F) -> PluginLoader
where
    F: Fn() -> TestPlugin + Send + 'static,
{
    PluginLoader::from_static(label, move || Box::new(make()) as Box<dyn Plugin>)
}

pub(super) fn simple_loader(name: &str, deps: &[&str], log: &CallLog) -> PluginLoader {
    let metadata = meta(name, "0.0.0", deps);
    let log = log.clone();
    loader_for(name, move || TestPlugin::new(metadata.clone(), log.clone()))
}

pub(super) struct TestEnv {
    pub manager: PluginManager,
    pub modules: Arc<ModuleManager>,
    pub services: HostServices,
    pub bus: Arc<DefaultEventBus>,
}

pub(super) fn test_env(host_version: &str) -> TestEnv {
    let bus = Arc::new(DefaultEventBus::new());
    let services = HostServices::new(
        Arc::new(SettingsRegistry::new()),
        bus.clone(),
        Arc::new(NotificationBridge::new()),
    );
    let modules = Arc::new(ModuleManager::new());
    let version = PluginVersion::parse(host_version).unwrap();
    let manager = PluginManager::new(version, services.clone(), modules.clone());
    TestEnv {
        manager,
        modules,
        services,
        bus,
    }
}
