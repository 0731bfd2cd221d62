//! Example plugin: registers a `Greeter` module that greets every few ticks.
use plexus_core::event::{EventResult, HostEvent};
use plexus_core::module::{Category, ModuleBuilder};
use plexus_core::plugin_system::{MetadataBuilder, Plugin, PluginContext, PluginMetadata, PluginResult};

pub struct HelloModulePlugin {
    metadata: PluginMetadata,
}

impl HelloModulePlugin {
    pub fn new() -> Self {
        Self {
            metadata: MetadataBuilder::new("HelloModule", env!("CARGO_PKG_VERSION"))
                .description("Greets the user on a fixed tick interval")
                .author("Plexus Developers")
                .min_host_version("0.1.0")
                .build(),
        }
    }
}

impl Default for HelloModulePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for HelloModulePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_load(&self) -> PluginResult {
        log::info!("HelloModule loaded");
        Ok(())
    }

    fn register(&self, ctx: &PluginContext) -> PluginResult {
        let module = ModuleBuilder::new("Greeter", Category::Misc)
            .alias("hello")
            .description("Sends a greeting every few ticks")
            .enabled_by_default(true)
            .build(ctx.services())?;

        let greeting = module.add_setting("Greeting", "Hello".to_string())?;
        let interval = module.add_setting("Interval", 20u64)?;
        // Zero would never fire
        interval.add_consumer(|prev, value| if value == 0 { *prev } else { value });

        let hud_interval = interval.clone();
        module.set_hud_info(move || format!("every {}", hud_interval.value()));

        module.on_event(move |module, event| {
            if let Some(HostEvent::Tick { tick }) = event.as_any().downcast_ref::<HostEvent>() {
                if tick % interval.value() == 0 {
                    module
                        .services()
                        .notifier()
                        .notify(&format!("{} from tick {}", greeting.value(), tick));
                }
            }
            EventResult::Continue
        });

        ctx.register_module(module)?;
        Ok(())
    }

    fn on_unload(&self) -> PluginResult {
        log::info!("HelloModule unloaded");
        Ok(())
    }
}

plexus_core::declare_plugin!(HelloModulePlugin, HelloModulePlugin::new);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plexus_core::event::{DefaultEventBus, EventBus, HostEvent};
    use plexus_core::kernel::HostServices;
    use plexus_core::module::{ModuleManager, SettingsRegistry};
    use plexus_core::notify::{NotificationBridge, RecordingProvider};
    use plexus_core::plugin_system::{Plugin, PluginLoader, PluginManager, PluginVersion};

    use super::HelloModulePlugin;

    #[test]
    fn test_greeter_greets_on_interval() {
        let recorder = RecordingProvider::new();
        let messages = recorder.handle();
        let bridge = NotificationBridge::new();
        bridge.add_provider(Box::new(recorder));
        let bus = Arc::new(DefaultEventBus::new());
        let services = HostServices::new(Arc::new(SettingsRegistry::new()), bus.clone(), Arc::new(bridge));
        services.set_toggle_messages(false);
        let modules = Arc::new(ModuleManager::new());
        let manager = PluginManager::new(PluginVersion::parse("0.1.0").unwrap(), services, modules.clone());

        let loader = PluginLoader::from_static("hello", || Box::new(HelloModulePlugin::new()) as Box<dyn Plugin>);
        assert_eq!(manager.load_all(vec![loader]), 1);
        modules.post_init_all();

        let greeter = modules.get("hello").unwrap();
        assert!(greeter.is_enabled());
        assert_eq!(greeter.hud_info(), "every 20");

        for tick in 1..=40 {
            bus.post(&HostEvent::Tick { tick });
        }
        assert_eq!(
            *messages.lock().unwrap(),
            vec!["Hello from tick 20", "Hello from tick 40"]
        );

        assert_eq!(manager.unload_all(), 1);
        assert!(!bus.is_subscribed("Greeter"));
    }
}
