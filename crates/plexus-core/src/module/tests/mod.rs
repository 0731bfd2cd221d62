mod setting_tests;

use std::sync::{Arc, Mutex};

use crate::event::DefaultEventBus;
use crate::kernel::services::HostServices;
use crate::module::SettingsRegistry;
use crate::notify::{NotificationBridge, RecordingProvider};

/// Host services backed by an inspectable bus and a recording notifier
pub(super) struct TestHost {
    pub services: HostServices,
    pub bus: Arc<DefaultEventBus>,
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl TestHost {
    pub fn new() -> Self {
        let bus = Arc::new(DefaultEventBus::new());
        let recorder = RecordingProvider::new();
        let messages = recorder.handle();
        let bridge = NotificationBridge::new();
        bridge.add_provider(Box::new(recorder));
        let services = HostServices::new(Arc::new(SettingsRegistry::new()), bus.clone(), Arc::new(bridge));
        Self { services, bus, messages }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}
