use std::sync::Arc;

use crate::event::{DefaultEventBus, EventBus};
use crate::kernel::services::HostServices;
use crate::module::{Category, ModuleBuilder, SettingsRegistry};
use crate::notify::{
    NotificationBridge, NotificationMessage, NotificationProvider, Notifier, RecordingProvider,
};

struct FailingProvider;

impl NotificationProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn deliver(&mut self, _message: &NotificationMessage) -> Result<(), String> {
        Err("display unavailable".to_string())
    }
}

struct PanickingProvider;

impl NotificationProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    fn deliver(&mut self, _message: &NotificationMessage) -> Result<(), String> {
        panic!("display driver crashed")
    }
}

#[test]
fn test_bridge_fans_out_to_providers() {
    let bridge = NotificationBridge::new();
    let first = RecordingProvider::new();
    let second = RecordingProvider::new();
    let (h1, h2) = (first.handle(), second.handle());
    bridge.add_provider(Box::new(first));
    bridge.add_provider(Box::new(second));

    bridge.notify("Speed enabled");

    assert_eq!(*h1.lock().unwrap(), vec!["Speed enabled"]);
    assert_eq!(*h2.lock().unwrap(), vec!["Speed enabled"]);
    assert_eq!(bridge.provider_names(), vec!["recording", "recording"]);
}

#[test]
fn test_failing_provider_is_swallowed() {
    let bridge = NotificationBridge::new();
    let recorder = RecordingProvider::new();
    let handle = recorder.handle();
    bridge.add_provider(Box::new(FailingProvider));
    bridge.add_provider(Box::new(recorder));

    bridge.notify("still delivered");

    assert_eq!(*handle.lock().unwrap(), vec!["still delivered"]);
}

#[test]
fn test_panicking_provider_is_contained() {
    let bridge = NotificationBridge::new();
    let recorder = RecordingProvider::new();
    let handle = recorder.handle();
    bridge.add_provider(Box::new(PanickingProvider));
    bridge.add_provider(Box::new(recorder));

    bridge.notify("first");
    bridge.notify("second");

    assert_eq!(*handle.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(bridge.recent().len(), 2);
}

#[test]
fn test_panicking_provider_does_not_block_toggle() {
    let bus = Arc::new(DefaultEventBus::new());
    let bridge = NotificationBridge::new();
    bridge.add_provider(Box::new(PanickingProvider));
    let services = HostServices::new(Arc::new(SettingsRegistry::new()), bus.clone(), Arc::new(bridge));
    let module = ModuleBuilder::new("Speed", Category::Movement).build(&services).unwrap();
    module.post_init();

    module.enable();
    assert!(module.is_enabled());
    assert!(bus.is_subscribed("Speed"));

    module.disable();
    assert!(module.is_disabled());
    assert!(!bus.is_subscribed("Speed"));
}

#[test]
fn test_disabled_bridge_drops_notifications() {
    let bridge = NotificationBridge::new();
    let recorder = RecordingProvider::new();
    let handle = recorder.handle();
    bridge.add_provider(Box::new(recorder));

    bridge.set_enabled(false);
    bridge.notify("muted");
    assert!(handle.lock().unwrap().is_empty());
    assert!(bridge.recent().is_empty());

    bridge.set_enabled(true);
    bridge.notify("audible");
    assert_eq!(*handle.lock().unwrap(), vec!["audible"]);
}

#[test]
fn test_history_is_bounded() {
    let bridge = NotificationBridge::new();
    for i in 0..100 {
        bridge.notify(&format!("message {i}"));
    }
    let recent = bridge.recent();
    assert_eq!(recent.len(), 64);
    assert_eq!(recent.first().map(|m| m.text.as_str()), Some("message 36"));
    assert_eq!(recent.last().map(|m| m.text.as_str()), Some("message 99"));
}
