use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::{DefaultEventBus, EventBus};
use crate::module::setting::SettingsRegistry;
use crate::notify::{ConsoleProvider, NotificationBridge, Notifier};

/// The collaborators every module and plugin talks to.
///
/// Cheap to clone; all fields are shared handles.
#[derive(Clone)]
pub struct HostServices {
    settings: Arc<SettingsRegistry>,
    events: Arc<dyn EventBus>,
    notifier: Arc<dyn Notifier>,
    toggle_messages: Arc<AtomicBool>,
}

impl HostServices {
    pub fn new(
        settings: Arc<SettingsRegistry>,
        events: Arc<dyn EventBus>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            events,
            notifier,
            toggle_messages: Arc::new(AtomicBool::new(true)),
        }
    }

    /// In-process event bus and a console notification bridge
    pub fn with_defaults() -> Self {
        let bridge = NotificationBridge::new();
        bridge.add_provider(Box::new(ConsoleProvider::new()));
        Self::new(
            Arc::new(SettingsRegistry::new()),
            Arc::new(DefaultEventBus::new()),
            Arc::new(bridge),
        )
    }

    pub fn settings(&self) -> &Arc<SettingsRegistry> {
        &self.settings
    }

    pub fn events(&self) -> &Arc<dyn EventBus> {
        &self.events
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Whether module toggles emit a notification
    pub fn toggle_messages(&self) -> bool {
        self.toggle_messages.load(Ordering::Relaxed)
    }

    pub fn set_toggle_messages(&self, enabled: bool) {
        self.toggle_messages.store(enabled, Ordering::Relaxed);
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("toggle_messages", &self.toggle_messages())
            .finish_non_exhaustive()
    }
}
