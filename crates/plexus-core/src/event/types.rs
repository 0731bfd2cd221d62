use std::any::Any;

use crate::event::Event;

/// Events emitted by the runtime itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Periodic engine tick
    Tick { tick: u64 },
    /// A plugin finished loading
    PluginLoaded { plugin: String },
    /// A plugin was unloaded
    PluginUnloaded { plugin: String },
    /// The host is shutting down
    Shutdown,
}

impl Event for HostEvent {
    fn name(&self) -> &'static str {
        match self {
            HostEvent::Tick { .. } => "host.tick",
            HostEvent::PluginLoaded { .. } => "plugin.loaded",
            HostEvent::PluginUnloaded { .. } => "plugin.unloaded",
            HostEvent::Shutdown => "host.shutdown",
        }
    }

    fn clone_event(&self) -> Box<dyn Event> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
