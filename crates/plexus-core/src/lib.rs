//! Core library of the Plexus plugin and module runtime.
//!
//! - [`plugin_system`]: discovery, validation and lifecycle of plugin archives
//! - [`module`]: toggleable modules with settings and subscription management
//! - [`event`]: the event subscription port
//! - [`notify`]: the user notification port
//! - [`kernel`]: configuration, host services and the [`Application`] driver
pub mod event;
pub mod kernel;
pub mod module;
pub mod notify;
pub mod plugin_system;

pub use event::{DefaultEventBus, Event, EventBus, EventResult, EventSubscriber, HostEvent};
pub use kernel::{Application, HostServices, RuntimeConfig};
pub use kernel::error::Error as KernelError;
pub use module::{Category, Module, ModuleBuilder, ModuleManager, Setting, SettingsRegistry};
pub use notify::{NotificationBridge, Notifier};
pub use plugin_system::{
    MetadataBuilder, Plugin, PluginContext, PluginError, PluginLoader, PluginManager, PluginMetadata,
    PluginResult,
};
