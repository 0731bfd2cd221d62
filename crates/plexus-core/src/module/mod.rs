//! # Plexus Module System
//!
//! A [`Module`] is a toggleable unit of behaviour with its own settings. Its
//! enabled state is an ordinary [`Setting<bool>`] whose first consumer
//! enforces the module policy:
//!
//! - `committed = always_enabled || requested`
//! - a toggle notification is sent when `previous != requested`, unless the
//!   module is always enabled or toggle messages are switched off
//! - the module is subscribed to the event bus while
//!   `committed || always_listening`, unsubscribed otherwise
//!
//! None of the state transitions can fail; disabling an always-enabled module
//! is a silent no-op.
pub mod manager;
pub mod setting;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventResult, EventSubscriber};
use crate::kernel::config::ConfigData;
use crate::kernel::services::HostServices;

pub use manager::ModuleManager;
pub use setting::{AnySetting, Setting, SettingError, SettingValue, SettingsRegistry};

/// Names of the settings every module creates for itself
pub const BIND_SETTING: &str = "Bind";
pub const ENABLED_SETTING: &str = "Enabled";
pub const VISIBLE_SETTING: &str = "Visible";
pub const DEFAULT_SETTING: &str = "Default";

const RESERVED_SETTINGS: [&str; 4] = [BIND_SETTING, ENABLED_SETTING, VISIBLE_SETTING, DEFAULT_SETTING];

/// Errors raised by module registration
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Module '{0}' is already registered")]
    DuplicateModule(String),

    #[error("Module '{0}' is not registered")]
    UnknownModule(String),

    #[error(transparent)]
    Setting(#[from] SettingError),
}

/// Grouping used by listings and the settings UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Client,
    Combat,
    Misc,
    Movement,
    Player,
    Render,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Client => "Client",
            Category::Combat => "Combat",
            Category::Misc => "Misc",
            Category::Movement => "Movement",
            Category::Player => "Player",
            Category::Render => "Render",
        };
        f.write_str(name)
    }
}

/// Key binding of a module; the key code space is defined by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bind(pub Option<i32>);

impl Bind {
    pub const NONE: Bind = Bind(None);

    pub fn key(code: i32) -> Self {
        Bind(Some(code))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{code}"),
            None => f.write_str("None"),
        }
    }
}

type EventHandler = Arc<dyn Fn(&Module, &dyn Event) -> EventResult + Send + Sync>;
type HudInfo = Arc<dyn Fn() -> String + Send + Sync>;

/// Builder for [`Module`]
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    name: String,
    aliases: Vec<String>,
    category: Category,
    description: String,
    priority: i32,
    always_listening: bool,
    show_on_array: bool,
    always_enabled: bool,
    enabled_by_default: bool,
}

impl ModuleBuilder {
    pub fn new(name: &str, category: Category) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            category,
            description: String::new(),
            priority: -1,
            always_listening: false,
            show_on_array: true,
            always_enabled: false,
            enabled_by_default: false,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn always_listening(mut self, value: bool) -> Self {
        self.always_listening = value;
        self
    }

    pub fn show_on_array(mut self, value: bool) -> Self {
        self.show_on_array = value;
        self
    }

    pub fn always_enabled(mut self, value: bool) -> Self {
        self.always_enabled = value;
        self
    }

    pub fn enabled_by_default(mut self, value: bool) -> Self {
        self.enabled_by_default = value;
        self
    }

    /// Construct the module and register its reserved settings under a
    /// settings group named after it.
    pub fn build(self, services: &HostServices) -> Result<Arc<Module>, ModuleError> {
        let module = Arc::new_cyclic(|weak: &Weak<Module>| Module::new(self, services.clone(), weak.clone()));
        let registry = module.services.settings();
        registry.add_setting(&module.name, module.bind.clone())?;
        registry.add_setting(&module.name, module.enabled.clone())?;
        registry.add_setting(&module.name, module.visible.clone())?;
        registry.add_setting(&module.name, module.reset_trigger.clone())?;
        Ok(module)
    }
}

/// A toggleable unit of behaviour. See the [module docs](self).
pub struct Module {
    name: String,
    aliases: Vec<String>,
    category: Category,
    description: String,
    priority: i32,
    always_listening: bool,
    show_on_array: bool,
    always_enabled: bool,
    enabled_by_default: bool,

    services: HostServices,
    this: Weak<Module>,

    bind: Arc<Setting<Bind>>,
    enabled: Arc<Setting<bool>>,
    visible: Arc<Setting<bool>>,
    reset_trigger: Arc<Setting<bool>>,

    event_handler: RwLock<Option<EventHandler>>,
    hud_info: RwLock<Option<HudInfo>>,
}

impl Module {
    fn new(builder: ModuleBuilder, services: HostServices, this: Weak<Module>) -> Self {
        let always_enabled = builder.always_enabled;

        let bind = Arc::new(Setting::with_visibility(BIND_SETTING, Bind::NONE, move || !always_enabled));
        // Starts at `always_enabled` so the flag is never observably false.
        let enabled = Arc::new(Setting::with_visibility(ENABLED_SETTING, always_enabled, || false));
        let visible = Arc::new(Setting::new(VISIBLE_SETTING, builder.show_on_array));
        let weak = this.clone();
        let reset_trigger = Arc::new(Setting::with_visibility(DEFAULT_SETTING, false, move || {
            weak.upgrade().is_some_and(|m| !m.setting_list().is_empty())
        }));

        let weak = this.clone();
        enabled.add_consumer(move |prev, requested| match weak.upgrade() {
            Some(module) => module.commit_enabled(*prev, requested),
            None => requested,
        });

        let weak = this.clone();
        reset_trigger.add_listener(move |_, committed| {
            if !*committed {
                return;
            }
            if let Some(module) = weak.upgrade() {
                for setting in module.setting_list() {
                    setting.reset();
                }
                module.reset_trigger.set(false);
                module
                    .services
                    .notifier()
                    .notify(&format!("{} Set to defaults!", module.chat_name()));
            }
        });

        Self {
            name: builder.name,
            aliases: builder.aliases,
            category: builder.category,
            description: builder.description,
            priority: builder.priority,
            always_listening: builder.always_listening,
            show_on_array: builder.show_on_array,
            always_enabled,
            enabled_by_default: builder.enabled_by_default,
            services,
            this,
            bind,
            enabled,
            visible,
            reset_trigger,
            event_handler: RwLock::new(None),
            hud_info: RwLock::new(None),
        }
    }

    /// The built-in consumer of the enabled setting
    fn commit_enabled(&self, prev: bool, requested: bool) -> bool {
        let committed = self.always_enabled || requested;
        if prev != requested && !self.always_enabled && self.services.toggle_messages() {
            let state = if committed { "enabled" } else { "disabled" };
            self.services.notifier().notify(&format!("{} {}", self.name, state));
        }
        self.sync_subscription(committed);
        committed
    }

    fn sync_subscription(&self, enabled: bool) {
        let events = self.services.events();
        if enabled || self.always_listening {
            if let Some(this) = self.this.upgrade() {
                events.subscribe(this);
            }
        } else {
            events.unsubscribe(&self.name);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Case-insensitive match against the name and every alias
    pub fn matches(&self, name_or_alias: &str) -> bool {
        self.name.eq_ignore_ascii_case(name_or_alias)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name_or_alias))
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn always_listening(&self) -> bool {
        self.always_listening
    }

    pub fn show_on_array(&self) -> bool {
        self.show_on_array
    }

    pub fn always_enabled(&self) -> bool {
        self.always_enabled
    }

    pub fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// `[Name]`, used as a prefix in notifications
    pub fn chat_name(&self) -> String {
        format!("[{}]", self.name)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.value()
    }

    pub fn is_disabled(&self) -> bool {
        !self.is_enabled()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.value()
    }

    /// Enabled or always listening
    pub fn is_active(&self) -> bool {
        self.is_enabled() || self.always_listening
    }

    pub fn bind(&self) -> Bind {
        self.bind.value()
    }

    pub fn set_bind(&self, bind: Bind) {
        self.bind.set(bind);
    }

    pub fn toggle(&self) {
        self.enabled.set(!self.is_enabled());
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    /// Apply the default-enabled policy and the initial subscription
    pub fn post_init(&self) {
        self.enabled.set(self.enabled_by_default || self.always_enabled);
        self.sync_subscription(self.is_enabled());
    }

    /// Restore every user-facing setting to its default
    pub fn reset_to_defaults(&self) {
        self.reset_trigger.set(true);
    }

    /// Teardown used when the owning plugin is unloaded: disable (still
    /// subject to `always_enabled`) and leave the event bus regardless.
    pub fn shutdown(&self) {
        self.disable();
        self.services.events().unsubscribe(&self.name);
    }

    /// Run `action` whenever the module becomes enabled
    pub fn on_enable<F>(&self, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.enabled.add_listener(move |_, committed| {
            if *committed {
                action();
            }
        });
    }

    /// Run `action` whenever the module becomes disabled
    pub fn on_disable<F>(&self, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.enabled.add_listener(move |_, committed| {
            if !*committed {
                action();
            }
        });
    }

    /// Run `action` with the committed state on every change
    pub fn on_toggle<F>(&self, action: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.enabled.add_listener(move |_, committed| action(*committed));
    }

    /// Behaviour invoked for every event delivered while subscribed
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&Module, &dyn Event) -> EventResult + Send + Sync + 'static,
    {
        *self.event_handler.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Short status text shown next to the module name in listings
    pub fn set_hud_info<F>(&self, provider: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        *self.hud_info.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(provider));
    }

    pub fn hud_info(&self) -> String {
        let provider = self.hud_info.read().unwrap_or_else(PoisonError::into_inner).clone();
        provider.map(|p| p()).unwrap_or_default()
    }

    /// Add a user-facing setting to this module
    pub fn add_setting<T: SettingValue>(&self, name: &str, default: T) -> Result<Arc<Setting<T>>, ModuleError> {
        self.register_setting(Setting::new(name, default))
    }

    pub fn add_setting_with_visibility<T, F>(
        &self,
        name: &str,
        default: T,
        visibility: F,
    ) -> Result<Arc<Setting<T>>, ModuleError>
    where
        T: SettingValue,
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.register_setting(Setting::with_visibility(name, default, visibility))
    }

    fn register_setting<T: SettingValue>(&self, setting: Setting<T>) -> Result<Arc<Setting<T>>, ModuleError> {
        let setting = Arc::new(setting);
        self.services.settings().add_setting(&self.name, setting.clone())?;
        Ok(setting)
    }

    /// User-facing settings, reserved ones excluded
    pub fn setting_list(&self) -> Vec<Arc<dyn AnySetting>> {
        self.full_setting_list()
            .into_iter()
            .filter(|s| !RESERVED_SETTINGS.contains(&s.name()))
            .collect()
    }

    /// Every setting of this module in registration order
    pub fn full_setting_list(&self) -> Vec<Arc<dyn AnySetting>> {
        self.services.settings().list_settings(&self.name)
    }

    /// Snapshot of every setting except the reset trigger
    pub fn export_settings(&self) -> ConfigData {
        let mut data = ConfigData::new();
        for setting in self.full_setting_list() {
            if setting.name() == DEFAULT_SETTING {
                continue;
            }
            match setting.to_json() {
                Ok(value) => data.set_raw(setting.name(), value),
                Err(e) => log::warn!("Skipping setting of module '{}': {}", self.name, e),
            }
        }
        data
    }

    /// Apply a snapshot produced by [`export_settings`](Self::export_settings).
    /// Unknown keys are ignored and values of the wrong type are logged and
    /// skipped. Returns the number of settings applied.
    pub fn import_settings(&self, data: &ConfigData) -> usize {
        let mut applied = 0;
        for setting in self.full_setting_list() {
            if setting.name() == DEFAULT_SETTING {
                continue;
            }
            let Some(value) = data.get_raw(setting.name()) else { continue };
            match setting.load_json(value) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Module '{}': {}", self.name, e),
            }
        }
        applied
    }
}

impl EventSubscriber for Module {
    fn subscriber_name(&self) -> &str {
        &self.name
    }

    fn subscriber_priority(&self) -> i32 {
        self.priority
    }

    fn handle_event(&self, event: &dyn Event) -> EventResult {
        let handler = self.event_handler.read().unwrap_or_else(PoisonError::into_inner).clone();
        match handler {
            Some(handler) => handler(self, event),
            None => EventResult::Continue,
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .field("always_enabled", &self.always_enabled)
            .field("always_listening", &self.always_listening)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
