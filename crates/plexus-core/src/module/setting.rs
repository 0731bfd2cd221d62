//! Typed, observable settings and the registry that groups them per owner.
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors raised by settings and the settings registry
#[derive(Debug, thiserror::Error)]
pub enum SettingError {
    #[error("Setting '{setting}' already exists in group '{group}'")]
    DuplicateSetting { group: String, setting: String },

    #[error("Failed to serialize setting '{setting}': {message}")]
    Serialize { setting: String, message: String },

    #[error("Value for setting '{setting}' has the wrong type: {message}")]
    TypeMismatch { setting: String, message: String },
}

/// Bound shared by every setting value type
pub trait SettingValue:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> SettingValue for T where
    T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

type Consumer<T> = Arc<dyn Fn(&T, T) -> T + Send + Sync>;
type Listener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;
type Visibility = Box<dyn Fn() -> bool + Send + Sync>;

/// A named value with an ordered transform pipeline (consumers) and an
/// ordered observation pipeline (listeners).
///
/// On every write the consumers run in registration order, each receiving the
/// previous value and the value produced so far; the last result is committed.
/// Listeners then observe `(previous, committed)`, but only when the committed
/// value actually differs from the previous one. Writing the current value is
/// a no-op.
///
/// No lock is held while callbacks run, so a callback may write to the setting
/// it observes.
pub struct Setting<T: SettingValue> {
    name: String,
    default: T,
    value: Mutex<T>,
    visibility: Visibility,
    consumers: RwLock<Vec<Consumer<T>>>,
    listeners: RwLock<Vec<Listener<T>>>,
}

impl<T: SettingValue> Setting<T> {
    /// A visible setting starting at its default
    pub fn new(name: &str, default: T) -> Self {
        Self::with_visibility(name, default, || true)
    }

    pub fn with_visibility<F>(name: &str, default: T, visibility: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            value: Mutex::new(default.clone()),
            default,
            visibility: Box::new(visibility),
            consumers: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value
    pub fn value(&self) -> T {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Write a value through the consumer pipeline
    pub fn set(&self, requested: T) {
        let prev = self.value();
        if prev == requested {
            return;
        }

        let consumers: Vec<Consumer<T>> = self
            .consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let committed = consumers
            .iter()
            .fold(requested, |value, consumer| consumer(&prev, value));

        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = committed.clone();

        if committed == prev {
            return;
        }
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(&prev, &committed);
        }
    }

    /// Restore the construction-time default (through the pipeline)
    pub fn reset(&self) {
        self.set(self.default.clone());
    }

    pub fn is_default(&self) -> bool {
        self.value() == self.default
    }

    pub fn is_visible(&self) -> bool {
        (self.visibility)()
    }

    /// Append a transform `(previous, requested) -> committed`
    pub fn add_consumer<F>(&self, consumer: F)
    where
        F: Fn(&T, T) -> T + Send + Sync + 'static,
    {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(consumer));
    }

    /// Append an observer `(previous, committed)`
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }
}

impl<T: SettingValue> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("name", &self.name)
            .field("value", &self.value())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a [`Setting`], as stored in the registry
pub trait AnySetting: Send + Sync {
    fn name(&self) -> &str;

    fn reset(&self);

    fn is_default(&self) -> bool;

    fn is_visible(&self) -> bool;

    fn to_json(&self) -> Result<serde_json::Value, SettingError>;

    /// Set the value from a JSON snapshot
    fn load_json(&self, value: &serde_json::Value) -> Result<(), SettingError>;

    fn as_any(&self) -> &dyn Any;
}

impl<T: SettingValue> AnySetting for Setting<T> {
    fn name(&self) -> &str {
        Setting::name(self)
    }

    fn reset(&self) {
        Setting::reset(self)
    }

    fn is_default(&self) -> bool {
        Setting::is_default(self)
    }

    fn is_visible(&self) -> bool {
        Setting::is_visible(self)
    }

    fn to_json(&self) -> Result<serde_json::Value, SettingError> {
        serde_json::to_value(self.value()).map_err(|e| SettingError::Serialize {
            setting: self.name.clone(),
            message: e.to_string(),
        })
    }

    fn load_json(&self, value: &serde_json::Value) -> Result<(), SettingError> {
        let parsed: T = serde_json::from_value(value.clone()).map_err(|e| SettingError::TypeMismatch {
            setting: self.name.clone(),
            message: e.to_string(),
        })?;
        self.set(parsed);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An ordered, named collection of settings
pub struct SettingGroup {
    name: String,
    settings: RwLock<Vec<Arc<dyn AnySetting>>>,
}

impl SettingGroup {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            settings: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings in registration order
    pub fn settings(&self) -> Vec<Arc<dyn AnySetting>> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AnySetting>> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    fn push(&self, setting: Arc<dyn AnySetting>) -> Result<(), SettingError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if settings.iter().any(|s| s.name() == setting.name()) {
            return Err(SettingError::DuplicateSetting {
                group: self.name.clone(),
                setting: setting.name().to_string(),
            });
        }
        settings.push(setting);
        Ok(())
    }
}

impl fmt::Debug for SettingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.settings().iter().map(|s| s.name().to_string()).collect();
        f.debug_struct("SettingGroup")
            .field("name", &self.name)
            .field("settings", &names)
            .finish()
    }
}

/// Registry of setting groups, one group per owner (usually a module)
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    groups: RwLock<Vec<Arc<SettingGroup>>>,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_group(&self, name: &str) -> Arc<SettingGroup> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(group) = groups.iter().find(|g| g.name() == name) {
            return group.clone();
        }
        let group = Arc::new(SettingGroup::new(name));
        groups.push(group.clone());
        group
    }

    /// Add a setting to a group, creating the group if needed.
    /// Names are unique within a group.
    pub fn add_setting(&self, group: &str, setting: Arc<dyn AnySetting>) -> Result<(), SettingError> {
        self.get_or_create_group(group).push(setting)
    }

    /// Settings of one owner in registration order; empty for unknown owners
    pub fn list_settings(&self, owner: &str) -> Vec<Arc<dyn AnySetting>> {
        self.group(owner).map(|g| g.settings()).unwrap_or_default()
    }

    pub fn group(&self, name: &str) -> Option<Arc<SettingGroup>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|g| g.name() == name)
            .cloned()
    }

    /// Discard a group and its settings. Returns whether it existed.
    pub fn remove_group(&self, name: &str) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let before = groups.len();
        groups.retain(|g| g.name() != name);
        groups.len() < before
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|g| g.name().to_string())
            .collect()
    }
}
