use std::collections::HashSet;
use std::fmt;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::metadata::PluginMetadata;
use crate::plugin_system::traits::Plugin;

/// A loaded plugin together with the loader that owns its archive.
///
/// `plugin` is declared first so it is dropped before `loader` closes the
/// archive its code lives in.
pub struct LoadedPlugin {
    pub plugin: Box<dyn Plugin>,
    pub loader: PluginLoader,
}

impl LoadedPlugin {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn metadata(&self) -> &PluginMetadata {
        self.plugin.metadata()
    }

    /// Drop the instance, then release the archive
    pub fn close(self) {
        let LoadedPlugin { plugin, mut loader } = self;
        drop(plugin);
        loader.close();
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name())
            .field("loader", &self.loader)
            .finish()
    }
}

/// The set of currently loaded plugins, unique by name, in load order
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loaded plugin. A duplicate name hands the entry back untouched
    /// so the caller can tear it down.
    pub fn insert(&mut self, entry: LoadedPlugin) -> Result<(), (LoadedPlugin, PluginSystemError)> {
        if self.contains(entry.name()) {
            let err = PluginSystemError::DuplicatePlugin {
                plugin: entry.name().to_string(),
            };
            return Err((entry, err));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<LoadedPlugin> {
        let index = self.entries.iter().position(|e| e.name() == name)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&LoadedPlugin> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Names in load order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn loaded_names(&self) -> HashSet<String> {
        self.entries.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry out, most recently loaded first
    pub fn drain(&mut self) -> Vec<LoadedPlugin> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries
    }
}
