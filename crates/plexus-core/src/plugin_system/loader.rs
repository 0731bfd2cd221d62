use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::kernel::constants::{PLUGIN_ABI_SYMBOL, PLUGIN_ABI_VERSION, PLUGIN_ENTRY_SYMBOL, archive_extension};
use crate::kernel::error::panic_message;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;

/// Signature of the entry point exported by [`declare_plugin!`](crate::declare_plugin)
#[allow(improper_ctypes_definitions)]
type PluginCreateFn = unsafe extern "C-unwind" fn() -> *mut Box<dyn Plugin>;

/// Whether a path looks like a plugin archive for this platform
/// (case-insensitive extension match)
pub fn is_plugin_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(archive_extension()))
}

/// A source of plugin instances backing one [`PluginLoader`]
pub trait PluginArchive: Send {
    /// Check the archive carries a plugin entry point without calling it
    fn resolve(&mut self, path: &Path) -> Result<(), PluginSystemError>;

    /// Construct the plugin
    fn instantiate(&mut self, path: &Path) -> Result<Box<dyn Plugin>, PluginSystemError>;

    /// Release the underlying resource. Plugin instances created by this
    /// archive must already be dropped.
    fn close(&mut self);
}

/// A `cdylib` archive opened with `libloading`
#[derive(Default)]
pub struct DynamicLibraryArchive {
    library: Option<Library>,
}

impl DynamicLibraryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, path: &Path) -> Result<&Library, PluginSystemError> {
        if self.library.is_none() {
            let library = unsafe { Library::new(path) }.map_err(|e| PluginSystemError::LoadFailure {
                path: path.to_path_buf(),
                message: format!("libloading error: {e}"),
            })?;
            self.library = Some(library);
        }
        self.library.as_ref().ok_or_else(|| PluginSystemError::LoadFailure {
            path: path.to_path_buf(),
            message: "library handle unavailable".to_string(),
        })
    }
}

impl PluginArchive for DynamicLibraryArchive {
    fn resolve(&mut self, path: &Path) -> Result<(), PluginSystemError> {
        let library = self.open(path)?;

        let abi: Symbol<*const u32> = unsafe { library.get(PLUGIN_ABI_SYMBOL) }.map_err(|e| {
            PluginSystemError::NotAPlugin {
                path: path.to_path_buf(),
                reason: format!("missing ABI marker: {e}"),
            }
        })?;
        let abi_version = unsafe { **abi };

        let _entry: Symbol<PluginCreateFn> = unsafe { library.get(PLUGIN_ENTRY_SYMBOL) }.map_err(|e| {
            PluginSystemError::NotAPlugin {
                path: path.to_path_buf(),
                reason: format!("missing entry point: {e}"),
            }
        })?;

        if abi_version != PLUGIN_ABI_VERSION {
            return Err(PluginSystemError::LoadFailure {
                path: path.to_path_buf(),
                message: format!("plugin ABI version {abi_version} does not match host ABI version {PLUGIN_ABI_VERSION}"),
            });
        }
        Ok(())
    }

    fn instantiate(&mut self, path: &Path) -> Result<Box<dyn Plugin>, PluginSystemError> {
        let library = self.open(path)?;
        let entry: Symbol<PluginCreateFn> = unsafe { library.get(PLUGIN_ENTRY_SYMBOL) }.map_err(|e| {
            PluginSystemError::NotAPlugin {
                path: path.to_path_buf(),
                reason: format!("missing entry point: {e}"),
            }
        })?;
        let create: PluginCreateFn = *entry;

        let raw = panic::catch_unwind(|| unsafe { create() }).map_err(|e| PluginSystemError::LoadFailure {
            path: path.to_path_buf(),
            message: format!("entry point panicked: {}", panic_message(&*e)),
        })?;
        if raw.is_null() {
            return Err(PluginSystemError::LoadFailure {
                path: path.to_path_buf(),
                message: "entry point returned a null plugin".to_string(),
            });
        }
        // Produced by Box::into_raw in the archive's entry point.
        let plugin = unsafe { Box::from_raw(raw) };
        Ok(*plugin)
    }

    fn close(&mut self) {
        self.library = None;
    }
}

type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send>;

/// An in-process "archive": a factory closure. Used for plugins compiled into
/// the host and in tests.
pub struct StaticArchive {
    factory: PluginFactory,
}

impl StaticArchive {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }
}

impl PluginArchive for StaticArchive {
    fn resolve(&mut self, _path: &Path) -> Result<(), PluginSystemError> {
        Ok(())
    }

    fn instantiate(&mut self, path: &Path) -> Result<Box<dyn Plugin>, PluginSystemError> {
        let factory = &self.factory;
        panic::catch_unwind(AssertUnwindSafe(|| factory())).map_err(|e| PluginSystemError::LoadFailure {
            path: path.to_path_buf(),
            message: format!("plugin constructor panicked: {}", panic_message(&*e)),
        })
    }

    fn close(&mut self) {}
}

/// Resolves one archive into a plugin instance and owns the archive for as
/// long as that plugin is loaded.
///
/// The resource is released exactly once: on [`close`](Self::close) or, at
/// the latest, when the loader is dropped.
pub struct PluginLoader {
    path: PathBuf,
    archive: Box<dyn PluginArchive>,
    verified: bool,
    closed: bool,
}

impl PluginLoader {
    /// Loader for a dynamic library on disk. Nothing is opened until
    /// [`verify`](Self::verify) or [`load`](Self::load).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_archive(path, Box::new(DynamicLibraryArchive::new()))
    }

    /// Loader for an in-process plugin; `label` stands in for the path in logs
    pub fn from_static<F>(label: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + 'static,
    {
        Self::with_archive(label, Box::new(StaticArchive::new(factory)))
    }

    pub fn with_archive(path: impl Into<PathBuf>, archive: Box<dyn PluginArchive>) -> Self {
        Self {
            path: path.into(),
            archive,
            verified: false,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Cheap check that the archive holds a plugin. Does not run plugin code.
    pub fn verify(&mut self) -> Result<(), PluginSystemError> {
        self.ensure_open()?;
        self.archive.resolve(&self.path)?;
        self.verified = true;
        Ok(())
    }

    /// Instantiate the plugin. The instance must be dropped before this
    /// loader is closed.
    pub fn load(&mut self) -> Result<Box<dyn Plugin>, PluginSystemError> {
        self.ensure_open()?;
        self.archive.instantiate(&self.path)
    }

    /// Release the archive. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.archive.close();
        self.closed = true;
        log::debug!("Closed plugin archive '{}'", self.path.display());
    }

    fn ensure_open(&self) -> Result<(), PluginSystemError> {
        if self.closed {
            return Err(PluginSystemError::LoadFailure {
                path: self.path.clone(),
                message: "loader is closed".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for PluginLoader {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("path", &self.path)
            .field("verified", &self.verified)
            .field("closed", &self.closed)
            .finish()
    }
}
