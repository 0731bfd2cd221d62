#![cfg(test)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{TestPlugin, call_log, meta};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::{PluginArchive, PluginLoader, is_plugin_archive};
use crate::plugin_system::traits::Plugin;

#[test]
fn test_is_plugin_archive_case_insensitive() {
    let ext = crate::kernel::constants::archive_extension();
    assert!(is_plugin_archive(Path::new(&format!("plugins/libfoo.{}", ext))));
    assert!(is_plugin_archive(Path::new(&format!("plugins/LIBFOO.{}", ext.to_uppercase()))));
    assert!(!is_plugin_archive(Path::new("plugins/readme.txt")));
    assert!(!is_plugin_archive(Path::new("plugins/no_extension")));
}

#[test]
fn test_static_loader_verify_and_load() {
    let log = call_log();
    let metadata = meta("Static", "0.0.0", &[]);
    let mut loader = PluginLoader::from_static("builtin:static", move || {
        Box::new(TestPlugin::new(metadata.clone(), log.clone())) as Box<dyn Plugin>
    });

    assert!(!loader.is_verified());
    loader.verify().unwrap();
    assert!(loader.is_verified());

    let plugin = loader.load().unwrap();
    assert_eq!(plugin.name(), "Static");
    assert_eq!(loader.path(), Path::new("builtin:static"));
}

#[test]
fn test_panicking_constructor_is_load_failure() {
    let mut loader = PluginLoader::from_static("builtin:boom", || -> Box<dyn Plugin> { panic!("constructor boom") });
    let err = loader.load().err().unwrap();
    match err {
        PluginSystemError::LoadFailure { message, .. } => assert!(message.contains("constructor boom")),
        other => panic!("Unexpected error: {other}"),
    }
}

#[test]
fn test_open_missing_file_fails_verification() {
    let mut loader = PluginLoader::open("/definitely/not/here/libnothing.so");
    let err = loader.verify().unwrap_err();
    assert!(matches!(err, PluginSystemError::LoadFailure { .. }));
    assert!(!err.is_not_a_plugin());
}

// Archive counting how often its resource is released
struct CountingArchive {
    closes: Arc<AtomicUsize>,
}

impl PluginArchive for CountingArchive {
    fn resolve(&mut self, _path: &Path) -> Result<(), PluginSystemError> {
        Ok(())
    }

    fn instantiate(&mut self, path: &Path) -> Result<Box<dyn Plugin>, PluginSystemError> {
        Err(PluginSystemError::NotAPlugin {
            path: path.to_path_buf(),
            reason: "counting archive holds no plugin".to_string(),
        })
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_close_releases_exactly_once() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut loader = PluginLoader::with_archive("counting", Box::new(CountingArchive { closes: closes.clone() }));

    loader.close();
    loader.close();
    assert!(loader.is_closed());
    drop(loader);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_releases_resource() {
    let closes = Arc::new(AtomicUsize::new(0));
    {
        let _loader = PluginLoader::with_archive("counting", Box::new(CountingArchive { closes: closes.clone() }));
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_closed_loader_refuses_work() {
    let log = call_log();
    let metadata = meta("Late", "0.0.0", &[]);
    let mut loader = PluginLoader::from_static("builtin:late", move || {
        Box::new(TestPlugin::new(metadata.clone(), log.clone())) as Box<dyn Plugin>
    });
    loader.close();

    assert!(matches!(loader.verify(), Err(PluginSystemError::LoadFailure { .. })));
    assert!(matches!(loader.load(), Err(PluginSystemError::LoadFailure { .. })));
}
