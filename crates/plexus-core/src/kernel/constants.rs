/// Application name
pub const APP_NAME: &str = "Plexus";

/// Host version plugins are checked against (their declared minimum must not exceed it)
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default plugins directory, relative to the working directory
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

/// Default runtime configuration file
pub const DEFAULT_CONFIG_FILE: &str = "plexus.toml";

/// Exported constructor every plugin archive must provide
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"_plexus_plugin_create\0";

/// Exported static holding the ABI revision the archive was built against
pub const PLUGIN_ABI_SYMBOL: &[u8] = b"_PLEXUS_PLUGIN_ABI\0";

/// Current plugin ABI revision. Bump whenever the `Plugin` trait changes shape.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// File extension of plugin archives on this platform (`so`, `dylib` or `dll`)
pub fn archive_extension() -> &'static str {
    std::env::consts::DLL_EXTENSION
}
