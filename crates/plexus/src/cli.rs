use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plexus_core::Application;

/// Plexus: an in-process plugin and module runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Runtime configuration file (json, toml or yaml); `plexus.toml` if present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory scanned for plugin archives
    #[arg(long, value_name = "DIR")]
    pub plugins_dir: Option<PathBuf>,

    /// Host version plugins are checked against
    #[arg(long, value_name = "VERSION")]
    pub host_version: Option<String>,

    /// Log filter, e.g. `debug` or `plexus_core=trace`
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Record notifications instead of printing them
    #[arg(long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// List loaded plugins
    Plugins,
    /// List registered modules and their state
    Modules,
    /// Start, post one tick and shut down
    Run,
}

pub fn print_plugins(app: &Application) {
    let metadata = app.plugins().all_metadata();
    if metadata.is_empty() {
        println!("No plugins loaded.");
        return;
    }
    println!("Loaded plugins:");
    for plugin in metadata {
        println!("  - {}", plugin);
        if !plugin.dependencies.is_empty() {
            println!("      depends on: {}", plugin.dependencies.join(", "));
        }
    }
}

pub fn print_modules(app: &Application) {
    let modules = app.modules().modules();
    if modules.is_empty() {
        println!("No modules registered.");
        return;
    }
    println!("Modules:");
    for module in modules {
        let state = if module.is_enabled() { "enabled" } else { "disabled" };
        let owner = app
            .modules()
            .owner_of(module.name())
            .unwrap_or_else(|| "host".to_string());
        let hud = module.hud_info();
        if hud.is_empty() {
            println!("  - {} [{}] {} ({})", module.name(), module.category(), state, owner);
        } else {
            println!("  - {} [{}] {} ({}) {}", module.name(), module.category(), state, owner, hud);
        }
    }
}
