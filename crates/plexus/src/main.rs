mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use plexus_core::kernel::{HostServices, RuntimeConfig, constants};
use plexus_core::module::SettingsRegistry;
use plexus_core::notify::{NotificationBridge, RecordingProvider};
use plexus_core::{Application, DefaultEventBus};
use tracing_subscriber::EnvFilter;

use cli::{CliArgs, Command};

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

fn load_config(args: &CliArgs) -> plexus_core::kernel::Result<RuntimeConfig> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::load(Path::new(constants::DEFAULT_CONFIG_FILE))?,
    };
    if let Some(dir) = &args.plugins_dir {
        config.plugin_dir = dir.clone();
    }
    if let Some(version) = &args.host_version {
        config.host_version = version.clone();
    }
    Ok(config)
}

fn host_services(quiet: bool) -> HostServices {
    if !quiet {
        return HostServices::with_defaults();
    }
    let bridge = NotificationBridge::new();
    bridge.add_provider(Box::new(RecordingProvider::new()));
    HostServices::new(
        Arc::new(SettingsRegistry::new()),
        Arc::new(DefaultEventBus::new()),
        Arc::new(bridge),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.log_level.as_deref());

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut app = match Application::with_services(config, host_services(args.quiet)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize {}: {}", constants::APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.pre_init() {
        error!("Plugin discovery was not started: {}", e);
    }
    let loaded = match app.init().await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Startup failed: {}", e);
            app.shutdown();
            return ExitCode::FAILURE;
        }
    };
    println!("Loaded {} plugins", loaded);

    match args.command.unwrap_or(Command::Run) {
        Command::Plugins => cli::print_plugins(&app),
        Command::Modules => cli::print_modules(&app),
        Command::Run => {
            info!("Posting a single tick to {} modules", app.modules().len());
            app.tick(1);
        }
    }

    let unloaded = app.shutdown();
    println!("Unloaded {} plugins", unloaded);
    ExitCode::SUCCESS
}
