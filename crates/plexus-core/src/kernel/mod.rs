//! # Plexus Kernel
//!
//! Startup, shutdown and the ambient pieces every other subsystem leans on.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Application Bootstrapping**: [`Application`](bootstrap::Application)
//!   runs `pre_init` (background plugin discovery) and `init` (bulk load and
//!   module post-init), and unloads everything on `shutdown`.
//! - **Host Services**: [`HostServices`](services::HostServices) bundles the
//!   settings registry, event bus and notifier handed to modules and plugins.
//! - **Configuration**: [`RuntimeConfig`](config::RuntimeConfig) read from
//!   JSON, TOML or YAML, and [`ConfigData`](config::ConfigData) snapshots.
//! - **Core Constants**: the `constants` submodule (app name, host version,
//!   plugin ABI symbols).
//! - **Error Handling**: kernel [`Error`](error::Error) wrapping every
//!   subsystem error, plus a `Result` alias.
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod services;

pub use bootstrap::Application;
pub use config::{ConfigData, ConfigFormat, RuntimeConfig};
pub use error::{Error, Result};
pub use services::HostServices;
