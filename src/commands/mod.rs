//! Subcommand handlers
//!
//! Every handler mounts the view it needs, performs at most one change and
//! returns the text to print. Handlers are generic over the backend so they
//! run the same against the REST client and the in-memory backend.

pub mod availability;
pub mod cache;
pub mod dashboard;
pub mod packages;

use thiserror::Error;
use tracing::debug;

use crate::cache::CacheManager;
use crate::cli::{Cli, Command};
use crate::config::{BackendSettings, CacheSettings, ConfigError};
use crate::data::{BackendError, VendorBackend};
use crate::views::ViewError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Resolves configuration, runs `cli.command` and prints its output
pub async fn run(cli: Cli) -> Result<(), CommandError> {
    let cache = CacheSettings::from_cli(&cli)?.open();

    let output = match cli.command {
        // Cache maintenance works without backend credentials
        Command::Cache(command) => cache::run(&cache, command),
        command => {
            let settings = BackendSettings::from_parts(cli.api_url, cli.api_key, cli.vendor_id)?;
            debug!(?settings, "Connecting to backend");
            let client = settings.client()?;
            execute(&client, cache, &settings.vendor_id, command).await?
        }
    };

    println!("{}", output);
    Ok(())
}

/// Runs `command` against `backend` and returns the text to print
pub async fn execute<B: VendorBackend + ?Sized>(
    backend: &B,
    cache: CacheManager,
    vendor_id: &str,
    command: Command,
) -> Result<String, CommandError> {
    match command {
        Command::Dashboard => dashboard::show(backend, cache, vendor_id).await,
        Command::Requests(command) => dashboard::run(backend, cache, vendor_id, command).await,
        Command::Packages(command) => packages::run(backend, cache, vendor_id, command).await,
        Command::Availability(command) => {
            availability::run(backend, cache, vendor_id, command).await
        }
        Command::Cache(command) => Ok(cache::run(&cache, command)),
    }
}
