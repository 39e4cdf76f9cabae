//! `check-config`: print the effective configuration

use anyhow::{Context, Result};
use vre_core::HubConfig;

/// Print `config` as TOML; loading already validated it
pub fn run(config: &HubConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering configuration")?;
    tracing::info!(
        token_endpoint = %config.token_endpoint(),
        catalog_endpoint = %config.catalog_endpoint(),
        compute_discovery = config.discover_compute_endpoint,
        "configuration is valid"
    );
    println!("{rendered}");
    Ok(())
}
