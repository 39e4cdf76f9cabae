//! `profiles`: offline profile preview from a catalog document

use super::print_json;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use vre_catalog::parse_catalog;
use vre_core::{HubConfig, PermissionClaim, PermissionSet, RoleSet};
use vre_spawn::{NamedServerSelector, ProfileBuilder};

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Catalog XML document
    #[arg(long)]
    catalog: PathBuf,

    /// Roles held in the context
    #[arg(long = "role", value_delimiter = ',')]
    roles: Vec<String>,

    /// Granted resource names
    #[arg(long = "permission", value_delimiter = ',')]
    permissions: Vec<String>,

    /// Named server to build the list for
    #[arg(long)]
    server_name: Option<String>,
}

pub fn run(config: &HubConfig, args: ProfilesArgs) -> Result<()> {
    let xml = std::fs::read_to_string(&args.catalog)
        .with_context(|| format!("reading catalog {}", args.catalog.display()))?;
    let catalog = parse_catalog(&xml);
    for skipped in &catalog.skipped {
        tracing::warn!(index = skipped.index, reason = %skipped.reason, "catalog entry skipped");
    }

    let roles: RoleSet = args.roles.into_iter().collect();
    let permissions: PermissionSet = args.permissions.into_iter().map(PermissionClaim::new).collect();

    let builder = ProfileBuilder::new(config);
    let split = builder.split_catalog(&roles, &catalog);
    let selector = NamedServerSelector::from_server_name(args.server_name.as_deref(), config);
    let profiles = builder.build_profiles(
        &permissions,
        &split.server_options,
        &selector,
        &config.extra_profiles,
    );

    print_json(&profiles)
}
