//! `login`: authenticate against live endpoints and render the launch

use super::print_json;
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use vre_auth::SigningKeyCache;
use vre_cli::{HubFlow, LoginRequest};
use vre_core::HubConfig;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Access token obtained from the identity provider
    #[arg(long, env = "VREHUB_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Context to log in to, e.g. /gcube/devsec/devVRE
    #[arg(long)]
    context: String,

    /// Namespace to launch in
    #[arg(long)]
    namespace: Option<String>,

    /// Label attached to the session
    #[arg(long)]
    label: Option<String>,

    /// Named server to render the launch for
    #[arg(long)]
    server_name: Option<String>,
}

pub async fn run(config: HubConfig, args: LoginArgs) -> Result<()> {
    let flow = HubFlow::new(Arc::new(config), Arc::new(SigningKeyCache::new()));
    let request = LoginRequest {
        access_token: args.access_token,
        context: Some(args.context),
        namespace: args.namespace,
        label: args.label,
    };

    let launch = flow.login(&request, args.server_name.as_deref()).await?;
    print_json(&launch)
}
