//! Operator CLI for the VRE hub
//!
//! Runs the login pipeline against live endpoints, previews profile lists
//! from a local catalog document, and checks configuration files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{
    check_config,
    login::{self, LoginArgs},
    profiles::{self, ProfilesArgs},
};

#[derive(Parser)]
#[command(name = "vrehub")]
#[command(about = "VRE hub - context-scoped permissions and launch profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (defaults plus environment when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full login pipeline and print the launch configuration
    Login(LoginArgs),

    /// Build the profile list from a local catalog document
    Profiles(ProfilesArgs),

    /// Load, validate and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Login(args) => login::run(config, args).await?,
        Commands::Profiles(args) => profiles::run(&config, args)?,
        Commands::CheckConfig => check_config::run(&config)?,
    }

    Ok(())
}
