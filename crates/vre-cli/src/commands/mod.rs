//! Subcommand handlers

pub mod check_config;
pub mod login;
pub mod profiles;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use vre_core::HubConfig;

/// Load the configuration file, or defaults plus environment without one
pub fn load_config(path: Option<&Path>) -> Result<HubConfig> {
    match path {
        Some(path) => HubConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => HubConfig::from_env().context("building configuration from environment"),
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "client_id = \"\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("loading configuration from"));
        assert!(format!("{err:#}").contains("client_id"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "client_id = \"lab-hub\"\ndefault_url = \"/tree\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.client_id, "lab-hub");
        assert_eq!(config.default_url, "/tree");
    }
}
