//! Named-server selection
//!
//! A user may run several named servers per context; the server name picks
//! which option-type the profile list is drawn from. `rname-RStudioServerOption`
//! selects `RStudioServerOption`, the unnamed server selects the default
//! option-type.

use std::fmt;
use vre_core::HubConfig;

/// Option-type name a launch request draws its profiles from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedServerSelector {
    option_name: String,
}

impl NamedServerSelector {
    /// Selector for a server name, stripping the configured prefix.
    /// An absent or empty name selects the default option-type.
    pub fn from_server_name(server_name: Option<&str>, config: &HubConfig) -> Self {
        let option_name = match server_name.filter(|n| !n.is_empty()) {
            Some(name) => name
                .strip_prefix(config.server_name_prefix.as_str())
                .unwrap_or(name)
                .to_string(),
            None => config.default_server_option_name.clone(),
        };
        Self { option_name }
    }

    /// Selected option-type name
    pub fn option_name(&self) -> &str {
        &self.option_name
    }

    /// Whether options of `catalog_name` belong to the selected server
    pub fn selects(&self, catalog_name: &str) -> bool {
        self.option_name == catalog_name
    }
}

impl fmt::Display for NamedServerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.option_name)
    }
}
