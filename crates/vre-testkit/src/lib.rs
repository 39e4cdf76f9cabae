//! VRE hub testing infrastructure
//!
//! Shared fixtures for the hub crates: RSA signing keys and ticket claim
//! builders, directory service documents, an HTTP fake for the upstream
//! systems, and proptest strategies.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! vre-testkit = { path = "../vre-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod catalog;
pub mod idp;
pub mod keys;
pub mod strategies;
pub mod tickets;

pub use catalog::{service_endpoints_xml, CatalogXml, ServerOptionXml};
pub use idp::{FakeUpstream, CLIENT_ID};
pub use keys::{jwks, SigningFixture, IDP_KEY_ID};
pub use tickets::TicketClaims;

use vre_core::{CpuAmount, MemoryAmount, ServerOption};

/// Plain server option of the default option-type, no role, no resources
pub fn server_option(auth_id: &str, display_name: &str) -> ServerOption {
    ServerOption {
        auth_id: auth_id.to_string(),
        display_name: display_name.to_string(),
        description: String::new(),
        catalog_name: "ServerOption".to_string(),
        role: None,
        image: None,
        cpu_cores: None,
        memory: None,
        gpu_requested: false,
        is_default: false,
    }
}

/// Core count shorthand; panics on text the catalog parser would reject
pub fn cpus(raw: &str) -> CpuAmount {
    CpuAmount::parse(raw).unwrap()
}

/// Memory amount shorthand
pub fn memory(value: &str, unit: &str) -> MemoryAmount {
    MemoryAmount {
        value: value.to_string(),
        unit: unit.to_string(),
    }
}
