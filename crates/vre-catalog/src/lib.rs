//! VRE hub resource catalog
//!
//! Reads the directory service's XML documents into a generic element tree
//! ([`document`]), projects them into typed catalog entries
//! ([`projection`]), and fetches them over HTTP ([`ResourceCatalogClient`]).

pub mod client;
pub mod document;
pub mod projection;

pub use client::ResourceCatalogClient;
pub use document::{parse_document, XmlNode};
pub use projection::{parse_catalog, parse_compute_endpoint, COMPUTE_ENTRY_NAME};
