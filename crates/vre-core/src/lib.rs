//! VRE hub core
//!
//! Shared vocabulary of the login → launch pipeline: the identity context a
//! login is attempted in, the permissions and roles resolved for it, the typed
//! resource catalog, launch profiles, the unified error type and the
//! validated hub configuration.
//!
//! Nothing in this crate performs I/O beyond reading the configuration file.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{HubConfig, VolumeMapping, WorkspaceConfig};
pub use errors::{AccessDenial, VreError, VreResult};
pub use types::*;
