//! VRE hub session launch
//!
//! Derives the launch profiles a user may pick from ([`ProfileBuilder`]) and
//! renders the configuration the host platform launches the session with
//! ([`SessionEnvironmentBuilder`]).

pub mod environment;
pub mod profiles;
pub mod selector;

pub use environment::{
    mount_permission, notebook_args, sidecar_container, volume_name, LaunchConfiguration,
    SessionEnvironmentBuilder, SidecarContainer, Volume, VolumeMount, WorkspaceAccess,
};
pub use profiles::{cpu_guarantee, sort_profiles, CatalogSplit, ProfileBuilder};
pub use selector::NamedServerSelector;
