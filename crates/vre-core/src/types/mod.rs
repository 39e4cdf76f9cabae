//! Data model shared by every stage of the login → launch pipeline

pub mod auth_state;
pub mod catalog;
pub mod identity;
pub mod profile;

pub use auth_state::{AuthState, ResolvedPermissions};
pub use catalog::{
    CatalogEntry, CatalogParse, CpuAmount, MemoryAmount, ServerOption, SkippedEntry, VolumeOption,
    VolumePermission,
};
pub use identity::{form_encode, IdentityContext, PermissionClaim, PermissionSet, RoleSet};
pub use profile::{GpuOverride, LaunchProfile, ProfileOverrides};
