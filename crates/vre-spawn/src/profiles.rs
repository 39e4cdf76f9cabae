//! Launch profile derivation
//!
//! Two stages. [`ProfileBuilder::split_catalog`] keeps the server options the
//! user's roles make visible and collects volume permissions. Then
//! [`ProfileBuilder::build_profiles`] keeps only the options the user is
//! granted and that belong to the selected named server, and turns each into
//! a [`LaunchProfile`].

use crate::selector::NamedServerSelector;
use indexmap::IndexMap;
use vre_core::{
    CatalogParse, HubConfig, LaunchProfile, PermissionSet, ProfileOverrides, RoleSet,
    ServerOption, VolumePermission,
};

/// Cores above which two cores are reserved instead of one
const SMALL_SERVER_CORES: f64 = 4.0;

/// Role-visible server options and catalog volume permissions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSplit {
    /// Server options of a recognized option-type the roles allow
    pub server_options: Vec<ServerOption>,
    /// Catalog volume name to the access mode the catalog grants
    pub volume_permissions: IndexMap<String, VolumePermission>,
}

/// CPU cores reserved for a server limited to `cpu_limit` cores
pub fn cpu_guarantee(cpu_limit: f64) -> u32 {
    if cpu_limit <= SMALL_SERVER_CORES {
        1
    } else {
        2
    }
}

/// Order profiles: defaults first, then by display name
pub fn sort_profiles(profiles: &mut [LaunchProfile]) {
    profiles.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

/// Derives launch profiles from catalog, roles and permissions
#[derive(Debug, Clone, Copy)]
pub struct ProfileBuilder<'a> {
    config: &'a HubConfig,
}

impl<'a> ProfileBuilder<'a> {
    /// Builder using `config`'s option types, image override and GPU block
    pub fn new(config: &'a HubConfig) -> Self {
        Self { config }
    }

    /// Split the catalog into role-visible server options and volume
    /// permissions. Volumes are not filtered here.
    pub fn split_catalog(&self, roles: &RoleSet, catalog: &CatalogParse) -> CatalogSplit {
        let mut split = CatalogSplit::default();

        for option in catalog.server_options() {
            if let Some(role) = &option.role {
                if !roles.contains(role) {
                    tracing::debug!(auth_id = %option.auth_id, %role, "server option role not held, discarding");
                    continue;
                }
            }
            if !self.config.is_recognized_option(&option.catalog_name) {
                tracing::debug!(
                    auth_id = %option.auth_id,
                    catalog_name = %option.catalog_name,
                    "unrecognized option type, discarding"
                );
                continue;
            }
            split.server_options.push(option.clone());
        }

        for volume in catalog.volume_options() {
            split
                .volume_permissions
                .insert(volume.name.clone(), volume.permission);
        }

        split
    }

    /// Build the profile list for one launch request.
    ///
    /// `extra_profiles` are offered regardless of permissions and selector.
    pub fn build_profiles(
        &self,
        permissions: &PermissionSet,
        options: &[ServerOption],
        selector: &NamedServerSelector,
        extra_profiles: &[LaunchProfile],
    ) -> Vec<LaunchProfile> {
        let mut profiles: Vec<LaunchProfile> = options
            .iter()
            .filter(|option| {
                if !permissions.grants(&option.auth_id) {
                    tracing::debug!(auth_id = %option.auth_id, "server option not granted, discarding");
                    return false;
                }
                if !selector.selects(&option.catalog_name) {
                    tracing::debug!(
                        name = %option.display_name,
                        catalog_name = %option.catalog_name,
                        "server option belongs to another named server, discarding"
                    );
                    return false;
                }
                true
            })
            .map(|option| self.profile_for(option))
            .collect();

        profiles.extend_from_slice(extra_profiles);
        sort_profiles(&mut profiles);
        tracing::debug!(count = profiles.len(), selector = %selector, "profiles built");
        profiles
    }

    /// Launch profile for a single server option
    pub fn profile_for(&self, option: &ServerOption) -> LaunchProfile {
        let mut overrides = ProfileOverrides {
            image: option.image.as_deref().map(|i| self.config.override_image(i)),
            ..ProfileOverrides::default()
        };

        let mut summary = Vec::new();
        if let Some(cpu) = &option.cpu_cores {
            overrides.cpu_limit = Some(cpu.cores);
            overrides.cpu_guarantee = Some(cpu_guarantee(cpu.cores));
            summary.push(format!("{cpu} Cores"));
        }
        if let Some(memory) = &option.memory {
            let limit = memory.to_string();
            summary.push(format!("{limit} RAM"));
            overrides.mem_limit = Some(limit);
        }
        if option.gpu_requested {
            overrides.apply_gpu(&self.config.gpu_override);
        }

        let display_name = if summary.is_empty() {
            option.display_name.clone()
        } else {
            format!("{} - {}", option.display_name, summary.join(" / "))
        };

        LaunchProfile {
            display_name,
            description: option.description.clone(),
            slug: option.auth_id.clone(),
            overrides,
            is_default: option.is_default,
        }
    }
}
