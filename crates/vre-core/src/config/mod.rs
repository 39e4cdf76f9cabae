//! Hub configuration
//!
//! Loaded once at process start (file, then environment overrides, then
//! validation) and shared read-only afterwards. Nothing in the pipeline
//! mutates a [`HubConfig`].

pub mod validation;

use crate::types::{GpuOverride, LaunchProfile};
use crate::{VreError, VreResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use validation::ConfigValidator;

/// Environment variable overriding [`HubConfig::oidc_url`]
pub const ENV_OIDC_URL: &str = "D4SCIENCE_OIDC_URL";
/// Environment variable overriding [`HubConfig::registry_base_url`]
pub const ENV_REGISTRY_BASE_URL: &str = "D4SCIENCE_REGISTRY_BASE_URL";
/// Environment variable overriding the catalog URL
pub const ENV_CATALOG_URL: &str = "JUPYTERHUB_INFOSYS_URL";
/// Environment variable overriding the compute endpoint lookup URL
pub const ENV_COMPUTE_ENDPOINT_URL: &str = "DM_INFOSYS_URL";
/// Environment variable toggling compute endpoint discovery
pub const ENV_DISCOVER_COMPUTE_ENDPOINT: &str = "D4SCIENCE_DISCOVER_WPS";

const WELL_KNOWN_CONFIG: &str = ".well-known/openid-configuration";

/// Where a catalog volume is mounted and how the host defines it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMapping {
    /// Mount point inside the session container
    pub mount_path: String,
    /// Host volume definition (opaque to the hub)
    #[serde(default)]
    pub volume: Map<String, Value>,
}

/// How the session gets access to the user's workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Mount the workspace from a sidecar instead of the primary container
    pub use_sidecar: bool,
    /// Image of the storage sidecar
    pub sidecar_image: String,
    /// Security context needed to mount the workspace
    pub security_context: Value,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            use_sidecar: true,
            sidecar_image: "eginotebooks/d4science-storage".to_string(),
            security_context: json!({
                "capabilities": {"add": ["SYS_ADMIN"]},
                "privileged": true,
                "runAsUser": 1000,
            }),
        }
    }
}

/// Top-level hub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Identity provider realm URL
    pub oidc_url: String,
    /// Ticket endpoint; derived from `oidc_url` when absent
    pub token_url: Option<String>,
    /// Client application audience for the permission ticket
    pub client_id: String,
    /// Base URL of the directory service
    pub registry_base_url: String,
    /// Resource catalog URL; derived from `registry_base_url` when absent
    pub catalog_url: Option<String>,
    /// Compute endpoint lookup URL; derived from `registry_base_url` when absent
    pub compute_endpoint_url: Option<String>,
    /// Whether to look up the compute endpoint at all
    pub discover_compute_endpoint: bool,
    /// Catalog option-type names that become launch profiles
    pub server_option_names: Vec<String>,
    /// Option-type used when no named server is requested
    pub default_server_option_name: String,
    /// Prefix of named servers that select an option-type
    pub server_name_prefix: String,
    /// Role that always gets read-write volumes
    pub data_manager_role: String,
    /// Registry replacing the repository part of every image
    pub image_repo_override: String,
    /// Primary image of the session when no profile overrides it
    pub default_image: String,
    /// Landing URL of the notebook server
    pub default_url: String,
    /// Label key carrying the login `label` parameter
    pub label_name: String,
    /// Scheduling block merged into GPU profiles
    pub gpu_override: GpuOverride,
    /// Catalog volume name to mount definition
    pub volume_mappings: IndexMap<String, VolumeMapping>,
    /// Profiles offered regardless of catalog and permissions
    pub extra_profiles: Vec<LaunchProfile>,
    /// Workspace access settings
    pub workspace: WorkspaceConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            oidc_url: "https://accounts.d4science.org/auth/realms/d4science/".to_string(),
            token_url: None,
            client_id: "jupyterhub".to_string(),
            registry_base_url: "https://registry.d4science.org/icproxy/gcube/service".to_string(),
            catalog_url: None,
            compute_endpoint_url: None,
            discover_compute_endpoint: false,
            server_option_names: vec![
                "ServerOption".to_string(),
                "RStudioServerOption".to_string(),
                "WITOILServerOption".to_string(),
                "webODVServerOption".to_string(),
            ],
            default_server_option_name: "ServerOption".to_string(),
            server_name_prefix: "rname-".to_string(),
            data_manager_role: "Data-Manager".to_string(),
            image_repo_override: String::new(),
            default_image: "jupyter/base-notebook:latest".to_string(),
            default_url: "/lab".to_string(),
            label_name: "d4science-namespace".to_string(),
            gpu_override: GpuOverride {
                node_selector: BTreeMap::from([(
                    "cloud.google.com/gke-nodepool".to_string(),
                    "d4science-prod-vre-gke-nodepool2".to_string(),
                )]),
                extra_resource_guarantees: BTreeMap::from([("nvidia.com/gpu".to_string(), json!(1))]),
                extra_resource_limits: BTreeMap::from([("nvidia.com/gpu".to_string(), json!(1))]),
            },
            volume_mappings: IndexMap::new(),
            extra_profiles: Vec::new(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl HubConfig {
    /// Load from a TOML file, apply process environment overrides, validate.
    pub fn load(path: &Path) -> VreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VreError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(std::env::vars());
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded hub configuration");
        Ok(config)
    }

    /// Defaults plus process environment overrides, validated.
    pub fn from_env() -> VreResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without applying overrides or validation
    pub fn from_toml_str(content: &str) -> VreResult<Self> {
        toml::from_str(content).map_err(|e| VreError::config(format!("invalid TOML: {e}")))
    }

    /// Apply deployment overrides from key/value pairs (normally `std::env::vars()`).
    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_OIDC_URL => self.oidc_url = value,
                ENV_REGISTRY_BASE_URL => self.registry_base_url = value,
                ENV_CATALOG_URL => self.catalog_url = Some(value),
                ENV_COMPUTE_ENDPOINT_URL => self.compute_endpoint_url = Some(value),
                ENV_DISCOVER_COMPUTE_ENDPOINT => {
                    self.discover_compute_endpoint =
                        matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1");
                }
                _ => continue,
            }
            tracing::debug!(key = %key, "configuration overridden from environment");
        }
    }

    /// Check every field, reporting all failures at once
    pub fn validate(&self) -> VreResult<()> {
        let mut validator = ConfigValidator::new();
        validator
            .http_url("oidc_url", &self.oidc_url)
            .http_url("token_url", &self.token_endpoint())
            .http_url("catalog_url", &self.catalog_endpoint())
            .http_url("compute_endpoint_url", &self.compute_endpoint())
            .non_empty("client_id", &self.client_id)
            .non_empty("default_server_option_name", &self.default_server_option_name)
            .non_empty("data_manager_role", &self.data_manager_role)
            .custom(
                "server_option_names",
                &self.server_option_names,
                |names| !names.is_empty(),
                "at least one option-type name is required",
            );

        if self.workspace.use_sidecar {
            let mut nested = validator.for_field("workspace");
            nested.non_empty("sidecar_image", &self.workspace.sidecar_image);
            validator.merge(nested);
        }

        for (name, mapping) in &self.volume_mappings {
            let mut nested = validator.for_field("volume_mappings").for_field(name);
            nested
                .non_empty("mount_path", &mapping.mount_path)
                .custom(
                    "volume",
                    &mapping.volume,
                    |volume| !volume.is_empty(),
                    "volume definition must not be empty",
                );
            validator.merge(nested);
        }

        validator.finish()
    }

    /// Ticket endpoint URL
    pub fn token_endpoint(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| url_path_join(&self.oidc_url, "protocol/openid-connect/token"))
    }

    /// OpenID discovery document URL
    pub fn discovery_endpoint(&self) -> String {
        url_path_join(&self.oidc_url, WELL_KNOWN_CONFIG)
    }

    /// Resource catalog URL
    pub fn catalog_endpoint(&self) -> String {
        self.catalog_url
            .clone()
            .unwrap_or_else(|| url_path_join(&self.registry_base_url, "GenericResource/JupyterHub"))
    }

    /// Compute endpoint lookup URL
    pub fn compute_endpoint(&self) -> String {
        self.compute_endpoint_url.clone().unwrap_or_else(|| {
            url_path_join(
                &self.registry_base_url,
                "ServiceEndpoint/DataAnalysis/DataMiner",
            )
        })
    }

    /// Whether an option-type name is turned into launch profiles
    pub fn is_recognized_option(&self, catalog_name: &str) -> bool {
        self.server_option_names.iter().any(|n| n == catalog_name)
    }

    /// Rewrite an image onto the override repository, if one is configured
    pub fn override_image(&self, image: &str) -> String {
        if self.image_repo_override.is_empty() {
            return image.to_string();
        }
        let name = image.rsplit('/').next().unwrap_or(image);
        format!("{}/{name}", self.image_repo_override.trim_end_matches('/'))
    }
}

/// Join a base URL and a relative path with exactly one slash between them
pub fn url_path_join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = HubConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.discovery_endpoint(),
            "https://accounts.d4science.org/auth/realms/d4science/.well-known/openid-configuration"
        );
        assert_eq!(
            config.catalog_endpoint(),
            "https://registry.d4science.org/icproxy/gcube/service/GenericResource/JupyterHub"
        );
        assert_eq!(
            config.token_endpoint(),
            "https://accounts.d4science.org/auth/realms/d4science/protocol/openid-connect/token"
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HubConfig::default();
        config.apply_env_overrides([
            (ENV_REGISTRY_BASE_URL.to_string(), "https://registry.test/svc".to_string()),
            (ENV_DISCOVER_COMPUTE_ENDPOINT.to_string(), "TRUE".to_string()),
            ("UNRELATED".to_string(), "ignored".to_string()),
        ]);
        assert!(config.discover_compute_endpoint);
        assert_eq!(
            config.compute_endpoint(),
            "https://registry.test/svc/ServiceEndpoint/DataAnalysis/DataMiner"
        );

        config.apply_env_overrides([(ENV_DISCOVER_COMPUTE_ENDPOINT.to_string(), "yes".to_string())]);
        assert!(!config.discover_compute_endpoint);
    }

    #[test]
    fn test_explicit_catalog_url_wins_over_registry_base() {
        let mut config = HubConfig::default();
        config.apply_env_overrides([
            (ENV_CATALOG_URL.to_string(), "https://catalog.test/jh".to_string()),
            (ENV_REGISTRY_BASE_URL.to_string(), "https://registry.test".to_string()),
        ]);
        assert_eq!(config.catalog_endpoint(), "https://catalog.test/jh");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
client_id = "hub"
data_manager_role = "Curator"
server_option_names = ["ServerOption"]

[volume_mappings.Workspace]
mount_path = "/home/jovyan/dataspace"
volume = {{ persistentVolumeClaim = {{ claimName = "dataspace" }} }}

[workspace]
use_sidecar = false
"#
        )
        .unwrap();

        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.client_id, "hub");
        assert_eq!(config.data_manager_role, "Curator");
        assert!(!config.workspace.use_sidecar);
        assert_eq!(
            config.volume_mappings["Workspace"].volume["persistentVolumeClaim"]["claimName"],
            "dataspace"
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = HubConfig::from_toml_str("clientid = \"typo\"").unwrap_err();
        assert_matches!(err, VreError::Config { .. });
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let mut config = HubConfig::default();
        config.oidc_url = "accounts".to_string();
        config.server_option_names.clear();
        config.volume_mappings.insert(
            "Workspace".to_string(),
            VolumeMapping {
                mount_path: String::new(),
                volume: Map::new(),
            },
        );

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("oidc_url"));
        assert!(message.contains("server_option_names"));
        assert!(message.contains("volume_mappings.Workspace.mount_path"));
        assert!(message.contains("volume_mappings.Workspace.volume"));
    }

    #[test]
    fn test_image_override() {
        let mut config = HubConfig::default();
        assert_eq!(config.override_image("d4science/notebook:1.0"), "d4science/notebook:1.0");

        config.image_repo_override = "registry.example.org/mirror/".to_string();
        assert_eq!(
            config.override_image("docker.io/d4science/notebook:1.0"),
            "registry.example.org/mirror/notebook:1.0"
        );
        assert_eq!(config.override_image("notebook"), "registry.example.org/mirror/notebook");
    }
}
