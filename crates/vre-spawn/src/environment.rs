//! Session environment rendering
//!
//! Turns an [`AuthState`] into the [`LaunchConfiguration`] the host platform
//! launches a session from. Everything here is a pure function of the auth
//! state, the configuration and the requested server name.

use crate::profiles::ProfileBuilder;
use crate::selector::NamedServerSelector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use vre_core::{AuthState, HubConfig, LaunchProfile, RoleSet, VolumePermission};

/// Context token, legacy name
pub const ENV_GCUBE_TOKEN: &str = "GCUBE_TOKEN";
/// Context token
pub const ENV_D4SCIENCE_TOKEN: &str = "D4SCIENCE_TOKEN";
/// Decoded context, legacy name
pub const ENV_GCUBE_CONTEXT: &str = "GCUBE_CONTEXT";
/// Decoded context
pub const ENV_D4SCIENCE_CONTEXT: &str = "D4SCIENCE_CONTEXT";
/// Discovered compute endpoint
pub const ENV_DATAMINER_URL: &str = "DATAMINER_URL";
/// Last path segment of the context
pub const ENV_VRE: &str = "VRE";

/// Annotation carrying the decoded context
pub const CONTEXT_ANNOTATION: &str = "d4science_context";

/// Sidecar container name
pub const SIDECAR_NAME: &str = "workspace-sidecar";
const WORKSPACE_PATH: &str = "/workspace";
const WORKSPACE_VOLUME: &str = "workspace";

/// A volume attached to the session pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Normalized volume name
    pub name: String,
    /// Volume source as configured for the catalog volume
    #[serde(flatten)]
    pub source: Map<String, Value>,
}

/// Where a volume appears inside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Name of the mounted volume
    pub name: String,
    /// Path inside the container
    pub mount_path: String,
    /// Whether writes are refused
    pub read_only: bool,
}

/// Name/value environment entry of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

/// Command run before the sidecar stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    /// Hook run before the container stops
    pub pre_stop: ExecHook,
}

/// Exec handler of a lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecHook {
    /// Command to run
    pub exec: ExecCommand,
}

/// Command line of an exec handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCommand {
    /// Program and arguments
    pub command: Vec<String>,
}

/// Container that mounts the user's workspace and shares the mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarContainer {
    /// Container name
    pub name: String,
    /// Storage client image
    pub image: String,
    /// Privileges needed for the FUSE mount
    pub security_context: Value,
    /// Mount path and context token
    pub env: Vec<EnvVar>,
    /// Shared workspace mount
    pub volume_mounts: Vec<VolumeMount>,
    /// Unmount on stop
    pub lifecycle: Lifecycle,
}

/// How the session reaches the user's workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WorkspaceAccess {
    /// A sidecar container holds the mount
    Sidecar {
        /// Extra container to run next to the session
        container: SidecarContainer,
    },
    /// The session container mounts it itself with elevated privileges
    SecurityContext {
        /// Security context of the session container
        security_context: Value,
    },
    /// No context token, no workspace
    Disabled,
}

/// Everything the host platform needs to launch one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfiguration {
    /// Environment of the session container
    pub environment: BTreeMap<String, String>,
    /// Volumes attached to the session
    pub volumes: Vec<Volume>,
    /// Mounts of those volumes in the session container
    pub volume_mounts: Vec<VolumeMount>,
    /// Workspace sidecar or security context
    pub workspace: WorkspaceAccess,
    /// Namespace to launch in, form-encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Extra pod labels
    pub extra_labels: BTreeMap<String, String>,
    /// Extra pod annotations
    pub extra_annotations: BTreeMap<String, String>,
    /// Image when the chosen profile does not set one
    pub image: String,
    /// Notebook server arguments
    pub args: Vec<String>,
    /// Profiles offered, in display order
    pub profiles: Vec<LaunchProfile>,
}

impl LaunchConfiguration {
    /// Sidecar containers to add to the session pod
    pub fn extra_containers(&self) -> Vec<&SidecarContainer> {
        match &self.workspace {
            WorkspaceAccess::Sidecar { container } => vec![container],
            _ => Vec::new(),
        }
    }

    /// Security context of the session container, if elevated
    pub fn container_security_context(&self) -> Option<&Value> {
        match &self.workspace {
            WorkspaceAccess::SecurityContext { security_context } => Some(security_context),
            _ => None,
        }
    }
}

/// Kubernetes-safe volume name for a catalog volume
pub fn volume_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Access mode a volume is mounted with: read-write when the catalog says so
/// or the user is a data manager
pub fn mount_permission(
    catalog: VolumePermission,
    roles: &RoleSet,
    data_manager_role: &str,
) -> VolumePermission {
    if catalog.is_read_write() || roles.contains(data_manager_role) {
        VolumePermission::ReadWrite
    } else {
        VolumePermission::ReadOnly
    }
}

/// Notebook server arguments; RStudio servers land on `/rstudio`
pub fn notebook_args(server_name: Option<&str>, default_url: &str) -> Vec<String> {
    let is_rstudio = server_name.is_some_and(|n| n.to_lowercase().contains("rstudio"));
    let url = if is_rstudio { "/rstudio" } else { default_url };
    vec![
        "--FileCheckpoints.checkpoint_dir='/home/jovyan/.notebookCheckpoints'".to_string(),
        "--FileContentsManager.use_atomic_writing=False".to_string(),
        "--ResourceUseDisplay.track_cpu_percent=True".to_string(),
        "--NotebookApp.iopub_data_rate_limit=100000000".to_string(),
        format!("--SingleUserNotebookApp.default_url={url}"),
        format!("--ServerApp.default_url={url}"),
    ]
}

/// Workspace sidecar holding `token`
pub fn sidecar_container(image: &str, security_context: &Value, token: &str) -> SidecarContainer {
    SidecarContainer {
        name: SIDECAR_NAME.to_string(),
        image: image.to_string(),
        security_context: security_context.clone(),
        env: vec![
            EnvVar {
                name: "MNTPATH".to_string(),
                value: WORKSPACE_PATH.to_string(),
            },
            EnvVar {
                name: ENV_D4SCIENCE_TOKEN.to_string(),
                value: token.to_string(),
            },
        ],
        volume_mounts: vec![VolumeMount {
            name: WORKSPACE_VOLUME.to_string(),
            mount_path: format!("{WORKSPACE_PATH}:shared"),
            read_only: false,
        }],
        lifecycle: Lifecycle {
            pre_stop: ExecHook {
                exec: ExecCommand {
                    command: vec![
                        "fusermount".to_string(),
                        "-uz".to_string(),
                        WORKSPACE_PATH.to_string(),
                    ],
                },
            },
        },
    }
}

/// Renders launch configurations
#[derive(Debug, Clone, Copy)]
pub struct SessionEnvironmentBuilder<'a> {
    config: &'a HubConfig,
}

impl<'a> SessionEnvironmentBuilder<'a> {
    /// Builder for sessions of the hub configured by `config`
    pub fn new(config: &'a HubConfig) -> Self {
        Self { config }
    }

    /// Render the launch configuration for `server_name` (the unnamed server
    /// when `None`)
    pub fn build(&self, state: &AuthState, server_name: Option<&str>) -> LaunchConfiguration {
        let profiles = ProfileBuilder::new(self.config);
        let split = profiles.split_catalog(state.roles(), &state.catalog);
        let selector = NamedServerSelector::from_server_name(server_name, self.config);
        let profile_list = profiles.build_profiles(
            state.permissions(),
            &split.server_options,
            &selector,
            &self.config.extra_profiles,
        );

        let (volumes, volume_mounts) = self.volumes(&split.volume_permissions, state.roles());

        let mut extra_labels = BTreeMap::new();
        if let Some(label) = state.identity.encoded_label() {
            extra_labels.insert(self.config.label_name.clone(), label);
        }
        let mut extra_annotations = BTreeMap::new();
        if state.identity.has_context() {
            extra_annotations.insert(CONTEXT_ANNOTATION.to_string(), state.identity.context.clone());
        }

        LaunchConfiguration {
            environment: self.environment(state),
            volumes,
            volume_mounts,
            workspace: self.workspace(state.context_token()),
            namespace: state.identity.encoded_namespace(),
            extra_labels,
            extra_annotations,
            image: self.config.override_image(&self.config.default_image),
            args: notebook_args(server_name, &self.config.default_url),
            profiles: profile_list,
        }
    }

    /// Session environment variables
    pub fn environment(&self, state: &AuthState) -> BTreeMap<String, String> {
        let token = state.context_token().to_string();
        let context = state.identity.context.clone();

        let mut env = BTreeMap::from([
            (ENV_GCUBE_TOKEN.to_string(), token.clone()),
            (ENV_D4SCIENCE_TOKEN.to_string(), token),
            (ENV_GCUBE_CONTEXT.to_string(), context.clone()),
            (ENV_D4SCIENCE_CONTEXT.to_string(), context),
        ]);
        if let Some(endpoint) = &state.compute_endpoint {
            env.insert(ENV_DATAMINER_URL.to_string(), endpoint.clone());
        }
        if let Some(vre) = state.identity.vre_name() {
            tracing::debug!(vre, "session VRE");
            env.insert(ENV_VRE.to_string(), vre.to_string());
        }
        env
    }

    /// Volumes and mounts for catalog volumes that have a configured mapping
    pub fn volumes(
        &self,
        permissions: &IndexMap<String, VolumePermission>,
        roles: &RoleSet,
    ) -> (Vec<Volume>, Vec<VolumeMount>) {
        let mut volumes = Vec::new();
        let mut mounts = Vec::new();

        for (name, permission) in permissions {
            let Some(mapping) = self.config.volume_mappings.get(name) else {
                tracing::debug!(volume = %name, "no mapping for catalog volume");
                continue;
            };
            let vol_name = volume_name(name);
            let access = mount_permission(*permission, roles, &self.config.data_manager_role);
            tracing::debug!(volume = %vol_name, ?permission, ?access, "mounting volume");

            volumes.push(Volume {
                name: vol_name.clone(),
                source: mapping.volume.clone(),
            });
            mounts.push(VolumeMount {
                name: vol_name,
                mount_path: mapping.mount_path.clone(),
                read_only: !access.is_read_write(),
            });
        }

        (volumes, mounts)
    }

    /// Workspace access for a session holding `token`
    pub fn workspace(&self, token: &str) -> WorkspaceAccess {
        let workspace = &self.config.workspace;
        if token.is_empty() {
            tracing::debug!("no context token, workspace access not configured");
            WorkspaceAccess::Disabled
        } else if workspace.use_sidecar {
            WorkspaceAccess::Sidecar {
                container: sidecar_container(
                    &workspace.sidecar_image,
                    &workspace.security_context,
                    token,
                ),
            }
        } else {
            WorkspaceAccess::SecurityContext {
                security_context: workspace.security_context.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vre_core::{CatalogParse, IdentityContext, ResolvedPermissions, VolumeMapping};

    fn state(context: &str, token: &str) -> AuthState {
        AuthState {
            identity: IdentityContext::from_login_params(Some(context), Some("dev ns"), Some("a/b")),
            resolved: ResolvedPermissions {
                context_token: token.to_string(),
                permissions: Default::default(),
                roles: Default::default(),
            },
            catalog: CatalogParse::empty(),
            compute_endpoint: None,
        }
    }

    #[test]
    fn test_environment_dual_names() {
        let config = HubConfig::default();
        let mut state = state("/gcube/devsec/devVRE", "tok");
        state.compute_endpoint = Some("https://dm.example.org/wps".into());

        let env = SessionEnvironmentBuilder::new(&config).environment(&state);
        assert_eq!(env[ENV_GCUBE_TOKEN], "tok");
        assert_eq!(env[ENV_D4SCIENCE_TOKEN], "tok");
        assert_eq!(env[ENV_GCUBE_CONTEXT], "/gcube/devsec/devVRE");
        assert_eq!(env[ENV_D4SCIENCE_CONTEXT], "/gcube/devsec/devVRE");
        assert_eq!(env[ENV_DATAMINER_URL], "https://dm.example.org/wps");
        assert_eq!(env[ENV_VRE], "devVRE");
    }

    #[test]
    fn test_launch_metadata() {
        let config = HubConfig {
            image_repo_override: "harbor.example.org/vre".into(),
            ..HubConfig::default()
        };
        let launch = SessionEnvironmentBuilder::new(&config).build(&state("/gcube/vre", "tok"), None);

        assert_eq!(launch.namespace.as_deref(), Some("dev+ns"));
        assert_eq!(launch.extra_labels["d4science-namespace"], "a%2Fb");
        assert_eq!(launch.extra_annotations[CONTEXT_ANNOTATION], "/gcube/vre");
        assert_eq!(launch.image, "harbor.example.org/vre/base-notebook:latest");
        assert!(launch.args.contains(&"--ServerApp.default_url=/lab".to_string()));
    }

    #[test]
    fn test_notebook_args_rstudio() {
        let args = notebook_args(Some("rname-RStudioServerOption"), "/lab");
        assert_eq!(args.len(), 6);
        assert_eq!(args[4], "--SingleUserNotebookApp.default_url=/rstudio");
        assert_eq!(args[5], "--ServerApp.default_url=/rstudio");
        assert_eq!(notebook_args(None, "/tree")[5], "--ServerApp.default_url=/tree");
    }

    #[test]
    fn test_volumes_need_mapping() {
        let config = HubConfig {
            volume_mappings: [(
                "Shared Data".to_string(),
                VolumeMapping {
                    mount_path: "/data/shared".into(),
                    volume: json!({"nfs": {"server": "nfs.example.org", "path": "/shared"}})
                        .as_object()
                        .cloned()
                        .unwrap(),
                },
            )]
            .into_iter()
            .collect(),
            ..HubConfig::default()
        };
        let permissions: IndexMap<String, VolumePermission> = [
            ("Shared Data".to_string(), VolumePermission::ReadOnly),
            ("Unmapped".to_string(), VolumePermission::ReadWrite),
        ]
        .into_iter()
        .collect();

        let (volumes, mounts) =
            SessionEnvironmentBuilder::new(&config).volumes(&permissions, &RoleSet::new());
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "shared-data");
        assert_eq!(
            serde_json::to_value(&volumes[0]).unwrap(),
            json!({"name": "shared-data", "nfs": {"server": "nfs.example.org", "path": "/shared"}})
        );
        assert_eq!(
            mounts,
            vec![VolumeMount {
                name: "shared-data".into(),
                mount_path: "/data/shared".into(),
                read_only: true,
            }]
        );

        let managers: RoleSet = ["Data-Manager"].into_iter().collect();
        let (_, mounts) = SessionEnvironmentBuilder::new(&config).volumes(&permissions, &managers);
        assert!(!mounts[0].read_only);
    }

    #[test]
    fn test_workspace_modes() {
        let mut config = HubConfig::default();
        let builder = SessionEnvironmentBuilder::new(&config);
        assert_eq!(builder.workspace(""), WorkspaceAccess::Disabled);

        let WorkspaceAccess::Sidecar { container } = builder.workspace("tok") else {
            panic!("expected sidecar");
        };
        assert_eq!(
            serde_json::to_value(&container).unwrap(),
            json!({
                "name": "workspace-sidecar",
                "image": "eginotebooks/d4science-storage",
                "securityContext": config.workspace.security_context,
                "env": [
                    {"name": "MNTPATH", "value": "/workspace"},
                    {"name": "D4SCIENCE_TOKEN", "value": "tok"},
                ],
                "volumeMounts": [
                    {"name": "workspace", "mountPath": "/workspace:shared", "readOnly": false},
                ],
                "lifecycle": {"preStop": {"exec": {"command": ["fusermount", "-uz", "/workspace"]}}},
            })
        );

        config.workspace.use_sidecar = false;
        let launch = SessionEnvironmentBuilder::new(&config).build(&state("/a/b", "tok"), None);
        assert!(launch.extra_containers().is_empty());
        assert_eq!(
            launch.container_security_context(),
            Some(&config.workspace.security_context)
        );
    }
}
