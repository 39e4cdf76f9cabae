//! Launch profiles handed to the host platform
//!
//! Field names on the wire (`display_name`, `slug`, `kubespawner_override`,
//! `default`, ...) are a contract with the host platform and must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Scheduling additions for GPU servers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuOverride {
    /// Node labels the session must be scheduled on
    pub node_selector: BTreeMap<String, String>,
    /// Extra resource requests, e.g. `nvidia.com/gpu: 1`
    pub extra_resource_guarantees: BTreeMap<String, Value>,
    /// Extra resource limits
    pub extra_resource_limits: BTreeMap<String, Value>,
}

/// Per-profile overrides of the host's launch settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    /// Container image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// CPU cores the session may use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<f64>,
    /// CPU cores reserved for the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_guarantee: Option<u32>,
    /// Memory limit, e.g. `16Gi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    /// Node labels, set for GPU profiles
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    /// Device requests
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_resource_guarantees: BTreeMap<String, Value>,
    /// Device limits
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_resource_limits: BTreeMap<String, Value>,
    /// Anything else a statically configured profile sets (command, volumes, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileOverrides {
    /// Merge a GPU override block into these overrides
    pub fn apply_gpu(&mut self, gpu: &GpuOverride) {
        self.node_selector.extend(gpu.node_selector.clone());
        self.extra_resource_guarantees
            .extend(gpu.extra_resource_guarantees.clone());
        self.extra_resource_limits
            .extend(gpu.extra_resource_limits.clone());
    }

    /// Whether the profile requests GPU devices
    pub fn has_gpu(&self) -> bool {
        !self.extra_resource_limits.is_empty()
    }
}

/// One entry of the profile list offered to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchProfile {
    /// Name shown in the launch form
    pub display_name: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Stable identifier; the server option's `AuthId`
    pub slug: String,
    /// Launch settings this profile changes
    #[serde(rename = "kubespawner_override", default)]
    pub overrides: ProfileOverrides,
    /// Preselected in the launch form
    #[serde(rename = "default", default)]
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_profile_keeps_unknown_overrides() {
        let profile: LaunchProfile = serde_json::from_value(json!({
            "display_name": "WITOIL",
            "description": "WITOIL environment",
            "slug": "clone_wars",
            "kubespawner_override": {
                "image": "pokapok/clone_wars:latest",
                "command": ["/app/launchers/start-app.sh"]
            },
            "default": false
        }))
        .unwrap();

        assert_eq!(profile.overrides.image.as_deref(), Some("pokapok/clone_wars:latest"));
        assert_eq!(
            profile.overrides.extra.get("command"),
            Some(&json!(["/app/launchers/start-app.sh"]))
        );

        let round = serde_json::to_value(&profile).unwrap();
        assert_eq!(round["kubespawner_override"]["command"][0], "/app/launchers/start-app.sh");
        assert!(round["kubespawner_override"].get("cpu_limit").is_none());
    }

    #[test]
    fn test_cpu_guarantee_is_whole_cores() {
        let overrides = ProfileOverrides {
            cpu_limit: Some(2.5),
            cpu_guarantee: Some(1),
            ..ProfileOverrides::default()
        };
        let value = serde_json::to_value(&overrides).unwrap();
        assert_eq!(value, json!({"cpu_limit": 2.5, "cpu_guarantee": 1}));
        assert!(value["cpu_guarantee"].is_u64());
    }

    #[test]
    fn test_gpu_merge() {
        let mut overrides = ProfileOverrides::default();
        let gpu = GpuOverride {
            node_selector: [("pool".to_string(), "gpu".to_string())].into(),
            extra_resource_guarantees: [("nvidia.com/gpu".to_string(), json!(1))].into(),
            extra_resource_limits: [("nvidia.com/gpu".to_string(), json!(1))].into(),
        };
        overrides.apply_gpu(&gpu);
        assert!(overrides.has_gpu());
        assert_eq!(overrides.node_selector["pool"], "gpu");
    }
}
