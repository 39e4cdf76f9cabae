//! Projection of directory service documents into typed values
//!
//! A catalog document looks like
//!
//! ```text
//! genericResources
//! └── Resource (one or many)
//!     └── Profile
//!         ├── Name          option-type name, e.g. RStudioServerOption
//!         └── Body
//!             └── ServerOption | VolumeOption
//! ```
//!
//! Each resource is projected on its own. A resource that does not fit is
//! recorded as a [`SkippedEntry`] and the rest of the document is still used.

use crate::document::{parse_document, XmlNode};
use vre_core::{
    CatalogEntry, CatalogParse, CpuAmount, MemoryAmount, ServerOption, SkippedEntry, VolumeOption,
    VolumePermission,
};

/// Root element of a catalog document
pub const CATALOG_ROOT: &str = "genericResources";
/// Root element of a service-endpoint document
pub const ENDPOINTS_ROOT: &str = "serviceEndpoints";
/// Entry name of the access point that exposes the compute endpoint
pub const COMPUTE_ENTRY_NAME: &str = "Cluster";

/// Parse a catalog document.
///
/// Malformed XML or a document that is not a catalog yields an empty result,
/// never an error.
pub fn parse_catalog(xml: &str) -> CatalogParse {
    let root = match parse_document(xml) {
        Ok(root) => root,
        Err(reason) => {
            tracing::warn!(%reason, "catalog document is not well-formed, treating as empty");
            return CatalogParse::empty();
        }
    };
    if root.name != CATALOG_ROOT {
        tracing::warn!(root = %root.name, "unexpected catalog root element, treating as empty");
        return CatalogParse::empty();
    }

    let mut parse = CatalogParse::empty();
    for (index, resource) in root.children_named("Resource").enumerate() {
        match project_resource(resource) {
            Ok(entry) => parse.entries.push(entry),
            Err(reason) => {
                tracing::warn!(index, %reason, "skipping catalog entry");
                parse.skipped.push(SkippedEntry { index, reason });
            }
        }
    }
    tracing::debug!(
        entries = parse.entries.len(),
        skipped = parse.skipped.len(),
        "catalog parsed"
    );
    parse
}

fn project_resource(resource: &XmlNode) -> Result<CatalogEntry, String> {
    let profile = resource
        .child("Profile")
        .ok_or("resource has no Profile")?;
    let body = profile.child("Body").ok_or("profile has no Body")?;

    if let Some(option) = body.child("ServerOption") {
        let catalog_name = profile.child_text("Name").unwrap_or_default();
        project_server_option(option, catalog_name).map(CatalogEntry::Server)
    } else if let Some(volume) = body.child("VolumeOption") {
        project_volume_option(volume).map(CatalogEntry::Volume)
    } else {
        Err("body holds neither ServerOption nor VolumeOption".to_string())
    }
}

fn project_server_option(node: &XmlNode, catalog_name: &str) -> Result<ServerOption, String> {
    let auth_id = node
        .child_text("AuthId")
        .ok_or("ServerOption has no AuthId")?;
    let info = node.child("Info");
    let info_text = |name: &str| {
        info.and_then(|info| info.child_text(name))
            .unwrap_or_default()
            .to_string()
    };

    let cut = node.child("Cut");
    let cpu_cores = match cut.and_then(|cut| cut.child_text("Cores")) {
        Some(cores) => Some(
            CpuAmount::parse(cores)
                .ok_or_else(|| format!("{auth_id}: invalid core count {cores:?}"))?,
        ),
        None => None,
    };
    let memory = match cut.and_then(|cut| cut.child("Memory")) {
        Some(memory) => {
            let value = memory.text();
            let unit = memory.attr("unit").map(str::trim).unwrap_or_default();
            if value.is_empty() || unit.is_empty() {
                return Err(format!("{auth_id}: Memory needs a value and a unit"));
            }
            Some(MemoryAmount {
                value: value.to_string(),
                unit: unit.to_string(),
            })
        }
        None => None,
    };

    Ok(ServerOption {
        auth_id: auth_id.to_string(),
        display_name: info_text("Name"),
        description: info_text("Description"),
        catalog_name: catalog_name.to_string(),
        role: node
            .attr("role")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        image: node.child_text("ImageId").map(str::to_string),
        cpu_cores,
        memory,
        gpu_requested: node.attr("gpu") == Some("true"),
        is_default: node.attr("default") == Some("true"),
    })
}

fn project_volume_option(node: &XmlNode) -> Result<VolumeOption, String> {
    let name = node.child_text("Name").ok_or("VolumeOption has no Name")?;
    let raw = node.child_text("Permission").unwrap_or_default();
    let permission = VolumePermission::from_catalog(raw)
        .ok_or_else(|| format!("volume {name}: unknown permission {raw:?}"))?;
    Ok(VolumeOption {
        name: name.to_string(),
        permission,
    })
}

/// Extract the compute endpoint from a service-endpoint document.
///
/// Looks at every access point whose interface endpoint carries the entry
/// name `Cluster`; when several do, the last one wins.
pub fn parse_compute_endpoint(xml: &str) -> Option<String> {
    let root = match parse_document(xml) {
        Ok(root) => root,
        Err(reason) => {
            tracing::warn!(%reason, "service endpoint document is not well-formed");
            return None;
        }
    };
    if root.name != ENDPOINTS_ROOT {
        tracing::warn!(root = %root.name, "unexpected service endpoint root element");
        return None;
    }

    root.children_named("Resource")
        .filter_map(|resource| resource.child("Profile"))
        .flat_map(|profile| profile.children_named("AccessPoint"))
        .filter_map(|ap| ap.child("Interface")?.child("Endpoint"))
        .filter(|endpoint| endpoint.attr("EntryName") == Some(COMPUTE_ENTRY_NAME))
        .filter_map(|endpoint| Some(endpoint.text()).filter(|url| !url.is_empty()))
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vre_testkit::{service_endpoints_xml, CatalogXml, ServerOptionXml};

    #[test]
    fn test_projects_server_option() {
        let xml = CatalogXml::new()
            .server_option(
                ServerOptionXml::new("lab-8", "Lab large")
                    .catalog_name("RStudioServerOption")
                    .role("foo-role")
                    .image("registry.example.org/d4science/lab:1.2")
                    .cores("8")
                    .memory("16", "Gi")
                    .gpu("true")
                    .default_option(),
            )
            .build();

        let parse = parse_catalog(&xml);
        assert!(parse.skipped.is_empty());
        let option = parse.server_options().next().unwrap();
        assert_eq!(option.auth_id, "lab-8");
        assert_eq!(option.display_name, "Lab large");
        assert_eq!(option.description, "Lab large environment");
        assert_eq!(option.catalog_name, "RStudioServerOption");
        assert_eq!(option.role.as_deref(), Some("foo-role"));
        assert_eq!(option.image.as_deref(), Some("registry.example.org/d4science/lab:1.2"));
        assert_eq!(option.cpu_cores.as_ref().map(|c| c.cores), Some(8.0));
        assert_eq!(option.memory.as_ref().map(ToString::to_string).as_deref(), Some("16Gi"));
        assert!(option.gpu_requested);
        assert!(option.is_default);
    }

    #[test]
    fn test_core_count_text_is_kept() {
        let xml = CatalogXml::new()
            .server_option(ServerOptionXml::new("a", "A").cores("2.0"))
            .server_option(ServerOptionXml::new("b", "B").cores("0.50"))
            .build();
        let cores: Vec<_> = parse_catalog(&xml)
            .server_options()
            .map(|o| o.cpu_cores.as_ref().unwrap().raw.clone())
            .collect();
        assert_eq!(cores, vec!["2.0", "0.50"]);
    }

    #[test]
    fn test_flags_require_literal_true() {
        let xml = CatalogXml::new()
            .server_option(ServerOptionXml::new("a", "A").gpu("True"))
            .server_option(ServerOptionXml::new("b", "B").gpu("1"))
            .build();
        assert!(parse_catalog(&xml).server_options().all(|o| !o.gpu_requested));
    }

    #[test]
    fn test_empty_role_attribute_is_no_role() {
        let xml = CatalogXml::new()
            .server_option(ServerOptionXml::new("a", "A").role(""))
            .build();
        assert_eq!(parse_catalog(&xml).server_options().next().unwrap().role, None);
    }

    #[test]
    fn test_volume_options() {
        let xml = CatalogXml::new()
            .volume("Shared Data", "Read-Write")
            .volume("Archive", "Read-Only")
            .volume("Odd", "Write-Only")
            .build();

        let parse = parse_catalog(&xml);
        let volumes: Vec<_> = parse.volume_options().collect();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "Shared Data");
        assert_eq!(volumes[0].permission, VolumePermission::ReadWrite);
        assert_eq!(volumes[1].permission, VolumePermission::ReadOnly);
        assert_eq!(parse.skipped.len(), 1);
        assert_eq!(parse.skipped[0].index, 2);
    }

    #[test]
    fn test_bad_entries_are_skipped_individually() {
        let xml = CatalogXml::new()
            .server_option(ServerOptionXml::new("good", "Good"))
            .server_option(ServerOptionXml::new("bad-cores", "Bad").cores("lots"))
            .raw_resource("<Resource><ID>x</ID></Resource>")
            .raw_resource("<Resource><Profile><Name>Other</Name><Body><Thing/></Body></Profile></Resource>")
            .server_option(ServerOptionXml::new("", "No auth id"))
            .build();

        let parse = parse_catalog(&xml);
        assert_eq!(parse.entries.len(), 1);
        let skipped: Vec<usize> = parse.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3, 4]);
        assert!(parse.skipped[1].reason.contains("Profile"));
    }

    #[test]
    fn test_unusable_documents_are_empty() {
        assert_eq!(parse_catalog("<genericResources>"), CatalogParse::empty());
        assert_eq!(parse_catalog("<other><Resource/></other>"), CatalogParse::empty());
        assert_eq!(parse_catalog("<genericResources/>"), CatalogParse::empty());
        assert_eq!(parse_catalog(""), CatalogParse::empty());
    }

    #[test]
    fn test_compute_endpoint_last_cluster_wins() {
        let xml = service_endpoints_xml(&[
            ("Cluster", "https://dm1.example.org/wps"),
            ("GetCapabilities", "https://dm.example.org/caps"),
            ("Cluster", "https://dm2.example.org/wps"),
        ]);
        assert_eq!(
            parse_compute_endpoint(&xml).as_deref(),
            Some("https://dm2.example.org/wps")
        );
    }

    #[test]
    fn test_compute_endpoint_absent() {
        let xml = service_endpoints_xml(&[("GetCapabilities", "https://dm.example.org/caps")]);
        assert_eq!(parse_compute_endpoint(&xml), None);
        assert_eq!(parse_compute_endpoint("<serviceEndpoints/>"), None);
        assert_eq!(parse_compute_endpoint("garbage"), None);
    }
}
