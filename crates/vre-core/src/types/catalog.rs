//! Typed resource catalog entries
//!
//! The directory service describes launchable server options and mountable
//! volumes in one loosely-shaped document. These types are the validated
//! projection of that document; anything that does not fit is reported as a
//! [`SkippedEntry`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory amount as declared by the catalog, e.g. `8` + `Gi`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAmount {
    /// Numeric part, kept verbatim
    pub value: String,
    /// Unit suffix, e.g. `Gi`
    pub unit: String,
}

impl fmt::Display for MemoryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// CPU cores as declared by the catalog, e.g. `2.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuAmount {
    /// Text as written in the catalog
    pub raw: String,
    /// Parsed core count, finite and positive
    pub cores: f64,
}

impl CpuAmount {
    /// Parse a catalog core count. `None` unless it is a finite positive number.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let cores = raw.parse::<f64>().ok()?;
        (cores.is_finite() && cores > 0.0).then(|| Self {
            raw: raw.to_string(),
            cores,
        })
    }
}

impl fmt::Display for CpuAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A launchable server flavour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOption {
    /// Resource name checked against the granted permissions
    pub auth_id: String,
    /// Human-readable name
    pub display_name: String,
    /// Free-form description
    pub description: String,
    /// Option-type name from the profile, e.g. `RStudioServerOption`
    pub catalog_name: String,
    /// Role required to see this option, if any
    pub role: Option<String>,
    /// Container image to launch
    pub image: Option<String>,
    /// CPU cores to allocate
    pub cpu_cores: Option<CpuAmount>,
    /// Memory to allocate
    pub memory: Option<MemoryAmount>,
    /// Whether GPU scheduling was requested
    pub gpu_requested: bool,
    /// Whether this is the context's default option
    pub is_default: bool,
}

/// Access mode of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumePermission {
    /// Mounted read-only
    ReadOnly,
    /// Mounted read-write
    ReadWrite,
}

impl VolumePermission {
    /// Parse the catalog spelling (`Read-Only` / `Read-Write`)
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim() {
            "Read-Write" => Some(Self::ReadWrite),
            "Read-Only" => Some(Self::ReadOnly),
            _ => None,
        }
    }

    /// Whether writes are allowed
    pub fn is_read_write(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// A volume the context exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeOption {
    /// Catalog name of the volume
    pub name: String,
    /// Access mode the catalog grants
    pub permission: VolumePermission,
}

/// One validated catalog resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    /// Launchable server option
    Server(ServerOption),
    /// Mountable volume
    Volume(VolumeOption),
}

/// A catalog resource that was dropped during parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Position of the resource in the document
    pub index: usize,
    /// Why it was dropped
    pub reason: String,
}

/// Outcome of parsing one catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogParse {
    /// Entries that passed validation, in document order
    pub entries: Vec<CatalogEntry>,
    /// Entries that did not
    pub skipped: Vec<SkippedEntry>,
}

impl CatalogParse {
    /// Catalog with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    /// Server options in document order
    pub fn server_options(&self) -> impl Iterator<Item = &ServerOption> {
        self.entries.iter().filter_map(|entry| match entry {
            CatalogEntry::Server(option) => Some(option),
            CatalogEntry::Volume(_) => None,
        })
    }

    /// Volume options in document order
    pub fn volume_options(&self) -> impl Iterator<Item = &VolumeOption> {
        self.entries.iter().filter_map(|entry| match entry {
            CatalogEntry::Volume(option) => Some(option),
            CatalogEntry::Server(_) => None,
        })
    }
}
