//! Resource value objects
//!
//! Pure data holders for the uniform resource model. Every resource carries
//! the backend's canonical absolute reference (a URL-shaped string) as its
//! `id`; id equality implies identity, name equality does not, since names
//! are not unique backend-wide across zones or projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A virtual machine instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    /// Canonical resource reference.
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,

    /// Backend lifecycle status (e.g. `RUNNING`, `TERMINATED`).
    pub status: Option<String>,

    /// Canonical reference of the hosting zone.
    pub zone: Option<String>,

    /// Canonical reference of the machine type.
    pub machine_type: Option<String>,

    pub creation_timestamp: Option<DateTime<Utc>>,

    /// Free-form labels; doubles as security-group membership.
    pub tags: InstanceTags,
}

/// Tag block attached to an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceTags {
    pub items: Vec<String>,
    pub fingerprint: Option<String>,
}

/// A machine image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineImage {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// A block-storage volume (a persistent disk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,

    /// Size in gigabytes; the backend reports it as a decimal string.
    pub size_gb: Option<String>,

    pub zone: Option<String>,
    pub status: Option<String>,
    pub source_snapshot: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// A point-in-time snapshot of a volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,
    pub status: Option<String>,
    pub source_disk: Option<String>,
    pub description: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// A virtual network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Network {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,
    pub auto_create_subnetworks: Option<bool>,
    pub description: Option<String>,
}

/// A geographic region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Region {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,
    pub status: Option<String>,

    /// Canonical references of the zones in this region.
    pub zones: Vec<String>,
}

/// A machine type (instance sizing profile).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineType {
    #[serde(rename = "selfLink")]
    pub id: String,

    pub name: String,
    pub guest_cpus: Option<u32>,
    pub memory_mb: Option<u64>,
    pub zone: Option<String>,
}

/// A static external IP address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FloatingIp {
    #[serde(rename = "selfLink")]
    pub id: String,

    /// Backend-assigned numeric identifier, matched against an operation's
    /// `targetId` when resolving a freshly created address.
    #[serde(rename = "id")]
    pub resource_id: String,

    pub name: String,
    pub address: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
}

/// An SSH key pair.
///
/// Records live only inside the project's shared metadata document; the id
/// is a deterministic content hash of the public key, so the same key
/// material resolves to the same id in every process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    pub public_key: Option<String>,

    /// Private key material, populated exactly once on creation and never
    /// persisted server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_material: Option<String>,
}

/// A security group emulated over per-network firewall rules.
///
/// Identity is the composite `(tag, network)`; the group exists exactly as
/// long as at least one firewall rule references that pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Composite id, `<tag>:<network-name>`.
    pub id: String,

    /// The tag acting as the group name.
    pub name: String,

    /// Canonical reference of the owning network.
    pub network_id: String,

    pub description: Option<String>,

    /// Projection of all firewall rules referencing the group's tag within
    /// its network, in backend order.
    pub rules: Vec<FirewallRuleView>,
}

/// One firewall rule, projected into the group rule model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallRuleView {
    /// Canonical reference of the underlying firewall rule.
    pub id: String,

    pub name: String,
    pub direction: Option<String>,
    pub protocol: Option<String>,

    /// `"<from>-<to>"` or a single port; absent means all ports.
    pub port_range: Option<String>,

    pub source_tags: Vec<String>,
    pub source_ranges: Vec<String>,

    /// The tag this rule targets (the group name).
    pub target_tag: String,

    /// Canonical reference of the rule's network.
    pub network: String,
}
