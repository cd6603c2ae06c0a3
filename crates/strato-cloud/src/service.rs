//! Uniform service contracts and capability facades
//!
//! All cloud backends implement these traits to provide a unified interface
//! for resource management. Every `get` returns `None` for an absent
//! resource instead of an error; every `find` returns a (possibly empty)
//! paged result, never an absent value.

use crate::error::Result;
use crate::page::PagedResult;
use crate::resource::{
    FloatingIp, Instance, KeyPair, MachineImage, MachineType, Network, Region, SecurityGroup,
    Snapshot, Volume,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Uniform parameters for launching an instance.
///
/// When `launch_config` is set it is passed to the backend verbatim and all
/// other fields except `zone` are ignored.
#[derive(Debug, Clone)]
pub struct InstanceLaunchSpec {
    pub name: String,

    /// Canonical reference of the boot image.
    pub image_id: String,

    /// Canonical reference of the machine type.
    pub machine_type_id: String,

    /// Canonical network reference; the backend default network when absent.
    pub network_id: Option<String>,

    pub zone: Option<String>,

    /// Security-group names to attach as instance tags.
    pub security_groups: Vec<String>,

    /// Whether the boot disk is deleted together with the instance.
    pub boot_disk_auto_delete: bool,

    /// Raw provider-native launch body, passed through verbatim.
    pub launch_config: Option<Value>,
}

impl InstanceLaunchSpec {
    pub fn new(
        name: impl Into<String>,
        image_id: impl Into<String>,
        machine_type_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image_id: image_id.into(),
            machine_type_id: machine_type_id.into(),
            network_id: None,
            zone: None,
            security_groups: Vec::new(),
            boot_disk_auto_delete: true,
            launch_config: None,
        }
    }
}

/// Parameters for creating a volume.
#[derive(Debug, Clone)]
pub struct VolumeSpec {
    /// Must be 1-63 characters and RFC1035-compliant.
    pub name: String,

    pub size_gb: u64,
    pub zone: Option<String>,

    /// Canonical reference of a snapshot to restore from.
    pub snapshot_id: Option<String>,

    pub description: Option<String>,
}

/// Parameters for snapshotting a volume.
#[derive(Debug, Clone)]
pub struct SnapshotSpec {
    pub name: String,

    /// Name of the source volume.
    pub volume: String,

    pub description: Option<String>,
}

#[async_trait]
pub trait InstanceService: Send + Sync {
    async fn get(&self, instance_id: &str) -> Result<Option<Instance>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Instance>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>)
        -> Result<PagedResult<Instance>>;
    async fn create(&self, spec: InstanceLaunchSpec) -> Result<Instance>;
    async fn delete(&self, instance_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn get(&self, image_id: &str) -> Result<Option<MachineImage>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineImage>>;
    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineImage>>;
}

#[async_trait]
pub trait VolumeService: Send + Sync {
    async fn get(&self, volume_id: &str) -> Result<Option<Volume>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Volume>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Volume>>;
    async fn create(&self, spec: VolumeSpec) -> Result<Volume>;
    async fn delete(&self, volume_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SnapshotService: Send + Sync {
    async fn get(&self, snapshot_id: &str) -> Result<Option<Snapshot>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Snapshot>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>)
        -> Result<PagedResult<Snapshot>>;
    async fn create(&self, spec: SnapshotSpec) -> Result<Snapshot>;
    async fn delete(&self, snapshot_id: &str) -> Result<()>;
}

#[async_trait]
pub trait NetworkService: Send + Sync {
    async fn get(&self, network_id: &str) -> Result<Option<Network>>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Network>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Network>>;

    /// Idempotent by name: an existing network with the same name is
    /// returned instead of creating a duplicate.
    async fn create(&self, name: &str) -> Result<Network>;

    async fn floating_ips(&self, region: Option<&str>) -> Result<Vec<FloatingIp>>;
    async fn create_floating_ip(&self, region: Option<&str>) -> Result<FloatingIp>;
}

#[async_trait]
pub trait RegionService: Send + Sync {
    async fn get(&self, region_id: &str) -> Result<Option<Region>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Region>>;

    /// The region the provider is configured for.
    async fn current(&self) -> Result<Option<Region>>;
}

#[async_trait]
pub trait MachineTypeService: Send + Sync {
    async fn get(&self, machine_type_id: &str) -> Result<Option<MachineType>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineType>>;
    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineType>>;

    /// Match machine types on arbitrary backend attributes. An attribute key
    /// the backend does not report is an `InvalidArgument` error.
    async fn find_by(&self, filters: &[(String, Value)]) -> Result<Vec<MachineType>>;
}

#[async_trait]
pub trait KeyPairService: Send + Sync {
    async fn get(&self, key_pair_id: &str) -> Result<Option<KeyPair>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<KeyPair>>;
    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<KeyPair>>;

    /// Idempotent: an existing key pair with the same name is returned
    /// unchanged and nothing is written.
    async fn create(&self, name: &str) -> Result<KeyPair>;

    async fn delete(&self, key_pair_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SecurityGroupService: Send + Sync {
    async fn get(&self, group_id: &str) -> Result<Option<SecurityGroup>>;
    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<SecurityGroup>>;
    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<SecurityGroup>>;
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        network_id: Option<&str>,
    ) -> Result<SecurityGroup>;
    async fn delete(&self, group_id: &str) -> Result<()>;

    /// Find non-empty groups by network name and group names.
    async fn find_by_network_and_tags(
        &self,
        network_name: &str,
        tags: &[String],
    ) -> Result<Vec<SecurityGroup>>;
}

/// Compute capability bundle.
#[derive(Clone)]
pub struct ComputeServices {
    pub images: Arc<dyn ImageService>,
    pub machine_types: Arc<dyn MachineTypeService>,
    pub instances: Arc<dyn InstanceService>,
    pub regions: Arc<dyn RegionService>,
}

/// Block storage capability bundle.
#[derive(Clone)]
pub struct BlockStoreServices {
    pub volumes: Arc<dyn VolumeService>,
    pub snapshots: Arc<dyn SnapshotService>,
}

/// Security capability bundle.
#[derive(Clone)]
pub struct SecurityServices {
    pub key_pairs: Arc<dyn KeyPairService>,
    pub security_groups: Arc<dyn SecurityGroupService>,
}
