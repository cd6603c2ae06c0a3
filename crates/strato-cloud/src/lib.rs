//! Strato Cloud Infrastructure
//!
//! This crate provides the provider-agnostic cloud abstraction for Strato:
//! a uniform resource model client code can target while running against
//! heterogeneous backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  client code                     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                strato-cloud                      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │       Uniform service contracts           │   │
//! │  │  trait InstanceService, KeyPairService…   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ PagedResult  │  │  CloudError  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  gce backend  │
//! │   adapter     │
//! └───────────────┘
//! ```

pub mod error;
pub mod page;
pub mod resource;
pub mod retry;
pub mod service;

// Re-exports
pub use error::{CloudError, Result};
pub use page::{MAX_PAGE_SIZE, PagedResult, clamp_limit};
pub use resource::{
    FirewallRuleView, FloatingIp, Instance, InstanceTags, KeyPair, MachineImage, MachineType,
    Network, Region, SecurityGroup, Snapshot, Volume,
};
pub use retry::RetryConfig;
pub use service::{
    BlockStoreServices, ComputeServices, ImageService, InstanceLaunchSpec, InstanceService,
    KeyPairService, MachineTypeService, NetworkService, RegionService, SecurityGroupService,
    SecurityServices, SnapshotService, SnapshotSpec, VolumeService, VolumeSpec,
};
