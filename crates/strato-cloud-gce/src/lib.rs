//! Google Compute Engine backend for the Strato cloud model
//!
//! Adapts the Compute Engine v1 API to the uniform resource services of
//! `strato-cloud`. The wire is reached only through the `ComputeApi`
//! collaborator, so every service (and every test) can run against a fake
//! backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 strato-cloud                    │
//! │   uniform services, resources, paged results    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               strato-cloud-gce                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │             GceProvider                  │   │
//! │  │  compute / block_store / security        │   │
//! │  └──────┬──────────┬──────────┬─────────────┘   │
//! │  ┌──────▼────┐ ┌───▼──────┐ ┌─▼─────────────┐   │
//! │  │ operation │ │ metadata │ │   firewall    │   │
//! │  │  waiter   │ │  store   │ │   delegate    │   │
//! │  └──────┬────┘ └───┬──────┘ └─┬─────────────┘   │
//! │         └──────────┼──────────┘                 │
//! │              ┌─────▼──────┐                     │
//! │              │ ComputeApi │  (trait)            │
//! │              └─────┬──────┘                     │
//! └────────────────────┼────────────────────────────┘
//!                      │
//!              ┌───────▼────────┐
//!              │ RestComputeApi │
//!              │  (reqwest)     │
//!              └────────────────┘
//! ```

pub mod api;
pub mod blockstore;
pub mod error;
pub mod firewall;
pub mod image;
pub mod instance;
pub mod keypair;
pub mod machine_type;
pub mod metadata;
pub mod network;
pub mod operation;
pub mod provider;
pub mod region;
pub mod rest;

// Re-exports
pub use api::{ComputeApi, ListPage, ListRequest, Scope, iter_all, resource_short_name};
pub use blockstore::{GceSnapshotService, GceVolumeService};
pub use error::{GceError, GceResult};
pub use firewall::{FirewallDelegate, FirewallRuleSpec, GceSecurityGroupService};
pub use image::{GceImageService, ImageCache, PUBLIC_IMAGE_PROJECTS};
pub use instance::GceInstanceService;
pub use keypair::{GceKeyPairService, KeyRecord, SSH_KEYS_KEY};
pub use machine_type::GceMachineTypeService;
pub use metadata::{CommonMetadata, MetadataItem, MetadataStore};
pub use network::GceNetworkService;
pub use operation::OperationWaiter;
pub use provider::{GceConfig, GceProvider};
pub use region::GceRegionService;
pub use rest::RestComputeApi;
