//! Provider assembly
//!
//! Wires the backend collaborator, the shared metadata store and the
//! resource services into the capability facades. Every service holds the
//! same `Arc<dyn ComputeApi>`, so a test can swap the whole backend by
//! injecting a fake collaborator here.

use crate::api::ComputeApi;
use crate::firewall::{FirewallDelegate, GceSecurityGroupService};
use crate::image::{GceImageService, ImageCache};
use crate::instance::GceInstanceService;
use crate::keypair::GceKeyPairService;
use crate::machine_type::GceMachineTypeService;
use crate::metadata::MetadataStore;
use crate::network::GceNetworkService;
use crate::region::GceRegionService;
use crate::rest::RestComputeApi;
use crate::blockstore::{GceSnapshotService, GceVolumeService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strato_cloud::{
    BlockStoreServices, CloudError, ComputeServices, NetworkService, Result, RetryConfig,
    SecurityServices,
};

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GceConfig {
    pub project: String,

    /// Default placement zone, e.g. `us-central1-a`.
    pub zone: String,

    /// Default region; derived from the zone when absent.
    pub region: Option<String>,

    #[serde(skip)]
    pub retry: RetryConfig,
}

impl GceConfig {
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            region: None,
            retry: RetryConfig::default(),
        }
    }

    /// The effective region: explicit, or the zone with its suffix letter
    /// dropped (`us-central1-a` -> `us-central1`).
    pub fn region(&self) -> Result<String> {
        if let Some(region) = &self.region {
            return Ok(region.clone());
        }
        match self.zone.rsplit_once('-') {
            Some((region, _)) if !region.is_empty() => Ok(region.to_string()),
            _ => Err(CloudError::InvalidArgument(format!(
                "cannot derive a region from zone: {}",
                self.zone
            ))),
        }
    }
}

/// The assembled provider: one backend collaborator, three capability
/// facades.
#[derive(Clone)]
pub struct GceProvider {
    api: Arc<dyn ComputeApi>,
    compute: ComputeServices,
    block_store: BlockStoreServices,
    security: SecurityServices,
    networks: Arc<dyn NetworkService>,
    image_cache: Arc<ImageCache>,
}

impl GceProvider {
    /// Assemble the provider over a ready collaborator.
    pub fn new(config: &GceConfig, api: Arc<dyn ComputeApi>) -> Result<Self> {
        let region = config.region()?;
        let retry = config.retry.clone();

        let image_cache = Arc::new(ImageCache::new());
        let store = MetadataStore::new(api.clone(), retry.clone());

        let networks: Arc<dyn NetworkService> = Arc::new(GceNetworkService::new(
            api.clone(),
            region.clone(),
            retry.clone(),
        ));

        let compute = ComputeServices {
            images: Arc::new(GceImageService::new(api.clone(), image_cache.clone())),
            machine_types: Arc::new(GceMachineTypeService::new(api.clone(), config.zone.clone())),
            instances: Arc::new(GceInstanceService::new(
                api.clone(),
                config.zone.clone(),
                retry.clone(),
            )),
            regions: Arc::new(GceRegionService::new(api.clone(), region)),
        };

        let block_store = BlockStoreServices {
            volumes: Arc::new(GceVolumeService::new(
                api.clone(),
                config.zone.clone(),
                retry.clone(),
            )),
            snapshots: Arc::new(GceSnapshotService::new(
                api.clone(),
                config.zone.clone(),
                retry.clone(),
            )),
        };

        let security = SecurityServices {
            key_pairs: Arc::new(GceKeyPairService::new(store)),
            security_groups: Arc::new(GceSecurityGroupService::new(
                FirewallDelegate::new(api.clone(), retry),
                networks.clone(),
            )),
        };

        Ok(Self {
            api,
            compute,
            block_store,
            security,
            networks,
            image_cache,
        })
    }

    /// Assemble the provider over the live REST backend.
    pub fn connect(config: &GceConfig, token: impl Into<String>) -> Result<Self> {
        let api = RestComputeApi::new(config.project.clone(), token)
            .map_err(CloudError::from)?;
        Self::new(config, Arc::new(api))
    }

    pub fn project(&self) -> &str {
        self.api.project()
    }

    pub fn compute(&self) -> &ComputeServices {
        &self.compute
    }

    pub fn block_store(&self) -> &BlockStoreServices {
        &self.block_store
    }

    pub fn security(&self) -> &SecurityServices {
        &self.security
    }

    pub fn networks(&self) -> &Arc<dyn NetworkService> {
        &self.networks
    }

    /// Drop the cached public-image tier.
    pub async fn invalidate_image_cache(&self) {
        self.image_cache.invalidate().await;
    }
}
