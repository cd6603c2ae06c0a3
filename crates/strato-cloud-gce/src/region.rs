//! Region service

use crate::api::{ComputeApi, ListRequest, Scope, iter_all, parse_items};
use crate::error::GceError;
use async_trait::async_trait;
use std::sync::Arc;
use strato_cloud::{CloudError, PagedResult, Region, RegionService, Result};

const REGIONS: &str = "regions";

pub struct GceRegionService {
    api: Arc<dyn ComputeApi>,
    region: String,
}

impl GceRegionService {
    pub fn new(api: Arc<dyn ComputeApi>, region: impl Into<String>) -> Self {
        Self {
            api,
            region: region.into(),
        }
    }
}

#[async_trait]
impl RegionService for GceRegionService {
    async fn get(&self, region_id: &str) -> Result<Option<Region>> {
        // A region id that fails the backend's name pattern is reported as
        // a bad request; for lookups both cases mean "no such region".
        match self.api.get(&Scope::Global, REGIONS, region_id).await {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(GceError::NotFound(_)) | Err(GceError::InvalidArgument(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Region>> {
        let raw = iter_all(self.api.as_ref(), ListRequest::new(Scope::Global, REGIONS))
            .await
            .map_err(CloudError::from)?;
        PagedResult::from_full_list(parse_items(raw)?, limit, marker)
    }

    async fn current(&self) -> Result<Option<Region>> {
        self.get(&self.region).await
    }
}
