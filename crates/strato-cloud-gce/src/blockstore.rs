//! Volume and snapshot services
//!
//! Volumes are zonal persistent disks; snapshots are global. Both use
//! server-side pagination for listings and wait out the backend operation
//! before resolving the created resource.

use crate::api::{ComputeApi, ListRequest, Scope, parse_items, resource_short_name};
use crate::error::GceError;
use crate::operation::OperationWaiter;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use strato_cloud::{
    CloudError, PagedResult, Result, RetryConfig, Snapshot, SnapshotService, SnapshotSpec, Volume,
    VolumeService, VolumeSpec, clamp_limit,
};

const DISKS: &str = "disks";
const SNAPSHOTS: &str = "snapshots";

pub struct GceVolumeService {
    api: Arc<dyn ComputeApi>,
    zone: String,
    retry: RetryConfig,
}

impl GceVolumeService {
    pub fn new(api: Arc<dyn ComputeApi>, zone: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            api,
            zone: zone.into(),
            retry,
        }
    }

    fn scope(&self, zone: Option<&str>) -> Scope {
        Scope::Zone(zone.unwrap_or(&self.zone).to_string())
    }

    async fn paged(
        &self,
        filter: Option<String>,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Volume>> {
        let mut request =
            ListRequest::new(self.scope(None), DISKS).with_page(clamp_limit(limit), marker);
        request.filter = filter;

        let page = self.api.list(request).await.map_err(CloudError::from)?;
        Ok(PagedResult::from_server_page(
            parse_items(page.items)?,
            page.next_page_token,
        ))
    }
}

#[async_trait]
impl VolumeService for GceVolumeService {
    async fn get(&self, volume_id: &str) -> Result<Option<Volume>> {
        match self.api.get_by_url(volume_id).await {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(GceError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Volume>> {
        self.paged(Some(format!("name eq {name}")), limit, marker)
            .await
    }

    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Volume>> {
        self.paged(None, limit, marker).await
    }

    async fn create(&self, spec: VolumeSpec) -> Result<Volume> {
        let zone = spec.zone.clone().unwrap_or_else(|| self.zone.clone());
        let body = json!({
            "name": spec.name,
            "sizeGb": spec.size_gb.to_string(),
            "type": format!("zones/{zone}/diskTypes/pd-standard"),
            "sourceSnapshot": spec.snapshot_id,
            "description": spec.description,
        });

        tracing::info!("creating volume {} ({} GB)", spec.name, spec.size_gb);
        let operation = self
            .api
            .insert(&Scope::Zone(zone), DISKS, body)
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        let done = waiter.wait(&operation).await?;

        let target = done
            .get("targetLink")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CloudError::OperationFailed("volume operation reported no target".to_string())
            })?;
        self.get(target).await?.ok_or_else(|| {
            CloudError::OperationFailed(format!("volume {target} missing after create"))
        })
    }

    async fn delete(&self, volume_id: &str) -> Result<()> {
        let name = resource_short_name(volume_id);
        tracing::info!("deleting volume {}", name);
        let operation = self
            .api
            .delete(&self.scope(None), DISKS, name)
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        waiter.wait(&operation).await?;
        Ok(())
    }
}

pub struct GceSnapshotService {
    api: Arc<dyn ComputeApi>,
    zone: String,
    retry: RetryConfig,
}

impl GceSnapshotService {
    pub fn new(api: Arc<dyn ComputeApi>, zone: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            api,
            zone: zone.into(),
            retry,
        }
    }

    async fn paged(
        &self,
        filter: Option<String>,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Snapshot>> {
        let mut request =
            ListRequest::new(Scope::Global, SNAPSHOTS).with_page(clamp_limit(limit), marker);
        request.filter = filter;

        let page = self.api.list(request).await.map_err(CloudError::from)?;
        Ok(PagedResult::from_server_page(
            parse_items(page.items)?,
            page.next_page_token,
        ))
    }
}

#[async_trait]
impl SnapshotService for GceSnapshotService {
    async fn get(&self, snapshot_id: &str) -> Result<Option<Snapshot>> {
        match self.api.get_by_url(snapshot_id).await {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(GceError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Snapshot>> {
        self.paged(Some(format!("name eq {name}")), limit, marker)
            .await
    }

    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Snapshot>> {
        self.paged(None, limit, marker).await
    }

    async fn create(&self, spec: SnapshotSpec) -> Result<Snapshot> {
        let body = json!({
            "name": spec.name,
            "description": spec.description,
        });

        tracing::info!("snapshotting volume {} as {}", spec.volume, spec.name);
        let operation = self
            .api
            .custom_verb(
                &Scope::Zone(self.zone.clone()),
                DISKS,
                &spec.volume,
                "createSnapshot",
                body,
            )
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        waiter.wait(&operation).await?;

        // Snapshot operations do not link the created resource; resolve it
        // by name against fresh state.
        self.find(&spec.name, None, None)
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| {
                CloudError::OperationFailed(format!("snapshot {} missing after create", spec.name))
            })
    }

    async fn delete(&self, snapshot_id: &str) -> Result<()> {
        let name = resource_short_name(snapshot_id);
        tracing::info!("deleting snapshot {}", name);
        let operation = self
            .api
            .delete(&Scope::Global, SNAPSHOTS, name)
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        waiter.wait(&operation).await?;
        Ok(())
    }
}
