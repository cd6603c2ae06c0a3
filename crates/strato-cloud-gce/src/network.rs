//! Network and floating IP services

use crate::api::{ComputeApi, ListRequest, Scope, iter_all, parse_items};
use crate::operation::OperationWaiter;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use strato_cloud::{
    CloudError, FloatingIp, Network, NetworkService, PagedResult, Result, RetryConfig,
    clamp_limit,
};
use uuid::Uuid;

const NETWORKS: &str = "networks";
const ADDRESSES: &str = "addresses";

pub struct GceNetworkService {
    api: Arc<dyn ComputeApi>,
    region: String,
    retry: RetryConfig,
}

impl GceNetworkService {
    pub fn new(api: Arc<dyn ComputeApi>, region: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            api,
            region: region.into(),
            retry,
        }
    }

    async fn list_filtered(&self, filter: Option<String>) -> Result<Vec<Network>> {
        let mut request = ListRequest::new(Scope::Global, NETWORKS);
        request.filter = filter;
        let raw = iter_all(self.api.as_ref(), request)
            .await
            .map_err(CloudError::from)?;
        Ok(parse_items(raw)?)
    }
}

#[async_trait]
impl NetworkService for GceNetworkService {
    async fn get(&self, network_id: &str) -> Result<Option<Network>> {
        // The backend's id filter chokes on long numeric ids, so scan the
        // full listing and compare canonical references ourselves.
        Ok(self
            .list_filtered(None)
            .await?
            .into_iter()
            .find(|network| network.id == network_id))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Network>> {
        Ok(self
            .list_filtered(Some(format!("name eq {name}")))
            .await?
            .into_iter()
            .next())
    }

    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<Network>> {
        let page = self
            .api
            .list(ListRequest::new(Scope::Global, NETWORKS).with_page(clamp_limit(limit), marker))
            .await
            .map_err(CloudError::from)?;
        Ok(PagedResult::from_server_page(
            parse_items(page.items)?,
            page.next_page_token,
        ))
    }

    async fn create(&self, name: &str) -> Result<Network> {
        // Idempotent by name.
        if let Some(existing) = self.get_by_name(name).await? {
            tracing::debug!("network {} already exists", name);
            return Ok(existing);
        }

        tracing::info!("creating network {}", name);
        let operation = self
            .api
            .insert(&Scope::Global, NETWORKS, json!({ "name": name }))
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        waiter.wait(&operation).await?;

        self.get_by_name(name).await?.ok_or_else(|| {
            CloudError::OperationFailed(format!("network {name} missing after create"))
        })
    }

    async fn floating_ips(&self, region: Option<&str>) -> Result<Vec<FloatingIp>> {
        let region = region.unwrap_or(&self.region).to_string();
        let raw = iter_all(
            self.api.as_ref(),
            ListRequest::new(Scope::Region(region), ADDRESSES),
        )
        .await
        .map_err(CloudError::from)?;
        Ok(parse_items(raw)?)
    }

    async fn create_floating_ip(&self, region: Option<&str>) -> Result<FloatingIp> {
        let region = region.unwrap_or(&self.region).to_string();
        let name = format!("ip-{}", Uuid::new_v4());

        tracing::info!("reserving address {} in {}", name, region);
        let operation = self
            .api
            .insert(
                &Scope::Region(region.clone()),
                ADDRESSES,
                json!({ "name": name }),
            )
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        let done = waiter.wait(&operation).await?;

        // The operation names its target by numeric id; resolve the final
        // resource against a fresh listing.
        let target_id = done
            .get("targetId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::OperationFailed("address operation reported no target id".to_string())
            })?;

        self.floating_ips(Some(&region))
            .await?
            .into_iter()
            .find(|ip| ip.resource_id == target_id)
            .ok_or_else(|| {
                CloudError::OperationFailed(format!("address {name} missing after create"))
            })
    }
}
