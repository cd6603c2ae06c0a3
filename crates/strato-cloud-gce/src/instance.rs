//! Instance service

use crate::api::{
    ComputeApi, ListRequest, Scope, iter_all, parse_items, resource_short_name,
};
use crate::error::GceError;
use crate::operation::OperationWaiter;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use strato_cloud::{
    CloudError, Instance, InstanceLaunchSpec, InstanceService, PagedResult, Result, RetryConfig,
    clamp_limit,
};

const INSTANCES: &str = "instances";
const DEFAULT_NETWORK: &str = "global/networks/default";

pub struct GceInstanceService {
    api: Arc<dyn ComputeApi>,
    zone: String,
    retry: RetryConfig,
}

impl GceInstanceService {
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

    /// Build the provider-native launch body from the uniform parameters.
    fn launch_body(spec: &InstanceLaunchSpec) -> Value {
        let network = spec
            .network_id
            .clone()
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());

        let mut body = json!({
            "name": spec.name,
            "machineType": spec.machine_type_id,
            "disks": [{
                "boot": true,
                "autoDelete": spec.boot_disk_auto_delete,
                "initializeParams": { "sourceImage": spec.image_id },
            }],
            "networkInterfaces": [{
                "network": network,
                "accessConfigs": [{ "type": "ONE_TO_ONE_NAT", "name": "External NAT" }],
            }],
        });

        if !spec.security_groups.is_empty() {
            body["tags"] = json!({ "items": spec.security_groups });
        }
        body
    }
}

#[async_trait]
impl InstanceService for GceInstanceService {
    async fn get(&self, instance_id: &str) -> Result<Option<Instance>> {
        match self.api.get_by_url(instance_id).await {
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
    ) -> Result<PagedResult<Instance>> {
        let raw = iter_all(
            self.api.as_ref(),
            ListRequest::new(self.scope(None), INSTANCES),
        )
        .await
        .map_err(CloudError::from)?;

        let matches: Vec<Instance> = parse_items::<Instance>(raw)?
            .into_iter()
            .filter(|instance| instance.name == name)
            .collect();
        PagedResult::from_full_list(matches, limit, marker)
    }

    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<Instance>> {
        let page = self
            .api
            .list(
                ListRequest::new(self.scope(None), INSTANCES)
                    .with_page(clamp_limit(limit), marker),
            )
            .await
            .map_err(CloudError::from)?;

        Ok(PagedResult::from_server_page(
            parse_items(page.items)?,
            page.next_page_token,
        ))
    }

    async fn create(&self, spec: InstanceLaunchSpec) -> Result<Instance> {
        // A raw launch config overrides the uniform parameters verbatim.
        let body = match &spec.launch_config {
            Some(config) => config.clone(),
            None => Self::launch_body(&spec),
        };

        tracing::info!("launching instance {}", spec.name);
        let operation = self
            .api
            .insert(&self.scope(spec.zone.as_deref()), INSTANCES, body)
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        let done = waiter.wait(&operation).await?;

        let target = done
            .get("targetLink")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CloudError::OperationFailed("launch operation reported no target".to_string())
            })?;

        self.get(target).await?.ok_or_else(|| {
            CloudError::OperationFailed(format!("instance {target} missing after launch"))
        })
    }

    async fn delete(&self, instance_id: &str) -> Result<()> {
        let name = resource_short_name(instance_id);
        tracing::info!("deleting instance {}", name);
        let operation = self
            .api
            .delete(&self.scope(None), INSTANCES, name)
            .await
            .map_err(CloudError::from)?;

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        waiter.wait(&operation).await?;
        Ok(())
    }
}
