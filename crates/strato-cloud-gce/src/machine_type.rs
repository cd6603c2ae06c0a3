//! Machine type service
//!
//! Machine types are zonal and read-only. Listings are materialized in
//! full so that `find_by` can match on arbitrary backend attributes the
//! uniform model does not carry.

use crate::api::{ComputeApi, ListRequest, Scope, iter_all};
use crate::error::GceError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use strato_cloud::{
    CloudError, MachineType, MachineTypeService, PagedResult, Result,
};

const MACHINE_TYPES: &str = "machineTypes";

pub struct GceMachineTypeService {
    api: Arc<dyn ComputeApi>,
    zone: String,
}

impl GceMachineTypeService {
    pub fn new(api: Arc<dyn ComputeApi>, zone: impl Into<String>) -> Self {
        Self {
            api,
            zone: zone.into(),
        }
    }

    /// Full zonal listing as raw documents, attribute lookups included.
    async fn raw_types(&self) -> Result<Vec<Value>> {
        iter_all(
            self.api.as_ref(),
            ListRequest::new(Scope::Zone(self.zone.clone()), MACHINE_TYPES),
        )
        .await
        .map_err(CloudError::from)
    }

    fn matches(raw: &Value, filters: &[(String, Value)]) -> Result<bool> {
        for (key, wanted) in filters {
            let actual = raw.get(key).ok_or_else(|| {
                CloudError::InvalidArgument(format!("unknown machine type attribute: {key}"))
            })?;
            if actual != wanted {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl MachineTypeService for GceMachineTypeService {
    async fn get(&self, machine_type_id: &str) -> Result<Option<MachineType>> {
        match self.api.get_by_url(machine_type_id).await {
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
    ) -> Result<PagedResult<MachineType>> {
        let mut matches = Vec::new();
        for raw in self.raw_types().await? {
            let parsed: MachineType = serde_json::from_value(raw)?;
            if parsed.name == name {
                matches.push(parsed);
            }
        }
        PagedResult::from_full_list(matches, limit, marker)
    }

    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineType>> {
        let mut types = Vec::new();
        for raw in self.raw_types().await? {
            types.push(serde_json::from_value(raw)?);
        }
        PagedResult::from_full_list(types, limit, marker)
    }

    async fn find_by(&self, filters: &[(String, Value)]) -> Result<Vec<MachineType>> {
        let mut matches = Vec::new();
        for raw in self.raw_types().await? {
            if Self::matches(&raw, filters)? {
                matches.push(serde_json::from_value(raw)?);
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_on_backend_attribute() {
        let raw = json!({ "name": "n1-standard-2", "guestCpus": 2 });
        let filters = vec![("guestCpus".to_string(), json!(2))];
        assert!(GceMachineTypeService::matches(&raw, &filters).unwrap());

        let filters = vec![("guestCpus".to_string(), json!(4))];
        assert!(!GceMachineTypeService::matches(&raw, &filters).unwrap());
    }

    #[test]
    fn test_unknown_attribute_is_invalid() {
        let raw = json!({ "name": "n1-standard-2" });
        let filters = vec![("coreCount".to_string(), json!(2))];
        let err = GceMachineTypeService::matches(&raw, &filters).unwrap_err();
        assert!(matches!(err, CloudError::InvalidArgument(_)));
    }
}
