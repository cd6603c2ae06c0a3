//! Optimistic metadata store
//!
//! The project's `commonInstanceMetadata` is a single shared document
//! guarded by an opaque fingerprint: every fetch returns the current
//! fingerprint, every write must echo it, and a write carrying a stale
//! fingerprint is rejected by the backend. This module wraps that contract
//! in a retrying read-modify-write cycle; it is the only concurrency-safety
//! mechanism for shared mutable backend state and is reused verbatim by any
//! resource stored in the document.

use crate::api::ComputeApi;
use crate::operation::OperationWaiter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use strato_cloud::{CloudError, Result, RetryConfig};

/// Full read-modify-write cycles attempted before a conflict is surfaced.
const SAVE_ATTEMPTS: u32 = 5;

/// One key/value entry of the shared document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

/// The fingerprint-guarded shared document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonMetadata {
    /// Opaque version token; changes on every successful write.
    pub fingerprint: String,

    pub items: Vec<MetadataItem>,
}

impl CommonMetadata {
    pub fn item_value(&self, key: &str) -> Option<&str> {
        // Last entry wins when the document carries duplicates.
        self.items
            .iter()
            .rev()
            .find(|item| item.key == key)
            .map(|item| item.value.as_str())
    }
}

#[derive(Clone)]
pub struct MetadataStore {
    api: Arc<dyn ComputeApi>,
    retry: RetryConfig,
}

impl MetadataStore {
    pub fn new(api: Arc<dyn ComputeApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    pub async fn fetch(&self) -> Result<CommonMetadata> {
        let raw = self.api.project_metadata().await.map_err(CloudError::from)?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.fetch().await?.item_value(key).map(str::to_string))
    }

    /// Retrying read-modify-write of one document slot.
    ///
    /// Each cycle fetches the document fresh (obtaining the current
    /// fingerprint), ensures a slot for `key` exists (an empty value when
    /// absent, never destructive), derives the slot's new value through
    /// `mutate`, and writes the whole document back under the fetched
    /// fingerprint. A stale-fingerprint rejection restarts the entire cycle
    /// against fresh state; after the attempt ceiling the conflict surfaces
    /// to the caller.
    pub async fn guarded_update<F>(&self, key: &str, mutate: F) -> Result<()>
    where
        F: Fn(&str) -> Result<String> + Send + Sync,
    {
        self.guarded_write(|items| {
            let current = items
                .iter()
                .find(|item| item.key == key)
                .map(|item| item.value.clone())
                .unwrap_or_default();
            let value = mutate(&current)?;

            let mut updated: Vec<MetadataItem> = items
                .iter()
                .filter(|item| item.key != key)
                .cloned()
                .collect();
            updated.push(MetadataItem {
                key: key.to_string(),
                value,
            });
            Ok(updated)
        })
        .await
    }

    /// Set a slot to a fixed value, adding it when absent.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.guarded_update(key, |_| Ok(value.to_string())).await
    }

    /// Remove a slot entirely. Returns whether an entry was removed.
    pub async fn remove_item(&self, key: &str) -> Result<bool> {
        if self.get_item(key).await?.is_none() {
            return Ok(false);
        }
        self.guarded_write(|items| {
            Ok(items
                .iter()
                .filter(|item| item.key != key)
                .cloned()
                .collect())
        })
        .await?;
        Ok(true)
    }

    async fn guarded_write<F>(&self, rewrite: F) -> Result<()>
    where
        F: Fn(&[MetadataItem]) -> Result<Vec<MetadataItem>> + Send + Sync,
    {
        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());

        for attempt in 0..SAVE_ATTEMPTS {
            let document = self.fetch().await?;
            let items = rewrite(&document.items)?;

            let body = json!({
                "fingerprint": document.fingerprint,
                "items": items,
            });

            match self.api.set_common_instance_metadata(body).await {
                Ok(operation) => {
                    waiter.wait(&operation).await?;
                    return Ok(());
                }
                Err(err) if err.is_fingerprint_conflict() => {
                    tracing::debug!(
                        "metadata fingerprint conflict, retrying (attempt {})",
                        attempt + 1
                    );
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CloudError::Conflict(format!(
            "metadata write lost the fingerprint race {SAVE_ATTEMPTS} times"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_duplicate_wins() {
        let document = CommonMetadata {
            fingerprint: "f1".to_string(),
            items: vec![
                MetadataItem {
                    key: "a".to_string(),
                    value: "old".to_string(),
                },
                MetadataItem {
                    key: "a".to_string(),
                    value: "new".to_string(),
                },
            ],
        };
        assert_eq!(document.item_value("a"), Some("new"));
        assert_eq!(document.item_value("b"), None);
    }

    #[test]
    fn test_document_parses_without_items() {
        let document: CommonMetadata =
            serde_json::from_value(json!({ "fingerprint": "f0" })).unwrap();
        assert!(document.items.is_empty());
    }
}
