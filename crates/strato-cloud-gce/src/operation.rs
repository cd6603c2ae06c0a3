//! Async operation waiter
//!
//! Mutating Compute Engine calls return a long-running operation handle.
//! The waiter polls it to a terminal state, selecting the polling endpoint
//! family from the handle's own scope: a zone-scoped operation is only ever
//! polled against its zone endpoint, never the global one.

use crate::api::{ComputeApi, Scope, json_name, resource_short_name};
use crate::error::GceError;
use serde_json::Value;
use std::sync::Arc;
use strato_cloud::{CloudError, Result, RetryConfig};

/// Hard ceiling on polls per wait, so a stuck operation cannot spin forever.
const MAX_POLLS: u32 = 60;

const STATUS_DONE: &str = "DONE";

pub struct OperationWaiter {
    api: Arc<dyn ComputeApi>,
    retry: RetryConfig,
}

impl OperationWaiter {
    pub fn new(api: Arc<dyn ComputeApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    /// Derive the polling scope from an operation handle. The handle names
    /// its zone or region by canonical reference; absence of both means the
    /// operation is global.
    pub fn scope_of(operation: &Value) -> Result<Scope> {
        if let Some(zone) = operation.get("zone").and_then(Value::as_str) {
            return Ok(Scope::Zone(resource_short_name(zone).to_string()));
        }
        if let Some(region) = operation.get("region").and_then(Value::as_str) {
            return Ok(Scope::Region(resource_short_name(region).to_string()));
        }
        Ok(Scope::Global)
    }

    /// Block until the operation reaches a terminal state.
    ///
    /// Returns the terminal operation body on success; a backend-reported
    /// error block or exhausting the poll ceiling is `OperationFailed`.
    pub async fn wait(&self, operation: &Value) -> Result<Value> {
        let scope = Self::scope_of(operation)?;
        let name = json_name(operation)
            .map_err(CloudError::from)?
            .to_string();

        if is_done(operation) {
            return finished(operation.clone());
        }

        for attempt in 0..MAX_POLLS {
            tokio::time::sleep(self.retry.delay_for(attempt)).await;

            let current = self
                .api
                .get_operation(&scope, &name)
                .await
                .map_err(CloudError::from)?;

            if is_done(&current) {
                tracing::debug!("operation {} done after {} polls", name, attempt + 1);
                return finished(current);
            }
        }

        Err(CloudError::OperationFailed(format!(
            "operation {name} did not finish within {MAX_POLLS} polls"
        )))
    }
}

fn is_done(operation: &Value) -> bool {
    operation.get("status").and_then(Value::as_str) == Some(STATUS_DONE)
}

/// A terminal operation may still carry an error block.
fn finished(operation: Value) -> Result<Value> {
    if let Some(error) = operation.get("error") {
        let message = error
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(CloudError::from(GceError::OperationFailed(message)));
    }
    Ok(operation)
}
