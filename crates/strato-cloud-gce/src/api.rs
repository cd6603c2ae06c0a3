//! Backend collaborator boundary
//!
//! The Compute Engine API is consumed through this trait so services never
//! talk to the wire directly. Every call is a blocking request/response from
//! the caller's perspective; mutating calls return a long-running operation
//! handle as raw JSON, which the operation waiter polls to completion.

use crate::error::{GceError, GceResult};
use async_trait::async_trait;
use serde_json::Value;

/// Scope of a collection or operation endpoint.
///
/// Zone-scoped, region-scoped and global resources live under different
/// endpoint families; polling an operation against the wrong family is an
/// error, never a silent misreport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Zone(String),
    Region(String),
    Global,
}

impl Scope {
    /// URL path segment for this scope, e.g. `zones/us-central1-a`.
    pub fn path_segment(&self) -> String {
        match self {
            Scope::Zone(zone) => format!("zones/{zone}"),
            Scope::Region(region) => format!("regions/{region}"),
            Scope::Global => "global".to_string(),
        }
    }
}

/// One listing request.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Project override; the collaborator's own project when absent.
    pub project: Option<String>,

    pub scope: Scope,

    /// Collection name, e.g. `instances`, `disks`, `firewalls`.
    pub collection: String,

    /// Backend filter expression, e.g. `name eq web-1`.
    pub filter: Option<String>,

    pub max_results: Option<u32>,
    pub page_token: Option<String>,
}

impl ListRequest {
    pub fn new(scope: Scope, collection: impl Into<String>) -> Self {
        Self {
            project: None,
            scope,
            collection: collection.into(),
            filter: None,
            max_results: None,
            page_token: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_page(mut self, max_results: u32, page_token: Option<&str>) -> Self {
        self.max_results = Some(max_results);
        self.page_token = page_token.map(str::to_string);
        self
    }
}

/// One page of a listing response.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

/// Compute Engine API collaborator.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// The project this collaborator is bound to.
    fn project(&self) -> &str;

    async fn list(&self, request: ListRequest) -> GceResult<ListPage>;

    async fn get(&self, scope: &Scope, collection: &str, name: &str) -> GceResult<Value>;

    /// Resolve a canonical resource reference (a `selfLink`-shaped URL).
    async fn get_by_url(&self, url: &str) -> GceResult<Value>;

    /// Returns an operation handle.
    async fn insert(&self, scope: &Scope, collection: &str, body: Value) -> GceResult<Value>;

    /// Returns an operation handle.
    async fn delete(&self, scope: &Scope, collection: &str, name: &str) -> GceResult<Value>;

    /// Invoke a custom collection verb (e.g. `createSnapshot` on a disk).
    /// Returns an operation handle.
    async fn custom_verb(
        &self,
        scope: &Scope,
        collection: &str,
        name: &str,
        verb: &str,
        body: Value,
    ) -> GceResult<Value>;

    async fn get_operation(&self, scope: &Scope, name: &str) -> GceResult<Value>;

    /// The project's `commonInstanceMetadata` document (fingerprint + items).
    async fn project_metadata(&self) -> GceResult<Value>;

    /// Write the shared metadata document. The body must echo the
    /// fingerprint from the fetch it was derived from; the backend rejects a
    /// stale fingerprint with a conflict. Returns an operation handle.
    async fn set_common_instance_metadata(&self, body: Value) -> GceResult<Value>;
}

/// Drain a listing to completion, following the continuation token.
pub async fn iter_all(api: &dyn ComputeApi, request: ListRequest) -> GceResult<Vec<Value>> {
    let mut all = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let mut page_request = request.clone();
        page_request.page_token = token;
        let page = api.list(page_request).await?;
        all.extend(page.items);

        match page.next_page_token {
            Some(next) => token = Some(next),
            None => return Ok(all),
        }
    }
}

/// Decode a page of raw backend items into typed resources.
pub fn parse_items<T: serde::de::DeserializeOwned>(
    items: Vec<Value>,
) -> Result<Vec<T>, serde_json::Error> {
    items.into_iter().map(serde_json::from_value).collect()
}

/// Short name of a resource from its canonical URL,
/// e.g. `…/zones/us-central1-a` -> `us-central1-a`.
pub fn resource_short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// The `name` field of a resource or operation JSON body.
pub fn json_name(value: &Value) -> GceResult<&str> {
    value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| GceError::InvalidArgument("missing resource name".to_string()))
}
