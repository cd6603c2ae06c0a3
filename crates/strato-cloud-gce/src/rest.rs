//! REST implementation of the Compute Engine collaborator
//!
//! Thin `reqwest` client for the Compute Engine v1 API using bearer-token
//! authentication. Credential acquisition is the caller's concern; this
//! client only spends the token it is given.

use crate::api::{ComputeApi, ListPage, ListRequest, Scope};
use crate::error::{GceError, GceResult};
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

const FINGERPRINT_MISMATCH: &str = "fingerprint";

/// Bearer-authenticated Compute Engine REST client.
#[derive(Clone)]
pub struct RestComputeApi {
    client: reqwest::Client,
    base_url: String,
    project: String,
    token: String,
}

impl RestComputeApi {
    pub fn new(project: impl Into<String>, token: impl Into<String>) -> GceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("strato/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.into(),
            token: token.into(),
        })
    }

    /// Point the client at a different API root (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        format!("{}/projects/{}/{}", self.base_url, project, path)
    }

    fn scoped_url(&self, scope: &Scope, collection: &str) -> String {
        self.project_url(
            &self.project,
            &format!("{}/{}", scope.path_segment(), collection),
        )
    }

    async fn request_json(&self, request: reqwest::RequestBuilder) -> GceResult<Value> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json(&self, url: &str) -> GceResult<Value> {
        tracing::debug!("GET {}", url);
        self.request_json(self.client.get(url)).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> GceResult<Value> {
        tracing::debug!("POST {}", url);
        self.request_json(self.client.post(url).json(body)).await
    }

    async fn delete_json(&self, url: &str) -> GceResult<Value> {
        tracing::debug!("DELETE {}", url);
        self.request_json(self.client.delete(url)).await
    }
}

#[async_trait]
impl ComputeApi for RestComputeApi {
    fn project(&self) -> &str {
        &self.project
    }

    async fn list(&self, request: ListRequest) -> GceResult<ListPage> {
        let project = request.project.as_deref().unwrap_or(&self.project);
        let url = self.project_url(
            project,
            &format!("{}/{}", request.scope.path_segment(), request.collection),
        );

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = &request.filter {
            query.push(("filter", filter.clone()));
        }
        if let Some(max_results) = request.max_results {
            query.push(("maxResults", max_results.to_string()));
        }
        if let Some(token) = &request.page_token {
            query.push(("pageToken", token.clone()));
        }

        tracing::debug!("GET {} ({} params)", url, query.len());
        let response = self
            .request_json(self.client.get(&url).query(&query))
            .await?;

        let items = response
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next_page_token = response
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(ListPage {
            items,
            next_page_token,
        })
    }

    async fn get(&self, scope: &Scope, collection: &str, name: &str) -> GceResult<Value> {
        let url = format!("{}/{}", self.scoped_url(scope, collection), name);
        self.get_json(&url).await
    }

    async fn get_by_url(&self, url: &str) -> GceResult<Value> {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(GceError::InvalidArgument(format!(
                "malformed resource id: {url}"
            )));
        }
        self.get_json(url).await
    }

    async fn insert(&self, scope: &Scope, collection: &str, body: Value) -> GceResult<Value> {
        let url = self.scoped_url(scope, collection);
        self.post_json(&url, &body).await
    }

    async fn delete(&self, scope: &Scope, collection: &str, name: &str) -> GceResult<Value> {
        let url = format!("{}/{}", self.scoped_url(scope, collection), name);
        self.delete_json(&url).await
    }

    async fn custom_verb(
        &self,
        scope: &Scope,
        collection: &str,
        name: &str,
        verb: &str,
        body: Value,
    ) -> GceResult<Value> {
        let url = format!("{}/{}/{}", self.scoped_url(scope, collection), name, verb);
        self.post_json(&url, &body).await
    }

    async fn get_operation(&self, scope: &Scope, name: &str) -> GceResult<Value> {
        let url = format!("{}/{}", self.scoped_url(scope, "operations"), name);
        self.get_json(&url).await
    }

    async fn project_metadata(&self) -> GceResult<Value> {
        let url = format!("{}/projects/{}", self.base_url, self.project);
        let project = self.get_json(&url).await?;
        Ok(project
            .get("commonInstanceMetadata")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "items": [] })))
    }

    async fn set_common_instance_metadata(&self, body: Value) -> GceResult<Value> {
        let url = self.project_url(&self.project, "setCommonInstanceMetadata");
        self.post_json(&url, &body).await
    }
}

/// Map an unsuccessful HTTP response to the provider error taxonomy.
fn status_error(status: u16, body: &str) -> GceError {
    let message = extract_error_message(body).unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        404 => GceError::NotFound(message),
        400 => GceError::InvalidArgument(message),
        // Terminal, not transient: retrying a forbidden call cannot help.
        401 | 403 => GceError::PermissionDenied(message),
        409 | 412 => {
            if message.to_ascii_lowercase().contains(FINGERPRINT_MISMATCH) {
                GceError::FingerprintConflict(message)
            } else {
                GceError::Conflict(message)
            }
        }
        _ => GceError::Http { status, message },
    }
}

/// Pull `error.message` out of a backend error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
