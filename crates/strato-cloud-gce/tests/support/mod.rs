//! In-memory Compute Engine backend for integration tests.
//!
//! Models the behaviors the services depend on: offset-based listing pages,
//! the fingerprint-guarded metadata document (with an optional injected
//! interloper that steals a configurable number of writes), and mutating
//! calls that return already-terminal operation handles.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use strato_cloud::RetryConfig;
use strato_cloud_gce::api::{ComputeApi, ListPage, ListRequest, Scope};
use strato_cloud_gce::error::{GceError, GceResult};

/// Retry settings that keep test runs fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

#[derive(Default)]
struct FakeState {
    fingerprint: u64,
    metadata_items: Vec<(String, String)>,
    collections: HashMap<String, Vec<Value>>,
    /// Writes stolen by a simulated concurrent writer before one succeeds.
    steal_writes: u32,
    /// When set, polled operations never leave `RUNNING`.
    stall_operations: bool,
    page_size: Option<usize>,
    op_counter: u64,
}

pub struct FakeComputeApi {
    project: String,
    state: Mutex<FakeState>,
}

impl FakeComputeApi {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            state: Mutex::new(FakeState {
                fingerprint: 1,
                ..FakeState::default()
            }),
        }
    }

    /// Seed one collection with raw documents.
    pub fn seed(&self, collection: &str, items: Vec<Value>) {
        let mut state = self.state.lock().unwrap();
        state.collections.insert(collection.to_string(), items);
    }

    pub fn set_metadata_item(&self, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.metadata_items.push((key.to_string(), value.to_string()));
    }

    pub fn metadata_item(&self, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .metadata_items
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn fingerprint(&self) -> String {
        format!("fp-{}", self.state.lock().unwrap().fingerprint)
    }

    /// The next `count` metadata writes lose the fingerprint race.
    pub fn steal_next_writes(&self, count: u32) {
        self.state.lock().unwrap().steal_writes = count;
    }

    /// Polled operations stay `RUNNING` forever.
    pub fn stall_operations(&self) {
        self.state.lock().unwrap().stall_operations = true;
    }

    /// Force a server-side page size smaller than any `maxResults`.
    pub fn set_page_size(&self, size: usize) {
        self.state.lock().unwrap().page_size = Some(size);
    }

    /// Raw documents of one collection, as the backend stored them.
    pub fn collection_items(&self, collection: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_len(&self, collection: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn done_operation(state: &mut FakeState, target_link: Option<&str>) -> Value {
        state.op_counter += 1;
        let mut op = json!({
            "name": format!("operation-{}", state.op_counter),
            "status": "DONE",
        });
        if let Some(link) = target_link {
            op["targetLink"] = json!(link);
        }
        op
    }

    fn self_link(&self, collection: &str, name: &str) -> String {
        format!(
            "https://compute.fake/projects/{}/{}/{}",
            self.project, collection, name
        )
    }
}

fn filter_matches(filter: Option<&str>, item: &Value) -> bool {
    let Some(filter) = filter else { return true };
    // Only the `name eq <value>` form is ever issued.
    let Some(wanted) = filter.strip_prefix("name eq ") else {
        return true;
    };
    item.get("name").and_then(Value::as_str) == Some(wanted)
}

#[async_trait]
impl ComputeApi for FakeComputeApi {
    fn project(&self) -> &str {
        &self.project
    }

    async fn list(&self, request: ListRequest) -> GceResult<ListPage> {
        let state = self.state.lock().unwrap();
        let items: Vec<Value> = state
            .collections
            .get(&request.collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|item| filter_matches(request.filter.as_deref(), item))
            .collect();

        let offset: usize = request
            .page_token
            .as_deref()
            .map(|token| token.parse().map_err(|_| GceError::InvalidArgument(format!("bad page token: {token}"))))
            .transpose()?
            .unwrap_or(0);

        let mut page_size = request.max_results.map(|n| n as usize).unwrap_or(usize::MAX);
        if let Some(forced) = state.page_size {
            page_size = page_size.min(forced);
        }

        let page: Vec<Value> = items.iter().skip(offset).take(page_size).cloned().collect();
        let consumed = offset + page.len();
        let next_page_token = (consumed < items.len()).then(|| consumed.to_string());

        Ok(ListPage {
            items: page,
            next_page_token,
        })
    }

    async fn get(&self, _scope: &Scope, collection: &str, name: &str) -> GceResult<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(collection)
            .and_then(|items| {
                items
                    .iter()
                    .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
            })
            .cloned()
            .ok_or_else(|| GceError::NotFound(format!("{collection}/{name}")))
    }

    async fn get_by_url(&self, url: &str) -> GceResult<Value> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .values()
            .flatten()
            .find(|item| item.get("selfLink").and_then(Value::as_str) == Some(url))
            .cloned()
            .ok_or_else(|| GceError::NotFound(url.to_string()))
    }

    async fn insert(&self, _scope: &Scope, collection: &str, body: Value) -> GceResult<Value> {
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GceError::InvalidArgument("missing resource name".to_string()))?
            .to_string();
        let link = self.self_link(collection, &name);

        let mut state = self.state.lock().unwrap();
        state.op_counter += 1;
        let numeric_id = format!("{}", 7000 + state.op_counter);

        let mut stored = body;
        stored["selfLink"] = json!(link);
        stored["id"] = json!(numeric_id);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(stored);

        Ok(json!({
            "name": format!("operation-{}", state.op_counter),
            "status": "DONE",
            "targetLink": link,
            "targetId": numeric_id,
        }))
    }

    async fn delete(&self, _scope: &Scope, collection: &str, name: &str) -> GceResult<Value> {
        let mut state = self.state.lock().unwrap();
        let items = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| GceError::NotFound(format!("{collection}/{name}")))?;
        let before = items.len();
        items.retain(|item| item.get("name").and_then(Value::as_str) != Some(name));
        if items.len() == before {
            return Err(GceError::NotFound(format!("{collection}/{name}")));
        }
        Ok(Self::done_operation(&mut state, None))
    }

    async fn custom_verb(
        &self,
        _scope: &Scope,
        _collection: &str,
        name: &str,
        verb: &str,
        body: Value,
    ) -> GceResult<Value> {
        if verb != "createSnapshot" {
            return Err(GceError::InvalidArgument(format!("unknown verb: {verb}")));
        }
        let snapshot_name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GceError::InvalidArgument("missing snapshot name".to_string()))?
            .to_string();
        let link = self.self_link("snapshots", &snapshot_name);

        let mut state = self.state.lock().unwrap();
        let mut stored = body;
        stored["selfLink"] = json!(link);
        stored["sourceDisk"] = json!(name);
        state
            .collections
            .entry("snapshots".to_string())
            .or_default()
            .push(stored);
        Ok(Self::done_operation(&mut state, None))
    }

    async fn get_operation(&self, _scope: &Scope, name: &str) -> GceResult<Value> {
        if self.state.lock().unwrap().stall_operations {
            return Ok(json!({ "name": name, "status": "RUNNING" }));
        }
        Ok(json!({ "name": name, "status": "DONE" }))
    }

    async fn project_metadata(&self) -> GceResult<Value> {
        let state = self.state.lock().unwrap();
        let items: Vec<Value> = state
            .metadata_items
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        Ok(json!({
            "fingerprint": format!("fp-{}", state.fingerprint),
            "items": items,
        }))
    }

    async fn set_common_instance_metadata(&self, body: Value) -> GceResult<Value> {
        let mut state = self.state.lock().unwrap();

        if state.steal_writes > 0 {
            state.steal_writes -= 1;
            state.fingerprint += 1;
            return Err(GceError::FingerprintConflict(
                "supplied fingerprint does not match the current metadata fingerprint".to_string(),
            ));
        }

        let supplied = body.get("fingerprint").and_then(Value::as_str);
        if supplied != Some(format!("fp-{}", state.fingerprint).as_str()) {
            return Err(GceError::FingerprintConflict(
                "supplied fingerprint does not match the current metadata fingerprint".to_string(),
            ));
        }

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| GceError::InvalidArgument("missing metadata items".to_string()))?;
        state.metadata_items = items
            .iter()
            .map(|item| {
                let key = item.get("key").and_then(Value::as_str).unwrap_or_default();
                let value = item.get("value").and_then(Value::as_str).unwrap_or_default();
                (key.to_string(), value.to_string())
            })
            .collect();
        state.fingerprint += 1;
        Ok(Self::done_operation(&mut state, None))
    }
}
