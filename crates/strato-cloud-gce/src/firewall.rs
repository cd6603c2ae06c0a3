//! Security groups emulated over firewall rules
//!
//! Compute Engine has no security-group resource: it has per-network
//! firewall rules keyed by instance tags. A "security group" here is the
//! composite `(tag, network)`: the group exists exactly as long as at
//! least one firewall rule references that pair, and its rule list is a
//! projection over the live rule collection. Nothing is cached; membership
//! is recomputed on every query so a derived entity can never go stale.

use crate::api::{ComputeApi, ListRequest, Scope, iter_all, resource_short_name};
use crate::operation::OperationWaiter;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use strato_cloud::{
    CloudError, FirewallRuleView, NetworkService, PagedResult, Result, RetryConfig, SecurityGroup,
    SecurityGroupService,
};
use uuid::Uuid;

const FIREWALLS: &str = "firewalls";

/// Parameters for one new group rule.
#[derive(Debug, Clone)]
pub struct FirewallRuleSpec {
    pub direction: String,
    pub protocol: String,

    /// `"80"` or `"80-90"`; absent means all ports.
    pub port_range: Option<String>,

    pub source_tags: Vec<String>,
    pub source_ranges: Vec<String>,
}

/// Composite group id, `<tag>:<network-name>`.
pub fn group_id(tag: &str, network_name: &str) -> String {
    format!("{tag}:{network_name}")
}

/// Split a composite id back into `(tag, network)`.
pub fn parse_group_id(id: &str) -> Result<(String, String)> {
    match id.split_once(':') {
        Some((tag, network)) if !tag.is_empty() && !network.is_empty() => {
            Ok((tag.to_string(), network.to_string()))
        }
        _ => Err(CloudError::InvalidArgument(format!(
            "malformed security group id: {id}"
        ))),
    }
}

pub struct FirewallDelegate {
    api: Arc<dyn ComputeApi>,
    retry: RetryConfig,
}

impl FirewallDelegate {
    pub fn new(api: Arc<dyn ComputeApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    /// Every firewall rule in the project, exhaustively paginated.
    async fn raw_rules(&self) -> Result<Vec<Value>> {
        Ok(iter_all(
            self.api.as_ref(),
            ListRequest::new(Scope::Global, FIREWALLS),
        )
        .await
        .map_err(CloudError::from)?)
    }

    /// All `(tag, network-name)` pairs referenced by live rules, in backend
    /// order, deduplicated. This set IS the list of existing groups.
    pub async fn tag_networks(&self) -> Result<Vec<(String, String)>> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for rule in self.raw_rules().await? {
            for view in rule_views(&rule) {
                let network = resource_short_name(&view.network).to_string();
                let pair = (view.target_tag, network);
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
        Ok(pairs)
    }

    /// Re-validate a composite id against live state. Absent when no rule
    /// currently references the pair.
    pub async fn get_tag_network(&self, id: &str) -> Result<Option<(String, String)>> {
        let (tag, network) = parse_group_id(id)?;
        let exists = self
            .tag_networks()
            .await?
            .into_iter()
            .any(|pair| pair == (tag.clone(), network.clone()));
        Ok(exists.then_some((tag, network)))
    }

    /// The group's rule list: all rules targeting the tag within the network.
    pub async fn rules_for(&self, tag: &str, network_name: &str) -> Result<Vec<FirewallRuleView>> {
        let mut views = Vec::new();
        for rule in self.raw_rules().await? {
            for view in rule_views(&rule) {
                if view.target_tag == tag && resource_short_name(&view.network) == network_name {
                    views.push(view);
                }
            }
        }
        Ok(views)
    }

    /// Delete every rule referencing the pair. Once zero rules remain the
    /// group is gone; there is no separate deleted state.
    pub async fn delete_tag_network(&self, id: &str) -> Result<()> {
        let (tag, network) = parse_group_id(id)?;
        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());

        for view in self.rules_for(&tag, &network).await? {
            tracing::info!("deleting firewall rule {} for group {}", view.name, id);
            let operation = self
                .api
                .delete(&Scope::Global, FIREWALLS, &view.name)
                .await
                .map_err(CloudError::from)?;
            waiter.wait(&operation).await?;
        }
        Ok(())
    }

    /// Add one rule to a group, i.e. insert a backend firewall rule.
    pub async fn add_rule(
        &self,
        tag: &str,
        network_id: &str,
        spec: &FirewallRuleSpec,
    ) -> Result<FirewallRuleView> {
        let name = format!("fw-{}-{}", tag, Uuid::new_v4());
        let mut allowed = json!({ "IPProtocol": spec.protocol });
        if let Some(ports) = &spec.port_range {
            allowed["ports"] = json!([ports]);
        }

        let body = json!({
            "name": name,
            "network": network_id,
            "direction": spec.direction,
            "targetTags": [tag],
            "sourceTags": spec.source_tags,
            "sourceRanges": spec.source_ranges,
            "allowed": [allowed],
        });

        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        let operation = self
            .api
            .insert(&Scope::Global, FIREWALLS, body)
            .await
            .map_err(CloudError::from)?;
        waiter.wait(&operation).await?;

        let network_name = resource_short_name(network_id).to_string();
        self.rules_for(tag, &network_name)
            .await?
            .into_iter()
            .find(|view| view.name == name)
            .ok_or_else(|| {
                CloudError::OperationFailed(format!("firewall rule {name} missing after insert"))
            })
    }

    /// Remove one rule by its backend name.
    pub async fn remove_rule(&self, rule_name: &str) -> Result<()> {
        let waiter = OperationWaiter::new(self.api.clone(), self.retry.clone());
        let operation = self
            .api
            .delete(&Scope::Global, FIREWALLS, rule_name)
            .await
            .map_err(CloudError::from)?;
        waiter.wait(&operation).await?;
        Ok(())
    }
}

/// Project one raw firewall rule into the group rule model, one view per
/// target tag. Rules with no target tag belong to no group.
fn rule_views(rule: &Value) -> Vec<FirewallRuleView> {
    let Some(network) = rule.get("network").and_then(Value::as_str) else {
        return Vec::new();
    };
    let name = rule
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let id = rule
        .get("selfLink")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let direction = rule
        .get("direction")
        .and_then(Value::as_str)
        .map(str::to_string);

    let allowed = rule.get("allowed").and_then(Value::as_array);
    let protocol = allowed
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("IPProtocol"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let port_range = allowed
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("ports"))
        .and_then(Value::as_array)
        .and_then(|ports| ports.first())
        .and_then(Value::as_str)
        .map(str::to_string);

    let source_tags = string_list(rule.get("sourceTags"));
    let source_ranges = string_list(rule.get("sourceRanges"));

    string_list(rule.get("targetTags"))
        .into_iter()
        .map(|target_tag| FirewallRuleView {
            id: id.clone(),
            name: name.clone(),
            direction: direction.clone(),
            protocol: protocol.clone(),
            port_range: port_range.clone(),
            source_tags: source_tags.clone(),
            source_ranges: source_ranges.clone(),
            target_tag,
            network: network.to_string(),
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub struct GceSecurityGroupService {
    delegate: FirewallDelegate,
    networks: Arc<dyn NetworkService>,
}

impl GceSecurityGroupService {
    pub fn new(delegate: FirewallDelegate, networks: Arc<dyn NetworkService>) -> Self {
        Self { delegate, networks }
    }

    async fn build_group(&self, tag: &str, network_name: &str) -> Result<SecurityGroup> {
        let rules = self.delegate.rules_for(tag, network_name).await?;
        // The rules carry the canonical network reference; fall back to a
        // name lookup only for a group that has none yet.
        let network_id = match rules.first() {
            Some(rule) => rule.network.clone(),
            None => self
                .networks
                .get_by_name(network_name)
                .await?
                .map(|network| network.id)
                .unwrap_or_else(|| network_name.to_string()),
        };

        Ok(SecurityGroup {
            id: group_id(tag, network_name),
            name: tag.to_string(),
            network_id,
            description: None,
            rules,
        })
    }
}

#[async_trait]
impl SecurityGroupService for GceSecurityGroupService {
    async fn get(&self, group_id: &str) -> Result<Option<SecurityGroup>> {
        match self.delegate.get_tag_network(group_id).await? {
            Some((tag, network_name)) => {
                Ok(Some(self.build_group(&tag, &network_name).await?))
            }
            None => Ok(None),
        }
    }

    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<SecurityGroup>> {
        let mut groups = Vec::new();
        for (tag, network_name) in self.delegate.tag_networks().await? {
            if tag == name {
                groups.push(self.build_group(&tag, &network_name).await?);
            }
        }
        PagedResult::from_full_list(groups, limit, marker)
    }

    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<SecurityGroup>> {
        let mut groups = Vec::new();
        for (tag, network_name) in self.delegate.tag_networks().await? {
            groups.push(self.build_group(&tag, &network_name).await?);
        }
        PagedResult::from_full_list(groups, limit, marker)
    }

    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        network_id: Option<&str>,
    ) -> Result<SecurityGroup> {
        // A group materializes in the backend only once a rule references
        // its tag; creation just binds the name to a network.
        let network = match network_id {
            Some(id) => self.networks.get(id).await?,
            None => self.networks.get_by_name("default").await?,
        }
        .ok_or_else(|| {
            CloudError::InvalidArgument(format!(
                "no such network: {}",
                network_id.unwrap_or("default")
            ))
        })?;

        Ok(SecurityGroup {
            id: group_id(name, resource_short_name(&network.id)),
            name: name.to_string(),
            network_id: network.id,
            description: description.map(str::to_string),
            rules: Vec::new(),
        })
    }

    async fn delete(&self, group_id: &str) -> Result<()> {
        self.delegate.delete_tag_network(group_id).await
    }

    async fn find_by_network_and_tags(
        &self,
        network_name: &str,
        tags: &[String],
    ) -> Result<Vec<SecurityGroup>> {
        let mut groups = Vec::new();
        for (tag, net_name) in self.delegate.tag_networks().await? {
            if net_name != network_name || !tags.contains(&tag) {
                continue;
            }
            groups.push(self.build_group(&tag, &net_name).await?);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_id_round_trip() {
        let id = group_id("web", "default");
        assert_eq!(id, "web:default");
        assert_eq!(
            parse_group_id(&id).unwrap(),
            ("web".to_string(), "default".to_string())
        );
    }

    #[test]
    fn test_malformed_group_id() {
        assert!(matches!(
            parse_group_id("no-colon").unwrap_err(),
            CloudError::InvalidArgument(_)
        ));
        assert!(parse_group_id(":default").is_err());
    }

    #[test]
    fn test_rule_projection_one_view_per_tag() {
        let rule = json!({
            "selfLink": "https://example/global/firewalls/fw-1",
            "name": "fw-1",
            "network": "https://example/global/networks/default",
            "direction": "INGRESS",
            "targetTags": ["web", "api"],
            "sourceRanges": ["0.0.0.0/0"],
            "allowed": [{ "IPProtocol": "tcp", "ports": ["80-90"] }]
        });

        let views = rule_views(&rule);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].target_tag, "web");
        assert_eq!(views[1].target_tag, "api");
        assert_eq!(views[0].protocol.as_deref(), Some("tcp"));
        assert_eq!(views[0].port_range.as_deref(), Some("80-90"));
        assert_eq!(views[0].source_ranges, vec!["0.0.0.0/0"]);
    }

    #[test]
    fn test_untagged_rule_belongs_to_no_group() {
        let rule = json!({
            "name": "fw-open",
            "network": "https://example/global/networks/default",
            "allowed": [{ "IPProtocol": "icmp" }]
        });
        assert!(rule_views(&rule).is_empty());
    }
}
