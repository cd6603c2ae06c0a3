//! End-to-end resource lifecycles through the assembled provider.

mod support;

use serde_json::json;
use std::sync::Arc;
use strato_cloud::{InstanceLaunchSpec, SnapshotSpec, VolumeSpec};
use strato_cloud_gce::provider::{GceConfig, GceProvider};
use support::{FakeComputeApi, fast_retry};

fn provider(api: &Arc<FakeComputeApi>) -> GceProvider {
    let mut config = GceConfig::new("my-project", "us-central1-a");
    config.retry = fast_retry();
    GceProvider::new(&config, api.clone()).unwrap()
}

#[tokio::test]
async fn test_instance_lifecycle() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    let provider = provider(&api);
    let instances = &provider.compute().instances;

    let mut spec = InstanceLaunchSpec::new("web-1", "img-url", "mt-url");
    spec.security_groups = vec!["web".to_string()];
    let created = instances.create(spec).await.unwrap();
    assert_eq!(created.name, "web-1");
    assert_eq!(created.tags.items, vec!["web"]);

    let fetched = instances.get(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "web-1");

    instances.delete(&created.id).await.unwrap();
    assert!(instances.get(&created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_raw_launch_config_reaches_the_backend_verbatim() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    let provider = provider(&api);
    let instances = &provider.compute().instances;

    let config = json!({
        "name": "custom-1",
        "machineType": "mt-url",
        "scheduling": { "preemptible": true },
        "metadata": { "items": [{ "key": "role", "value": "worker" }] },
    });
    let mut spec = InstanceLaunchSpec::new("ignored", "ignored", "ignored");
    spec.launch_config = Some(config.clone());
    spec.security_groups = vec!["ignored-too".to_string()];

    let created = instances.create(spec).await.unwrap();
    assert_eq!(created.name, "custom-1");

    let stored = &api.collection_items("instances")[0];
    // The override replaces the uniform parameters wholesale.
    assert_eq!(stored["scheduling"], config["scheduling"]);
    assert_eq!(stored["metadata"], config["metadata"]);
    assert!(stored.get("disks").is_none());
    assert!(stored.get("tags").is_none());
}

#[tokio::test]
async fn test_volume_and_snapshot_lifecycle() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    let provider = provider(&api);
    let volumes = &provider.block_store().volumes;
    let snapshots = &provider.block_store().snapshots;

    let volume = volumes
        .create(VolumeSpec {
            name: "data-1".to_string(),
            size_gb: 20,
            zone: None,
            snapshot_id: None,
            description: Some("scratch".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(volume.name, "data-1");
    assert_eq!(volume.size_gb.as_deref(), Some("20"));

    let snapshot = snapshots
        .create(SnapshotSpec {
            name: "data-1-snap".to_string(),
            volume: "data-1".to_string(),
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(snapshot.name, "data-1-snap");
    assert_eq!(snapshot.source_disk.as_deref(), Some("data-1"));

    snapshots.delete(&snapshot.id).await.unwrap();
    volumes.delete(&volume.id).await.unwrap();
    assert!(volumes.list(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_network_create_is_idempotent() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    let provider = provider(&api);
    let networks = provider.networks();

    let first = networks.create("internal").await.unwrap();
    let second = networks.create("internal").await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(api.collection_len("networks"), 1);
}

#[tokio::test]
async fn test_floating_ip_resolves_by_target_id() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    let provider = provider(&api);
    let networks = provider.networks();

    let ip = networks.create_floating_ip(None).await.unwrap();
    assert!(ip.name.starts_with("ip-"));
    assert!(!ip.resource_id.is_empty());

    let listed = networks.floating_ips(None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].resource_id, ip.resource_id);
}

#[tokio::test]
async fn test_image_lookup_falls_back_to_public_tier() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    api.seed(
        "images",
        vec![
            json!({
                "name": "debian-12",
                "selfLink": "https://compute.fake/projects/debian-cloud/images/debian-12",
            }),
            json!({
                "name": "app-base",
                "selfLink": "https://compute.fake/projects/my-project/images/app-base",
            }),
        ],
    );
    let provider = provider(&api);
    let images = &provider.compute().images;

    let public = images
        .get("https://compute.fake/projects/debian-cloud/images/debian-12")
        .await
        .unwrap();
    assert!(public.is_some());

    let all = images.list(None, None).await.unwrap();
    assert!(all.items.len() >= 2);
}

#[tokio::test]
async fn test_machine_type_find_by_rejects_unknown_attribute() {
    let api = Arc::new(FakeComputeApi::new("my-project"));
    api.seed(
        "machineTypes",
        vec![
            json!({
                "name": "n1-standard-2",
                "selfLink": "https://compute.fake/projects/my-project/machineTypes/n1-standard-2",
                "guestCpus": 2,
            }),
            json!({
                "name": "n1-standard-4",
                "selfLink": "https://compute.fake/projects/my-project/machineTypes/n1-standard-4",
                "guestCpus": 4,
            }),
        ],
    );
    let provider = provider(&api);
    let machine_types = &provider.compute().machine_types;

    let matched = machine_types
        .find_by(&[("guestCpus".to_string(), json!(4))])
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "n1-standard-4");

    let err = machine_types
        .find_by(&[("coreCount".to_string(), json!(4))])
        .await
        .unwrap_err();
    assert!(matches!(err, strato_cloud::CloudError::InvalidArgument(_)));
}
