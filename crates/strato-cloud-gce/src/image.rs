//! Image service
//!
//! Lookup is two-tier: project-private images first, then a fixed set of
//! well-known public image projects. The public tier is expensive to
//! enumerate, so it is fetched once per cache lifetime through an injected
//! cache object with an explicit invalidate, never an implicit singleton.

use crate::api::{ComputeApi, ListRequest, Scope, iter_all, parse_items};
use crate::error::GceError;
use async_trait::async_trait;
use std::sync::Arc;
use strato_cloud::{ImageService, MachineImage, PagedResult, Result};
use tokio::sync::Mutex;

const IMAGES: &str = "images";

/// Source projects for public base images.
pub const PUBLIC_IMAGE_PROJECTS: [&str; 5] = [
    "centos-cloud",
    "coreos-cloud",
    "debian-cloud",
    "opensuse-cloud",
    "ubuntu-os-cloud",
];

/// Cache of the public-image tier, scoped to whoever owns it.
#[derive(Default)]
pub struct ImageCache {
    inner: Mutex<Option<Vec<MachineImage>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached tier; the next lookup re-fetches it.
    pub async fn invalidate(&self) {
        *self.inner.lock().await = None;
    }
}

pub struct GceImageService {
    api: Arc<dyn ComputeApi>,
    cache: Arc<ImageCache>,
}

impl GceImageService {
    pub fn new(api: Arc<dyn ComputeApi>, cache: Arc<ImageCache>) -> Self {
        Self { api, cache }
    }

    async fn public_images(&self) -> Result<Vec<MachineImage>> {
        let mut guard = self.cache.inner.lock().await;
        if let Some(images) = guard.as_ref() {
            return Ok(images.clone());
        }

        let mut images: Vec<MachineImage> = Vec::new();
        for project in PUBLIC_IMAGE_PROJECTS {
            let request = ListRequest::new(Scope::Global, IMAGES).with_project(project);
            match iter_all(self.api.as_ref(), request).await {
                Ok(raw) => images.extend(parse_items::<MachineImage>(raw)?),
                // A public project we cannot read does not fail the lookup.
                Err(err) => tracing::warn!("listing images in {} failed: {}", project, err),
            }
        }

        *guard = Some(images.clone());
        Ok(images)
    }

    async fn private_images(&self) -> Result<Vec<MachineImage>> {
        if PUBLIC_IMAGE_PROJECTS.contains(&self.api.project()) {
            return Ok(Vec::new());
        }
        match iter_all(self.api.as_ref(), ListRequest::new(Scope::Global, IMAGES)).await {
            Ok(raw) => Ok(parse_items(raw)?),
            Err(err) => {
                tracing::warn!("listing project images failed: {}", err);
                Ok(Vec::new())
            }
        }
    }

    async fn all_images(&self) -> Result<Vec<MachineImage>> {
        let mut images = self.private_images().await?;
        images.extend(self.public_images().await?);
        Ok(images)
    }
}

#[async_trait]
impl ImageService for GceImageService {
    async fn get(&self, image_id: &str) -> Result<Option<MachineImage>> {
        match self.api.get_by_url(image_id).await {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(GceError::NotFound(_)) => {
                // Not a private image; fall through to the public tier.
                Ok(self
                    .public_images()
                    .await?
                    .into_iter()
                    .find(|image| image.id == image_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineImage>> {
        let matches: Vec<MachineImage> = self
            .all_images()
            .await?
            .into_iter()
            .filter(|image| image.name == name)
            .collect();
        PagedResult::from_full_list(matches, limit, marker)
    }

    async fn list(
        &self,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<MachineImage>> {
        PagedResult::from_full_list(self.all_images().await?, limit, marker)
    }
}
