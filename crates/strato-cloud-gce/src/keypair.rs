//! Key pair service over the shared metadata document
//!
//! Compute Engine has no key-pair resource; SSH keys live as one text blob
//! inside the project's `commonInstanceMetadata` under the `sshKeys` item:
//! newline-separated records of `"<format> <publicKey> <email>"`. Every
//! mutation goes through the fingerprint-guarded store so concurrent
//! writers cannot lose each other's records.

use crate::metadata::MetadataStore;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use strato_cloud::{CloudError, KeyPair, KeyPairService, PagedResult, Result};

pub const SSH_KEYS_KEY: &str = "sshKeys";

/// One decoded record of the `sshKeys` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub format: String,
    pub public_key: String,
    pub email: String,
}

impl KeyRecord {
    /// Derived id: deterministic content hash of the public key, stable
    /// across processes.
    pub fn derived_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.public_key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn encode(&self) -> String {
        format!("{} {} {}", self.format, self.public_key, self.email)
    }

    /// Parse the whole blob. Blank lines are skipped; a record with the
    /// wrong field count is a fatal parse error for the call.
    pub fn parse_blob(blob: &str) -> Result<Vec<KeyRecord>> {
        let mut records = Vec::new();
        for line in blob.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() != 3 {
                return Err(CloudError::InvalidArgument(format!(
                    "malformed ssh key record ({} fields)",
                    fields.len()
                )));
            }
            records.push(KeyRecord {
                format: fields[0].to_string(),
                public_key: fields[1].to_string(),
                email: fields[2].to_string(),
            });
        }
        Ok(records)
    }

    pub fn serialize_blob(records: &[KeyRecord]) -> String {
        records
            .iter()
            .map(KeyRecord::encode)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct GceKeyPairService {
    store: MetadataStore,
}

impl GceKeyPairService {
    pub fn new(store: MetadataStore) -> Self {
        Self { store }
    }

    async fn records(&self) -> Result<Vec<KeyRecord>> {
        let blob = self
            .store
            .get_item(SSH_KEYS_KEY)
            .await?
            .unwrap_or_default();
        KeyRecord::parse_blob(&blob)
    }
}

fn to_key_pair(record: &KeyRecord) -> KeyPair {
    KeyPair {
        id: record.derived_id(),
        name: record.email.clone(),
        public_key: Some(record.public_key.clone()),
        private_material: None,
    }
}

/// Generate a fresh ed25519 key pair as (private, public) base64 strings.
fn generate_key_material() -> (String, String) {
    let signing = SigningKey::generate(&mut OsRng);
    let private = Base64.encode(signing.to_bytes());
    let public = Base64.encode(signing.verifying_key().to_bytes());
    (private, public)
}

#[async_trait]
impl KeyPairService for GceKeyPairService {
    async fn get(&self, key_pair_id: &str) -> Result<Option<KeyPair>> {
        Ok(self
            .records()
            .await?
            .iter()
            .find(|record| record.derived_id() == key_pair_id)
            .map(to_key_pair))
    }

    async fn find(
        &self,
        name: &str,
        limit: Option<u32>,
        marker: Option<&str>,
    ) -> Result<PagedResult<KeyPair>> {
        let matches: Vec<KeyPair> = self
            .records()
            .await?
            .iter()
            .filter(|record| record.email == name)
            .map(to_key_pair)
            .collect();
        PagedResult::from_full_list(matches, limit, marker)
    }

    async fn list(&self, limit: Option<u32>, marker: Option<&str>) -> Result<PagedResult<KeyPair>> {
        let key_pairs: Vec<KeyPair> = self.records().await?.iter().map(to_key_pair).collect();
        PagedResult::from_full_list(key_pairs, limit, marker)
    }

    async fn create(&self, name: &str) -> Result<KeyPair> {
        // Idempotent: an existing record is returned unchanged, without the
        // private material and without a second write.
        let existing = self.find(name, None, None).await?;
        if let Some(key_pair) = existing.items.into_iter().next() {
            return Ok(key_pair);
        }

        let (private_material, public_key) = generate_key_material();
        let record = KeyRecord {
            format: format!("{name}:ssh-ed25519"),
            public_key,
            email: name.to_string(),
        };

        tracing::info!("registering ssh key pair {}", name);
        let new_record = record.clone();
        self.store
            .guarded_update(SSH_KEYS_KEY, move |current| {
                let mut records = KeyRecord::parse_blob(current)?;
                records.insert(0, new_record.clone());
                Ok(KeyRecord::serialize_blob(&records))
            })
            .await?;

        Ok(KeyPair {
            id: record.derived_id(),
            name: name.to_string(),
            public_key: Some(record.public_key),
            private_material: Some(private_material),
        })
    }

    async fn delete(&self, key_pair_id: &str) -> Result<()> {
        if self.get(key_pair_id).await?.is_none() {
            return Ok(());
        }

        let target = key_pair_id.to_string();
        tracing::info!("removing ssh key pair {}", key_pair_id);
        self.store
            .guarded_update(SSH_KEYS_KEY, move |current| {
                let records: Vec<KeyRecord> = KeyRecord::parse_blob(current)?
                    .into_iter()
                    .filter(|record| record.derived_id() != target)
                    .collect();
                Ok(KeyRecord::serialize_blob(&records))
            })
            .await
    }
}
