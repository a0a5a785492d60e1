//! Object storage for uploaded compliance artifacts.
//!
//! Keys have the shape `{scope}/{artifact}/{version}` where every segment is
//! a UUID, so a key can never name a path outside the storage root.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{GovernanceError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Build an object key.
#[must_use]
pub fn object_key(scope: Uuid, artifact: Uuid, version: Uuid) -> String {
    format!("{scope}/{artifact}/{version}")
}

/// Check that `key` has the `{uuid}/{uuid}/{uuid}` shape.
pub fn validate_key(key: &str) -> Result<()> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() != 3 || segments.iter().any(|s| Uuid::parse_str(s).is_err()) {
        return Err(GovernanceError::validation("key", "Malformed object key"));
    }
    Ok(())
}

/// Blob storage collaborator.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, returning the key.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// A URL that allows reading `key` until `ttl` elapses.
    async fn signed_get(&self, key: &str, ttl: Duration) -> Result<String>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

// ============================================================================
// In-Memory Storage (for testing)
// ============================================================================

/// A stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory object storage for testing.
#[derive(Debug, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryObjectStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put fail.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent delete fail.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        validate_key(key)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(GovernanceError::Collaborator("object storage unavailable".to_string()));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(key.to_string())
    }

    async fn signed_get(&self, key: &str, ttl: Duration) -> Result<String> {
        if !self.objects.read().await.contains_key(key) {
            return Err(GovernanceError::not_found("Object", key));
        }
        let expires = (Utc::now() + ttl).timestamp();
        Ok(format!("memory://{key}?expires={expires}"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(GovernanceError::Collaborator("object storage unavailable".to_string()));
        }
        self.objects.write().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// Local filesystem storage
// ============================================================================

/// Filesystem-backed storage with HMAC-signed download URLs.
///
/// URLs look like `{base_url}/files/{key}?expires={unix}&signature={sig}`
/// where `sig` is `HMAC-SHA256(secret, "{key}:{expires}")`, base64url.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    base_url: String,
    secret: Vec<u8>,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| GovernanceError::Collaborator(format!("invalid signing key: {e}")))
    }

    fn sign(&self, key: &str, expires: i64) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(format!("{key}:{expires}").as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Check a signed URL's parameters.
    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires || validate_key(key).is_err() {
            return false;
        }
        let Ok(provided) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(format!("{key}:{expires}").as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Read an object's bytes.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GovernanceError::not_found("Object", key))
            }
            Err(e) => Err(GovernanceError::Collaborator(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GovernanceError::Collaborator(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GovernanceError::Collaborator(e.to_string()))?;
        Ok(key.to_string())
    }

    async fn signed_get(&self, key: &str, ttl: Duration) -> Result<String> {
        validate_key(key)?;
        let expires = (Utc::now() + ttl).timestamp();
        let signature = self.sign(key, expires)?;
        Ok(format!(
            "{}/files/{key}?expires={expires}&signature={signature}",
            self.base_url
        ))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GovernanceError::Collaborator(e.to_string())),
        }
    }
}
