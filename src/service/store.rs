// Object storage
// Trait seam for the storage backend plus a filesystem implementation

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::service::ServiceConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("failed to resolve a data directory")]
    NoDataDir,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Storage backend for uploaded audio. The service only ever needs
/// put/get; cloud-backed stores implement the same seam.
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<StoredObject>;
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
}

/// Filesystem-backed object store rooted at `<data_dir>/<bucket>`.
pub struct FsObjectStore {
    bucket_dir: PathBuf,
    bucket: String,
    public_base_url: Option<String>,
}

impl FsObjectStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &ServiceConfig) -> StoreResult<Self> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or(StoreError::NoDataDir)?
                .join("drumscribe"),
        };
        Self::with_root(data_dir, &config.bucket, config.public_base_url.clone())
    }

    /// Open a store under an explicit root directory.
    pub fn with_root(
        root: impl Into<PathBuf>,
        bucket: &str,
        public_base_url: Option<String>,
    ) -> StoreResult<Self> {
        let bucket_dir = root.into().join(bucket);
        fs::create_dir_all(&bucket_dir)?;

        Ok(FsObjectStore {
            bucket_dir,
            bucket: bucket.to_string(),
            public_base_url,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.bucket_dir.join(key))
    }

    fn object_url(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("file://{}", path.display()),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<StoredObject> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(&path)?;
        file.write_all(data)?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());

        log::debug!("stored {} ({} bytes) in bucket {}", key, data.len(), self.bucket);

        Ok(StoredObject {
            key: key.to_string(),
            url: self.object_url(key, &path),
            sha256,
            size_bytes: data.len() as u64,
        })
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys must be non-empty relative paths that stay inside the bucket.
fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("empty key".to_string()));
    }

    let path = Path::new(key);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(StoreError::InvalidKey(format!(
                    "key must be a plain relative path: {}",
                    key
                )));
            }
        }
    }

    Ok(())
}
