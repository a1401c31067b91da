//! Object storage interface and a directory-backed implementation.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Options attached to an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Grant anonymous read access.
    pub public: bool,
    /// User metadata stored with the object.
    pub metadata: BTreeMap<String, String>,
}

/// Minimal object-store capability used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy `bucket/key` to `local_path`.
    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> wc_core::Result<()>;

    /// Store the file at `local_path` as `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        options: &UploadOptions,
    ) -> wc_core::Result<()>;

    /// Remove `bucket/key`.
    async fn delete(&self, bucket: &str, key: &str) -> wc_core::Result<()>;
}

/// Object store whose buckets are sub-directories of `root`.
///
/// Upload options are kept as JSON sidecars under `root/.meta/<bucket>/`.
/// Deleting an object that does not exist succeeds.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of `bucket/key`, rejecting keys that escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> wc_core::Result<PathBuf> {
        check_segment(bucket, key, bucket)?;
        check_segment(bucket, key, key)?;
        Ok(self.root.join(bucket).join(key))
    }

    /// Path of the sidecar holding the upload options of `bucket/key`.
    pub fn metadata_path(&self, bucket: &str, key: &str) -> wc_core::Result<PathBuf> {
        check_segment(bucket, key, bucket)?;
        check_segment(bucket, key, key)?;
        Ok(self
            .root
            .join(".meta")
            .join(bucket)
            .join(format!("{key}.json")))
    }

    /// Read back the options an object was uploaded with.
    pub async fn options(&self, bucket: &str, key: &str) -> wc_core::Result<UploadOptions> {
        let path = self.metadata_path(bucket, key)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;
        serde_json::from_slice(&bytes).map_err(|e| wc_core::Error::store(bucket, key, e))
    }
}

fn check_segment(bucket: &str, key: &str, segment: &str) -> wc_core::Result<()> {
    let path = Path::new(segment);
    let escapes = segment.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(wc_core::Error::store(
            bucket,
            key,
            format!("invalid path segment '{segment}'"),
        ));
    }
    Ok(())
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> wc_core::Result<()> {
        let source = self.object_path(bucket, key)?;
        tokio::fs::copy(&source, local_path)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;
        tracing::debug!(bucket, key, dest = %local_path.display(), "Downloaded object");
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        options: &UploadOptions,
    ) -> wc_core::Result<()> {
        let dest = self.object_path(bucket, key)?;
        ensure_parent(&dest)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;
        tokio::fs::copy(local_path, &dest)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;

        let meta_path = self.metadata_path(bucket, key)?;
        ensure_parent(&meta_path)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;
        let meta = serde_json::to_vec(options).map_err(|e| wc_core::Error::store(bucket, key, e))?;
        tokio::fs::write(&meta_path, meta)
            .await
            .map_err(|e| wc_core::Error::store(bucket, key, e))?;

        tracing::debug!(bucket, key, public = options.public, "Uploaded object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> wc_core::Result<()> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(bucket, key, "Object already absent");
            }
            Err(e) => return Err(wc_core::Error::store(bucket, key, e)),
        }

        if let Ok(meta_path) = self.metadata_path(bucket, key) {
            let _ = tokio::fs::remove_file(meta_path).await;
        }
        Ok(())
    }
}
