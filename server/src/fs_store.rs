use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::domain::{ObjectMeta, ObjectStore};

/// Object store rooted in a local directory.
///
/// Containers are direct subdirectories of the root, keys map to paths
/// below the container. Objects become visible atomically: bytes are
/// written to a scratch sibling first and renamed into place, so a key
/// is either fully present or absent. Metadata travels in a `.meta`
/// sidecar next to the object, carrying what a cloud backend would
/// attach as blob metadata.
pub struct FsStore {
    root: PathBuf,
    container: String,
    public_url: String,
}

#[derive(Debug, Error)]
pub enum FsStoreError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SidecarMeta<'a> {
    content_type: &'a str,
    original_path: &'a str,
    original_name: &'a str,
    upload_timestamp: i64,
    file_size: u64,
}

impl FsStore {
    #[must_use]
    pub fn new(root: PathBuf, container: String, public_url: String) -> Self {
        Self {
            root,
            container,
            public_url,
        }
    }

    fn container_dir(&self) -> PathBuf {
        self.root.join(&self.container)
    }

    /// Maps a storage key to a path below the container directory,
    /// rejecting keys that could escape it.
    fn key_to_path(&self, key: &str) -> Result<PathBuf, FsStoreError> {
        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return Err(FsStoreError::InvalidKey(key.to_string()));
        }
        if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
            return Err(FsStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.container_dir().join(key))
    }

    async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    type Err = FsStoreError;

    async fn ensure_container(&self) -> Result<(), Self::Err> {
        fs::create_dir_all(self.container_dir()).await?;
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<(), Self::Err> {
        let path = self.key_to_path(key)?;
        Self::ensure_parent_dir(&path).await?;

        let size = data.len();
        let scratch = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&scratch, data).await?;
        if let Err(e) = fs::rename(&scratch, &path).await {
            fs::remove_file(&scratch).await.unwrap_or_default();
            return Err(e.into());
        }

        let sidecar = SidecarMeta {
            content_type,
            original_path: &meta.original_path,
            original_name: &meta.original_name,
            upload_timestamp: meta.upload_timestamp,
            file_size: meta.file_size,
        };
        let encoded = serde_json::to_vec_pretty(&sidecar).map_err(io::Error::other)?;
        fs::write(sidecar_path(&path), encoded).await?;

        tracing::info!("object {} written, {} bytes", path.display(), size);
        Ok(())
    }

    async fn resolve_url(&self, key: &str) -> Result<String, Self::Err> {
        // validate even though no file access happens
        self.key_to_path(key)?;
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!(
            "{}/{}/{encoded}",
            self.public_url.trim_end_matches('/'),
            self.container
        ))
    }
}

fn sidecar_path(object: &Path) -> PathBuf {
    let mut s = object.as_os_str().to_owned();
    s.push(".meta");
    PathBuf::from(s)
}
