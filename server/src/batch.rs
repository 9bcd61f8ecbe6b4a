use kernel::UploadResult;

use crate::domain::{ObjectMeta, ObjectStore};
use crate::error::UploadError;
use crate::keys::{derive_key, sanitize_folder};
use crate::spool::TempSource;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file of an inbound batch, as assembled at the multipart boundary.
///
/// `source` is `None` when the part could not be spooled; such an item
/// still travels through the orchestrator so its failure is reported
/// under its declared name instead of aborting the request.
pub struct BatchItem {
    pub file_name: String,
    pub folder_path: String,
    pub content_type: Option<String>,
    pub source: Option<TempSource>,
}

/// Uploads every item of a batch in submission order.
///
/// `timestamp` is captured once per batch and shared by all derived
/// keys. One item's failure never skips or alters the processing of
/// subsequent items; only the executor's declared error type is folded
/// into a failure result. No retries happen here.
pub async fn run_batch<S: ObjectStore>(
    store: &S,
    items: Vec<BatchItem>,
    timestamp: i64,
) -> Vec<UploadResult> {
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let file_name = item.file_name.clone();
        let folder_path = item.folder_path.clone();

        let folder = sanitize_folder(&item.folder_path);
        let key = derive_key(timestamp, &folder, &item.file_name);

        match upload_one(store, item, &key, timestamp).await {
            Ok(result) => {
                tracing::info!(
                    "file: {} uploaded as {} size: {}",
                    result.file_name,
                    key,
                    result.size.unwrap_or_default()
                );
                results.push(result);
            }
            Err(e) => {
                tracing::error!("file '{file_name}' not uploaded. Error: {e}");
                results.push(UploadResult::failed(file_name, folder_path, e.to_string()));
            }
        }
    }
    results
}

/// Uploads a single item under an already derived key.
///
/// The item's temporary byte source is released on every exit path.
/// Steps: read back the spooled bytes, write them to the backend with
/// content type and metadata, resolve the retrieval URL.
pub async fn upload_one<S: ObjectStore>(
    store: &S,
    item: BatchItem,
    key: &str,
    timestamp: i64,
) -> Result<UploadResult, UploadError> {
    let source = item.source.ok_or(UploadError::MissingSource)?;

    let data = match source.read().await {
        Ok(data) => data,
        Err(e) => {
            source.release().await;
            return Err(UploadError::Source(e));
        }
    };
    let size = data.len() as u64;

    let meta = ObjectMeta {
        original_path: item.folder_path.clone(),
        original_name: item.file_name.clone(),
        upload_timestamp: timestamp,
        file_size: size,
    };
    let content_type = item
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    if let Err(e) = store.put_object(key, data, content_type, &meta).await {
        source.release().await;
        return Err(UploadError::BackendWrite(e.to_string()));
    }

    let url = match store.resolve_url(key).await {
        Ok(url) => url,
        Err(e) => {
            source.release().await;
            return Err(UploadError::UrlResolution(e.to_string()));
        }
    };

    source.release().await;

    Ok(UploadResult::succeeded(
        item.file_name,
        item.folder_path,
        key.to_string(),
        url,
        size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store that can be told to reject writes for keys
    /// containing a marker substring.
    #[derive(Default)]
    struct MemStore {
        objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        reject_keys_containing: Option<String>,
        puts: AtomicUsize,
    }

    impl MemStore {
        fn rejecting(marker: &str) -> Self {
            Self {
                reject_keys_containing: Some(marker.to_string()),
                ..Self::default()
            }
        }

        fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for MemStore {
        type Err = String;

        async fn ensure_container(&self) -> Result<(), Self::Err> {
            Ok(())
        }

        async fn put_object(
            &self,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
            _meta: &ObjectMeta,
        ) -> Result<(), Self::Err> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = &self.reject_keys_containing {
                if key.contains(marker.as_str()) {
                    return Err(format!("write rejected for {key}"));
                }
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (data, content_type.to_string()));
            Ok(())
        }

        async fn resolve_url(&self, key: &str) -> Result<String, Self::Err> {
            Ok(format!("mem://{key}"))
        }
    }

    async fn item(scratch: &Path, name: &str, folder: &str, content: &[u8]) -> BatchItem {
        let stream =
            futures::stream::iter(vec![Ok::<Bytes, io::Error>(Bytes::copy_from_slice(content))]);
        let (source, _) = TempSource::spool(scratch, stream).await.unwrap();
        BatchItem {
            file_name: name.to_string(),
            folder_path: folder.to_string(),
            content_type: None,
            source: Some(source),
        }
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn run_batch_preserves_order_and_shares_timestamp() {
        // Arrange
        let scratch = TempDir::new().unwrap();
        let store = MemStore::default();
        let items = vec![
            item(scratch.path(), "f1", "", b"f1").await,
            item(scratch.path(), "f2", "docs", b"f2f2").await,
            item(scratch.path(), "f3", "docs", b"f3").await,
        ];

        // Act
        let results = run_batch(&store, items, 1700000000000).await;

        // Assert
        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["f1", "f2", "f3"]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(
            results[0].blob_path.as_deref(),
            Some("1700000000000-f1")
        );
        assert_eq!(
            results[1].blob_path.as_deref(),
            Some("docs/1700000000000-f2")
        );
        assert_eq!(
            results[2].blob_path.as_deref(),
            Some("docs/1700000000000-f3")
        );
        assert_eq!(store.keys().len(), 3);
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn failing_item_does_not_affect_siblings() {
        // Arrange
        let scratch = TempDir::new().unwrap();
        let store = MemStore::rejecting("bad");
        let items = vec![
            item(scratch.path(), "good.txt", "", b"ok").await,
            item(scratch.path(), "bad.txt", "", b"nope").await,
            item(scratch.path(), "also-good.txt", "", b"ok2").await,
        ];

        // Act
        let results = run_batch(&store, items, 1).await;

        // Assert
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        let error = results[1].error.as_deref().unwrap();
        assert!(error.contains("write rejected"), "unexpected error: {error}");
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn malformed_item_reports_failure_under_declared_name() {
        // Arrange
        let scratch = TempDir::new().unwrap();
        let store = MemStore::default();
        let items = vec![
            BatchItem {
                file_name: "ghost.bin".to_string(),
                folder_path: "docs".to_string(),
                content_type: None,
                source: None,
            },
            item(scratch.path(), "real.bin", "", b"data").await,
        ];

        // Act
        let results = run_batch(&store, items, 1).await;

        // Assert
        assert!(!results[0].success);
        assert_eq!(results[0].file_name, "ghost.bin");
        assert_eq!(results[0].original_path, "docs");
        assert!(results[1].success);
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn duplicate_name_in_one_batch_overwrites() {
        // Arrange
        let scratch = TempDir::new().unwrap();
        let store = MemStore::default();
        let items = vec![
            item(scratch.path(), "logo.png", "", b"first").await,
            item(scratch.path(), "logo.png", "", b"second").await,
        ];

        // Act
        let results = run_batch(&store, items, 7).await;

        // Assert
        assert_eq!(results[0].blob_path, results[1].blob_path);
        assert_eq!(store.puts.load(Ordering::SeqCst), 2);
        assert_eq!(store.keys(), vec!["7-logo.png".to_string()]);
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects["7-logo.png"].0, b"second");
    }

    #[tokio::test]
    async fn executor_falls_back_to_octet_stream_content_type() {
        // Arrange
        let scratch = TempDir::new().unwrap();
        let store = MemStore::default();
        let items = vec![item(scratch.path(), "noext", "", b"x").await];

        // Act
        let results = run_batch(&store, items, 1).await;

        // Assert
        assert!(results[0].success);
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects["1-noext"].1, DEFAULT_CONTENT_TYPE);
    }
}
