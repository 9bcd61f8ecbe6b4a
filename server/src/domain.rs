use std::fmt::{Debug, Display};

use async_trait::async_trait;

/// Metadata attached to every stored object alongside its bytes.
pub struct ObjectMeta {
    /// Relative folder declared by the client, empty for root
    pub original_path: String,
    /// File name as submitted by the client
    pub original_name: String,
    /// Batch submission instant, milliseconds since the Unix epoch
    pub upload_timestamp: i64,
    /// Object size in bytes
    pub file_size: u64,
}

/// Object store the upload pipeline writes into.
///
/// The backend is shared across all items of a batch and across
/// concurrent requests, and is expected to synchronize internally.
/// Writes are atomic from the caller's view: after `put_object`
/// returns an error the key must not be observable half-written.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    type Err: Debug + Display + Send;

    /// Creates the target container when it does not exist yet.
    async fn ensure_container(&self) -> Result<(), Self::Err>;

    /// Writes `data` under `key` with the given content type and metadata.
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        meta: &ObjectMeta,
    ) -> Result<(), Self::Err>;

    /// Resolves the retrieval URL of a stored object. Whether the URL is
    /// plain or time-bounded/signed is the implementation's choice.
    async fn resolve_url(&self, key: &str) -> Result<String, Self::Err>;
}
