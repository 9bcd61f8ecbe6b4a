#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of uploading a single file from a batch.
///
/// One result is produced per submitted file, in submission order,
/// whether the upload succeeded or not. Field names are camelCase on
/// the wire to match the upload clients.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Whether the file was written to the object store
    pub success: bool,
    /// Original file name as submitted by the client
    pub file_name: String,
    /// Relative folder the client declared for this file, empty for root
    #[serde(default)]
    pub original_path: String,
    /// Storage key the object was written under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_path: Option<String>,
    /// Retrieval URL of the stored object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Size of the stored object in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Underlying error message when the upload failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    #[must_use]
    pub fn succeeded(
        file_name: String,
        original_path: String,
        blob_path: String,
        url: String,
        size: u64,
    ) -> Self {
        Self {
            success: true,
            file_name,
            original_path,
            blob_path: Some(blob_path),
            url: Some(url),
            size: Some(size),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(file_name: String, original_path: String, error: String) -> Self {
        Self {
            success: false,
            file_name,
            original_path,
            blob_path: None,
            url: None,
            size: None,
            error: Some(error),
        }
    }
}

/// Aggregate view over one batch of upload results.
///
/// Computed from the per-file results at response time and never
/// persisted. `total_size` counts successful uploads only.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Number of files in the batch
    pub total: usize,
    /// Number of files written to the object store
    pub successful: usize,
    /// Number of files that failed
    pub failed: usize,
    /// Sum of sizes of successfully uploaded files, in bytes
    pub total_size: u64,
    /// Results partitioned by declared folder, `"root"` for files without one
    pub folder_groups: BTreeMap<String, Vec<UploadResult>>,
}

/// Body of a successful batch upload response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Human readable one line outcome summary
    pub message: String,
    /// Per file outcomes in submission order
    pub results: Vec<UploadResult>,
    /// Aggregate counts and folder grouping
    pub summary: BatchSummary,
}

/// Body of a whole-request failure response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// What precondition failed for the whole request
    pub error: String,
}

/// Group key used for files submitted without a folder path.
pub const ROOT_GROUP: &str = "root";
