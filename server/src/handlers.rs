use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use kernel::UploadResponse;

use crate::aggregate::{batch_message, summarize};
use crate::batch::{run_batch, BatchItem};
use crate::domain::ObjectStore;
use crate::error::ApiError;
use crate::fs_store::FsStore;
use crate::spool::TempSource;

/// Per-request resource limits enforced at the multipart boundary,
/// before any backend write happens.
pub struct Limits {
    pub max_file_size: u64,
    pub max_fields: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100MB per file
            max_fields: 1000,
        }
    }
}

pub struct AppState {
    pub store: FsStore,
    pub scratch: PathBuf,
    pub limits: Limits,
}

const FILES_FIELD: &str = "files";
const FOLDER_PATHS_FIELD: &str = "folderPaths";

/// Uploads a batch of files in one multipart request.
///
/// `files` parts carry the raw bytes, `folderPaths` text parts are
/// index-aligned with them; a missing entry means root. Per-item
/// failures are reported inside a 200 response, only whole-request
/// preconditions produce an error status.
#[utoipa::path(
    post,
    path = "/api/batch",
    responses(
        (status = 200, description = "Batch processed, possibly with per-file failures", body = UploadResponse),
        (status = 400, description = "No files in request or malformed form", body = kernel::ErrorResponse),
        (status = 413, description = "A file exceeds the per-file size limit", body = kernel::ErrorResponse),
        (status = 500, description = "Storage backend unavailable", body = kernel::ErrorResponse)
    ),
    tag = "uploads",
)]
pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (mut items, folder_paths) = match collect_parts(&state, multipart).await {
        Ok(collected) => collected,
        Err((items, e)) => {
            release_all(items).await;
            return Err(e);
        }
    };

    if items.is_empty() {
        return Err(ApiError::Validation("no files in request".to_string()));
    }

    // folderPaths are index-aligned with files, missing entries mean root
    for (index, item) in items.iter_mut().enumerate() {
        if let Some(folder) = folder_paths.get(index) {
            item.folder_path.clone_from(folder);
        }
    }

    if let Err(e) = state.store.ensure_container().await {
        release_all(items).await;
        return Err(ApiError::Config(e.to_string()));
    }

    let timestamp = now_millis();
    tracing::info!("batch of {} files at {timestamp}", items.len());

    let results = run_batch(&state.store, items, timestamp).await;
    let summary = summarize(&results);

    Ok(Json(UploadResponse {
        message: batch_message(&summary),
        results,
        summary,
    }))
}

/// Drains the multipart form, spooling every file part to the scratch
/// directory and collecting folder paths in arrival order. On a
/// whole-request error, already spooled items are handed back to the
/// caller for release.
async fn collect_parts(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(Vec<BatchItem>, Vec<String>), (Vec<BatchItem>, ApiError)> {
    let mut items: Vec<BatchItem> = Vec::new();
    let mut folder_paths: Vec<String> = Vec::new();
    let mut fields = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err((items, ApiError::Multipart(e.to_string()))),
        };

        fields += 1;
        if fields > state.limits.max_fields {
            let e = ApiError::Validation(format!(
                "form has more than {} fields",
                state.limits.max_fields
            ));
            return Err((items, e));
        }

        match field.name() {
            Some(FILES_FIELD) => {
                let file_name = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field.content_type().map(str::to_string);
                let source = match TempSource::spool(&state.scratch, field).await {
                    Ok((source, spooled)) => {
                        if spooled > state.limits.max_file_size {
                            source.release().await;
                            let e = ApiError::TooLarge {
                                name: file_name,
                                limit: state.limits.max_file_size,
                            };
                            return Err((items, e));
                        }
                        Some(source)
                    }
                    Err(e) => {
                        // malformed item: report it under its declared name
                        tracing::error!("file '{file_name}' not spooled. Error: {e}");
                        None
                    }
                };
                items.push(BatchItem {
                    file_name,
                    folder_path: String::new(),
                    content_type,
                    source,
                });
            }
            Some(FOLDER_PATHS_FIELD) => {
                folder_paths.push(field.text().await.unwrap_or_default());
            }
            _ => {
                // unknown field, drained by drop
            }
        }
    }

    Ok((items, folder_paths))
}

async fn release_all(items: Vec<BatchItem>) {
    for item in items {
        if let Some(source) = item.source {
            source.release().await;
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
