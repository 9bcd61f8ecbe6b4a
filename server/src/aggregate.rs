use std::collections::BTreeMap;

use kernel::{BatchSummary, UploadResult, ROOT_GROUP};

/// Computes the aggregate view over one batch of results.
///
/// Pure function: counts, the total size of successful uploads and the
/// partition of results by declared folder. Results without a folder
/// land under the literal `"root"` key. Within a group the
/// orchestrator's output order is preserved.
#[must_use]
pub fn summarize(results: &[UploadResult]) -> BatchSummary {
    let successful = results.iter().filter(|r| r.success).count();
    let total_size = results
        .iter()
        .filter(|r| r.success)
        .map(|r| r.size.unwrap_or_default())
        .sum();

    let mut folder_groups: BTreeMap<String, Vec<UploadResult>> = BTreeMap::new();
    for result in results {
        let folder = if result.original_path.is_empty() {
            ROOT_GROUP.to_string()
        } else {
            result.original_path.clone()
        };
        folder_groups.entry(folder).or_default().push(result.clone());
    }

    BatchSummary {
        total: results.len(),
        successful,
        failed: results.len() - successful,
        total_size,
        folder_groups,
    }
}

/// One line outcome summary placed in the response body.
#[must_use]
pub fn batch_message(summary: &BatchSummary) -> String {
    format!(
        "Upload completed. {} files uploaded successfully, {} failed.",
        summary.successful, summary.failed
    )
}
