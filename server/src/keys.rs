/// Makes a user supplied relative folder path safe to use as a storage
/// key prefix. Every character outside `[A-Za-z0-9_/-]` becomes `_` so
/// directory nesting survives while anything shell- or URL-hostile is
/// neutralized. Empty input stays empty, the caller decides the default.
#[must_use]
pub fn sanitize_folder(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Builds the storage key for one file of a batch.
///
/// The timestamp is the batch submission instant in milliseconds and is
/// shared by every item of the batch, so two items with the same name
/// and folder in one batch derive the same key and the later write wins.
/// The original file name is used verbatim, extension included.
#[must_use]
pub fn derive_key(timestamp: i64, sanitized_folder: &str, original_name: &str) -> String {
    if sanitized_folder.is_empty() {
        format!("{timestamp}-{original_name}")
    } else {
        format!("{sanitized_folder}/{timestamp}-{original_name}")
    }
}
