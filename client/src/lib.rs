use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::{ErrorResponse, UploadResponse};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::queue::{ItemStatus, QueueEvent, QueueState};

pub mod queue;

/// Files larger than this are rejected locally before they are queued.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

pub struct BatchParams {
    pub uri: String,
    /// Files and directories; directories expand recursively and their
    /// contents keep a relative folder path, like a directory picker.
    pub paths: Vec<String>,
}

struct LocalFile {
    path: PathBuf,
    file_name: String,
    folder_path: String,
    size: u64,
}

/// Uploads a set of files and directories as one batch and prints the
/// per-file report the server returned.
pub async fn upload_batch(params: BatchParams) {
    let files = match collect_files(&params.paths) {
        Ok(files) => files,
        Err(e) => {
            println!("upload error: {e}");
            return;
        }
    };

    let mut state = QueueState::default();
    let mut queued: Vec<LocalFile> = Vec::new();
    for file in files {
        // local pre-check, oversized files are never enqueued
        if file.size > MAX_FILE_SIZE {
            println!(
                "skipping {}: larger than {MAX_FILE_SIZE} bytes",
                file.path.display()
            );
            continue;
        }
        state = state.apply(QueueEvent::ItemAdded {
            id: file.path.display().to_string(),
            file_name: file.file_name.clone(),
            size: file.size,
            folder_path: file.folder_path.clone(),
        });
        queued.push(file);
    }

    if queued.is_empty() {
        println!("nothing to upload");
        return;
    }

    let Some(endpoint) = batch_endpoint(&params.uri) else {
        println!("invalid server URI: {}", params.uri);
        return;
    };

    let form = match build_form(&queued).await {
        Ok(form) => form,
        Err(e) => {
            println!("upload error: {e}");
            return;
        }
    };
    state = state.apply(QueueEvent::BatchSubmitted);

    let client = Client::new();
    let response = match client.post(endpoint).multipart(form).send().await {
        Ok(response) => response,
        Err(e) => {
            state = state.apply(QueueEvent::BatchFailed {
                error: e.to_string(),
            });
            print_queue(&state);
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        state = state.apply(QueueEvent::BatchFailed {
            error: format!("{status}: {error}"),
        });
        print_queue(&state);
        return;
    }

    match response.json::<UploadResponse>().await {
        Ok(report) => {
            println!("{}", report.message);
            state = state.apply(QueueEvent::BatchSettled {
                results: report.results,
            });
            print_queue(&state);
        }
        Err(e) => println!("JSON decode error: {e}"),
    }
}

/// Expands the given paths into files; a directory contributes all its
/// files with folder paths relative to the directory's parent, so the
/// selected directory name stays the top folder segment.
fn collect_files(paths: &[String]) -> io::Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    for raw in paths {
        let path = PathBuf::from(raw);
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            let base = path.parent().unwrap_or(path.as_path()).to_path_buf();
            let mut handler = |entry: &fs::DirEntry| {
                if let Ok(meta) = entry.metadata() {
                    if let Some(file) = local_file(&entry.path(), &base, meta.len()) {
                        files.push(file);
                    }
                }
            };
            visit_dirs(&path, &mut handler)?;
        } else if let Some(file) = local_file(&path, path.parent().unwrap_or(Path::new("")), meta.len()) {
            files.push(file);
        }
    }
    Ok(files)
}

fn local_file(path: &Path, base: &Path, size: u64) -> Option<LocalFile> {
    let file_name = path.file_name()?.to_str()?.to_string();
    let folder_path = path
        .parent()
        .and_then(|parent| parent.strip_prefix(base).ok())
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    Some(LocalFile {
        path: path.to_path_buf(),
        file_name,
        folder_path,
        size,
    })
}

fn visit_dirs(dir: &Path, cb: &mut dyn FnMut(&fs::DirEntry)) -> io::Result<()> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                visit_dirs(&path, cb)?;
            } else {
                cb(&entry);
            }
        }
    }
    Ok(())
}

fn batch_endpoint(uri: &str) -> Option<Url> {
    let base = Url::parse(uri).ok()?;
    base.join("/api/batch").ok()
}

/// One `files` part per item plus an index-aligned `folderPaths` text
/// part, the shape the server boundary expects.
async fn build_form(files: &[LocalFile]) -> io::Result<Form> {
    let mut form = Form::new();
    for file in files {
        let f = File::open(&file.path).await?;
        let stream = ReaderStream::new(f);
        let stream = reqwest::Body::wrap_stream(stream);
        let part =
            Part::stream_with_length(stream, file.size).file_name(file.file_name.clone());
        form = form.part("files", part);
    }
    for file in files {
        form = form.text("folderPaths", file.folder_path.clone());
    }
    Ok(form)
}

fn print_queue(state: &QueueState) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("Folder").add_attribute(Attribute::Bold),
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Size").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for item in &state.items {
        let folder = if item.folder_path.is_empty() {
            kernel::ROOT_GROUP
        } else {
            &item.folder_path
        };
        let status = match &item.status {
            ItemStatus::Pending => "pending".to_string(),
            ItemStatus::Uploading => "uploading".to_string(),
            ItemStatus::Success => "ok".to_string(),
            ItemStatus::Error(e) => format!("failed: {e}"),
        };
        table.add_row(vec![
            Cell::new(folder),
            Cell::new(&item.file_name),
            Cell::new(item.size),
            Cell::new(status),
        ]);
    }
    println!("{table}");
    println!(
        "{} files, {} bytes: {} uploaded, {} failed",
        state.total_files,
        state.total_size,
        state.succeeded(),
        state.failed()
    );
}
