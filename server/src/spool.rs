use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, TryStreamExt};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Spooled temporary byte source owned by exactly one batch item.
///
/// The multipart boundary drains each incoming file part to a scratch
/// file so at most one file's bytes are held in memory at a time later,
/// when the executor reads it back. Release is explicit rather than
/// drop-based so every exit path of the executor can be audited, and a
/// failed release is logged, never escalated.
pub struct TempSource {
    path: PathBuf,
}

impl TempSource {
    /// Drains `stream` into a fresh scratch file under `dir` and returns
    /// the source together with the number of bytes spooled.
    pub async fn spool<S, E>(dir: &Path, stream: S) -> io::Result<(Self, u64)>
    where
        S: Stream<Item = Result<Bytes, E>> + StreamExt,
        E: Sync + std::error::Error + Send + 'static,
    {
        let path = dir.join(format!("{}.part", Uuid::new_v4()));

        let body_with_io_error = stream.map_err(io::Error::other);
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let mut file = tokio::fs::File::create(&path).await?;
        let spooled = async {
            let n = tokio::io::copy(&mut body_reader, &mut file).await?;
            file.flush().await?;
            Ok::<u64, io::Error>(n)
        }
        .await;
        drop(file);

        match spooled {
            Ok(spooled) => Ok((Self { path }, spooled)),
            Err(e) => {
                // half-written scratch file, drop it right away
                Self { path }.release().await;
                Err(e)
            }
        }
    }

    /// Reads the spooled bytes back. The source stays acquired, callers
    /// must still `release` it afterwards.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Removes the scratch file. Failure is logged only: a leftover
    /// scratch file must never flip an otherwise successful upload.
    pub async fn release(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!("scratch file {} not released: {e}", self.path.display());
        }
    }
}
