//! Request-scoped scratch files.
//!
//! Every upload is streamed into its own file under the scratch directory so
//! the OCR engine can read it from disk. Files are named
//! `<prefix><uuid-v4>.<ext>`; concurrent requests never share a name and need
//! no locking.
//!
//! A [`ScratchFile`] owns its file. Call [`ScratchFile::release`] when done;
//! if the handle is dropped instead (early return, cancelled request, panic),
//! `Drop` removes the file synchronously.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScratchConfig;
use crate::error::{Result, ScanlineError};

const FALLBACK_EXTENSION: &str = "img";
const MAX_EXTENSION_LEN: usize = 8;

/// Client-supplied metadata about an upload. Only used to pick a file
/// extension; never trusted as a path.
#[derive(Debug, Clone, Default)]
pub struct UploadHint {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    prefix: String,
    stale_after: Duration,
}

impl ScratchDir {
    pub fn new(config: &ScratchConfig) -> Self {
        Self {
            root: config.dir.clone(),
            prefix: config.prefix.clone(),
            stale_after: Duration::from_secs(config.stale_after_secs),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory, check it is writable and optionally remove
    /// files left behind by a previous run. Returns the number removed.
    ///
    /// Only prefixed files last modified at least `stale_after` ago are swept;
    /// the directory may be shared with instances that are still serving.
    /// Files with an unreadable or future mtime are kept.
    pub async fn prepare(&self, sweep: bool) -> Result<usize> {
        tokio::fs::create_dir_all(&self.root).await?;

        let probe = self.root.join(format!("{}probe-{}", self.prefix, Uuid::new_v4()));
        tokio::fs::write(&probe, b"")
            .await
            .map_err(|e| ScanlineError::StorageWrite(format!("{}: {e}", self.root.display())))?;
        tokio::fs::remove_file(&probe).await?;

        if !sweep {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.starts_with(&self.prefix) || !entry.file_type().await?.is_file() {
                continue;
            }
            if !self.is_stale(&entry.metadata().await?) {
                debug!(file = %name, "Keeping recent scratch file");
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %name, error = %e, "Failed to remove stale scratch file"),
            }
        }

        if removed > 0 {
            info!(removed, dir = %self.root.display(), "Removed stale scratch files");
        }
        Ok(removed)
    }

    /// Stream an upload into a fresh scratch file.
    ///
    /// Filesystem failures are `StorageWrite`; errors yielded by the stream
    /// itself are passed through. An empty upload is rejected. No file is left
    /// behind when this returns an error.
    pub async fn acquire<S, E>(&self, stream: S, hint: &UploadHint) -> Result<ScratchFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<ScanlineError>,
    {
        let path = self.root.join(self.file_name(hint));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| ScanlineError::StorageWrite(format!("{}: {e}", path.display())))?;

        let mut artifact = ScratchFile {
            path,
            len: 0,
            armed: true,
        };

        match write_stream(file, stream).await {
            Ok(0) => {
                artifact.release().await;
                Err(ScanlineError::Input("Uploaded file is empty".to_string()))
            }
            Ok(len) => {
                artifact.len = len;
                debug!(artifact = %artifact.path.display(), bytes = len, "Upload written to scratch");
                Ok(artifact)
            }
            Err(e) => {
                artifact.release().await;
                Err(e)
            }
        }
    }

    fn is_stale(&self, metadata: &std::fs::Metadata) -> bool {
        metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= self.stale_after)
    }

    fn file_name(&self, hint: &UploadHint) -> String {
        format!("{}{}.{}", self.prefix, Uuid::new_v4(), extension_for(hint))
    }
}

async fn write_stream<S, E>(file: File, stream: S) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<ScanlineError>,
{
    futures::pin_mut!(stream);
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ScanlineError::StorageWrite(e.to_string()))?;
        written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ScanlineError::StorageWrite(e.to_string()))?;

    Ok(written)
}

fn sanitize_extension(ext: &str) -> Option<String> {
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

fn extension_for(hint: &UploadHint) -> String {
    let from_name = hint
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .and_then(sanitize_extension);

    let from_mime = || {
        hint.content_type
            .as_deref()
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .and_then(|ext| sanitize_extension(ext))
    };

    from_name
        .or_else(from_mime)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// A scratch file owned by one request.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    len: u64,
    armed: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the file. Failures are logged and otherwise ignored.
    pub async fn release(mut self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(artifact = %self.path.display(), "Scratch file released"),
            Err(e) => warn!(
                artifact = %self.path.display(),
                error = %e,
                "Failed to remove scratch file"
            ),
        }
        // Only disarm once the attempt finished; a cancelled release still
        // falls back to Drop.
        self.armed = false;
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(artifact = %self.path.display(), "Scratch file removed on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                artifact = %self.path.display(),
                error = %e,
                "Failed to remove scratch file on drop"
            ),
        }
    }
}
