//! ZIP archive creation
//!
//! A background task writes the archive into a temporary file while the
//! response reads it back. `zip` goes back to patch an entry's header once
//! the entry is complete, so only bytes before the entry currently being
//! written are handed out. Memory use stays at one entry whatever the batch
//! size, and the first entry reaches the client before the last one is read.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use pixshrink_storage::{FileStore, StorageError};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Highest deflate level
const COMPRESSION_LEVEL: i32 = 9;

const CHUNK_SIZE: u64 = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive task failed: {0}")]
    Task(String),

    #[error("archive build failed: {0}")]
    Build(String),

    #[error("archive reader went away")]
    Abandoned,
}

/// Response body of an archive
pub type ArchiveBody = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Clone)]
enum Progress {
    /// Bytes before `committed` are final
    Writing { committed: u64 },
    Finished { size: u64 },
    Failed(String),
}

/// File writer that records how far the file extends
struct SpoolWriter {
    file: std::fs::File,
    position: u64,
    end: Arc<AtomicU64>,
}

impl Write for SpoolWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.file.write(buf)?;
        self.position += written as u64;
        self.end.fetch_max(self.position, Ordering::SeqCst);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for SpoolWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.file.seek(pos)?;
        Ok(self.position)
    }
}

/// An archive being built, ready to be streamed
pub struct ZipArchiveStream {
    reader: tokio::fs::File,
    progress: watch::Receiver<Progress>,
    sent: u64,
    failed: bool,
    // Removes the spool file once the body is gone.
    _spool: NamedTempFile,
}

/// Entry name inside the archive: the bare filename, never a path.
fn entry_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("unnamed")
        .to_string()
}

fn task_error(e: tokio::task::JoinError) -> ArchiveError {
    ArchiveError::Task(e.to_string())
}

/// Start building a ZIP of the named store files.
///
/// Duplicate names are added once and files that do not exist are skipped.
/// Invalid names fail immediately. Returns once the first bytes are final or
/// the archive is complete, so a failure before that is still an error here
/// rather than a broken body.
pub async fn create_zip_archive(
    store: Arc<dyn FileStore>,
    filenames: &[String],
) -> Result<ZipArchiveStream, ArchiveError> {
    let mut unique: Vec<String> = Vec::with_capacity(filenames.len());
    for filename in filenames {
        store.resolve(filename)?;
        if !unique.contains(filename) {
            unique.push(filename.clone());
        }
    }

    let (spool, writer_file, reader_file) =
        tokio::task::spawn_blocking(|| -> io::Result<_> {
            let spool = NamedTempFile::new()?;
            let writer_file = spool.reopen()?;
            let reader_file = spool.reopen()?;
            Ok((spool, writer_file, reader_file))
        })
        .await
        .map_err(task_error)??;

    let (progress_tx, mut progress) = watch::channel(Progress::Writing { committed: 0 });
    tokio::spawn(write_archive(store, unique, writer_file, progress_tx));

    wait_for_first_bytes(&mut progress).await?;

    Ok(ZipArchiveStream {
        reader: tokio::fs::File::from_std(reader_file),
        progress,
        sent: 0,
        failed: false,
        _spool: spool,
    })
}

async fn wait_for_first_bytes(progress: &mut watch::Receiver<Progress>) -> Result<(), ArchiveError> {
    loop {
        let ready = match &*progress.borrow_and_update() {
            Progress::Writing { committed } => *committed > 0,
            Progress::Finished { .. } => true,
            Progress::Failed(message) => return Err(ArchiveError::Build(message.clone())),
        };
        if ready {
            return Ok(());
        }
        progress
            .changed()
            .await
            .map_err(|_| ArchiveError::Task("archive writer stopped".to_string()))?;
    }
}

async fn write_archive(
    store: Arc<dyn FileStore>,
    filenames: Vec<String>,
    file: std::fs::File,
    progress: watch::Sender<Progress>,
) {
    match write_entries(store, &filenames, file, &progress).await {
        Ok(size) => {
            progress.send_replace(Progress::Finished { size });
        }
        Err(ArchiveError::Abandoned) => {
            tracing::debug!("ZIP download abandoned, archive left unfinished");
        }
        Err(e) => {
            tracing::error!(error = %e, "ZIP archive creation failed");
            progress.send_replace(Progress::Failed(e.to_string()));
        }
    }
}

async fn write_entries(
    store: Arc<dyn FileStore>,
    filenames: &[String],
    file: std::fs::File,
    progress: &watch::Sender<Progress>,
) -> Result<u64, ArchiveError> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .unix_permissions(0o644);

    let end = Arc::new(AtomicU64::new(0));
    let mut writer = ZipWriter::new(SpoolWriter {
        file,
        position: 0,
        end: end.clone(),
    });
    let mut entries = 0usize;
    let mut skipped = 0usize;

    for filename in filenames {
        if progress.is_closed() {
            return Err(ArchiveError::Abandoned);
        }

        let data = match store.read(filename).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(filename = %filename, "File missing, leaving it out of the archive");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let name = entry_name(filename);
        let end = end.clone();
        let (next, committed) = tokio::task::spawn_blocking(move || -> Result<_, ArchiveError> {
            // Starting the next entry finalizes everything written so far.
            let committed = end.load(Ordering::SeqCst);
            writer.start_file(name, options)?;
            writer.write_all(&data)?;
            Ok((writer, committed))
        })
        .await
        .map_err(task_error)??;

        writer = next;
        entries += 1;
        progress.send_replace(Progress::Writing { committed });
    }

    let size = tokio::task::spawn_blocking(move || -> Result<u64, ArchiveError> {
        let mut spool = writer.finish()?;
        spool.flush()?;
        Ok(spool.end.load(Ordering::SeqCst))
    })
    .await
    .map_err(task_error)??;

    tracing::info!(entries, skipped, size_bytes = size, "ZIP archive created");
    Ok(size)
}

impl ZipArchiveStream {
    /// Chunks of the archive as they become final
    pub fn into_body(self) -> ArchiveBody {
        Box::pin(futures::stream::unfold(self, |mut archive| async move {
            if archive.failed {
                return None;
            }
            match archive.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), archive)),
                Ok(None) => None,
                Err(e) => {
                    archive.failed = true;
                    Some((Err(e), archive))
                }
            }
        }))
    }

    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            let (limit, finished) = match &*self.progress.borrow_and_update() {
                Progress::Writing { committed } => (*committed, false),
                Progress::Finished { size } => (*size, true),
                Progress::Failed(message) => return Err(io::Error::other(message.clone())),
            };

            if self.sent < limit {
                let mut buf = vec![0u8; (limit - self.sent).min(CHUNK_SIZE) as usize];
                let read = self.reader.read(&mut buf).await?;
                if read == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "archive spool ended early",
                    ));
                }
                buf.truncate(read);
                self.sent += read as u64;
                return Ok(Some(Bytes::from(buf)));
            }

            if finished {
                return Ok(None);
            }
            if self.progress.changed().await.is_err() {
                return Err(io::Error::other("archive writer stopped"));
            }
        }
    }
}
