//! Post-download cleanup
//!
//! Downloads are one-shot: once a derived file has been delivered, it and the
//! upload it came from are removed from the store. [`CleanupStream`] wraps a
//! response body and starts the deletion when the body ends.
//!
//! A server that knows the body length stops polling once it has written
//! that many bytes and drops the body without ever seeing its end, so a
//! stream given an expected length also counts as complete when dropped
//! after yielding all of it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use pixshrink_storage::{DeleteReport, FileStore};
use tokio::task::JoinHandle;

/// When a wrapped body should trigger its cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTrigger {
    /// Only after the body was streamed to the end
    OnCompletion,
    /// After the body ended or was dropped early (client went away, send error)
    Always,
}

/// Files to remove once `served` (derived filenames) have been delivered.
///
/// Each served name is followed by its original when one can be found.
/// Originals are looked up now, before anything is deleted. Duplicates are
/// dropped, first occurrence wins.
pub async fn collect_cleanup_targets(store: &dyn FileStore, served: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::with_capacity(served.len() * 2);

    for filename in served {
        if !targets.contains(filename) {
            targets.push(filename.clone());
        }

        match store.find_original_for(filename).await {
            Ok(Some(original)) => {
                if !targets.contains(&original) {
                    targets.push(original);
                }
            }
            Ok(None) => {
                tracing::debug!(filename = %filename, "No original found for derived file");
            }
            Err(e) => {
                tracing::warn!(
                    filename = %filename,
                    error = %e,
                    "Original lookup failed; only the derived file will be removed"
                );
            }
        }
    }

    targets
}

/// Delete `targets` in the background.
///
/// Returns `None` when no tokio runtime is available to run the deletion.
pub fn schedule_cleanup(
    store: Arc<dyn FileStore>,
    targets: Vec<String>,
    reason: &'static str,
) -> Option<JoinHandle<DeleteReport>> {
    if targets.is_empty() {
        return None;
    }

    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            tracing::warn!(
                files = ?targets,
                reason,
                "No runtime available, skipping cleanup"
            );
            return None;
        }
    };

    Some(handle.spawn(async move {
        let report = store.delete_all(&targets).await;
        if report.is_clean() {
            tracing::info!(
                deleted = report.deleted.len(),
                missing = report.missing.len(),
                reason,
                "Cleaned up delivered files"
            );
        } else {
            tracing::error!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                reason,
                "Cleanup finished with errors"
            );
        }
        report
    }))
}

struct PendingCleanup {
    store: Arc<dyn FileStore>,
    targets: Vec<String>,
}

/// Body stream that removes delivered files when it finishes
pub struct CleanupStream<S> {
    inner: S,
    trigger: CleanupTrigger,
    reason: &'static str,
    pending: Option<PendingCleanup>,
    expected_len: Option<u64>,
    yielded: u64,
}

impl<S> CleanupStream<S> {
    pub fn new(
        inner: S,
        store: Arc<dyn FileStore>,
        targets: Vec<String>,
        trigger: CleanupTrigger,
        reason: &'static str,
    ) -> Self {
        Self {
            inner,
            trigger,
            reason,
            pending: Some(PendingCleanup { store, targets }),
            expected_len: None,
            yielded: 0,
        }
    }

    /// Treat the body as delivered once `len` bytes have been yielded.
    pub fn with_expected_len(mut self, len: u64) -> Self {
        self.expected_len = Some(len);
        self
    }

    fn fully_yielded(&self) -> bool {
        self.expected_len.is_some_and(|len| self.yielded >= len)
    }

    fn fire(&mut self) {
        if let Some(pending) = self.pending.take() {
            schedule_cleanup(pending.store, pending.targets, self.reason);
        }
    }
}

impl<S, T, E> Stream for CleanupStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: AsRef<[u8]>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);

        match &polled {
            Poll::Ready(Some(Ok(chunk))) => this.yielded += chunk.as_ref().len() as u64,
            Poll::Ready(None) => this.fire(),
            Poll::Ready(Some(Err(_))) if this.trigger == CleanupTrigger::OnCompletion => {
                // Delivery failed; keep the files so the client can retry.
                this.pending = None;
            }
            _ => {}
        }

        polled
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        // A failed delivery already cleared `pending`.
        if self.trigger == CleanupTrigger::Always || self.fully_yielded() {
            self.fire();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;
    use pixshrink_storage::LocalFileStore;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, Arc<dyn FileStore>) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(dir.path()).await.unwrap());
        (dir, store)
    }

    async fn wait_until_gone(store: &Arc<dyn FileStore>, filename: &str) -> bool {
        for _ in 0..100 {
            if !store.exists(filename).await.unwrap() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn body(chunks: Vec<Result<Bytes, std::io::Error>>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        futures::stream::iter(chunks)
    }

    #[tokio::test]
    async fn test_collect_targets_pairs_originals() {
        let (_dir, store) = setup().await;
        store.write("1-1.jpg", b"a").await.unwrap();
        store.write("1-1-optimized.webp", b"b").await.unwrap();
        store.write("2-2-optimized.png", b"c").await.unwrap();

        let served = vec![
            "1-1-optimized.webp".to_string(),
            "2-2-optimized.png".to_string(),
            "1-1-optimized.webp".to_string(),
        ];
        let targets = collect_cleanup_targets(store.as_ref(), &served).await;

        assert_eq!(
            targets,
            vec![
                "1-1-optimized.webp".to_string(),
                "1-1.jpg".to_string(),
                "2-2-optimized.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_schedule_cleanup_reports() {
        let (_dir, store) = setup().await;
        store.write("a.jpg", b"a").await.unwrap();

        let report = schedule_cleanup(
            store.clone(),
            vec!["a.jpg".to_string(), "gone.jpg".to_string()],
            "test",
        )
        .unwrap()
        .await
        .unwrap();

        assert_eq!(report.deleted, vec!["a.jpg".to_string()]);
        assert_eq!(report.missing, vec!["gone.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_schedule_cleanup_nothing_to_do() {
        let (_dir, store) = setup().await;
        assert!(schedule_cleanup(store, Vec::new(), "test").is_none());
    }

    #[tokio::test]
    async fn test_cleanup_after_completed_stream() {
        let (_dir, store) = setup().await;
        store.write("3-3-optimized.webp", b"data").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Ok(Bytes::from_static(b"data"))]),
            store.clone(),
            vec!["3-3-optimized.webp".to_string()],
            CleanupTrigger::OnCompletion,
            "test",
        );
        while stream.next().await.is_some() {}

        assert!(wait_until_gone(&store, "3-3-optimized.webp").await);
    }

    #[tokio::test]
    async fn test_on_completion_keeps_files_when_abandoned() {
        let (_dir, store) = setup().await;
        store.write("4-4-optimized.webp", b"data").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Ok(Bytes::from_static(b"da")), Ok(Bytes::from_static(b"ta"))]),
            store.clone(),
            vec!["4-4-optimized.webp".to_string()],
            CleanupTrigger::OnCompletion,
            "test",
        );
        stream.next().await;
        drop(stream);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.exists("4-4-optimized.webp").await.unwrap());
    }

    #[tokio::test]
    async fn test_on_completion_keeps_files_after_error() {
        let (_dir, store) = setup().await;
        store.write("5-5-optimized.webp", b"data").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Err(std::io::Error::other("boom"))]),
            store.clone(),
            vec!["5-5-optimized.webp".to_string()],
            CleanupTrigger::OnCompletion,
            "test",
        );
        while stream.next().await.is_some() {}

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.exists("5-5-optimized.webp").await.unwrap());
    }

    #[tokio::test]
    async fn test_always_cleans_up_when_dropped_early() {
        let (_dir, store) = setup().await;
        store.write("6-6-optimized.webp", b"data").await.unwrap();
        store.write("6-6.png", b"orig").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Ok(Bytes::from_static(b"da")), Ok(Bytes::from_static(b"ta"))]),
            store.clone(),
            vec!["6-6-optimized.webp".to_string(), "6-6.png".to_string()],
            CleanupTrigger::Always,
            "test",
        );
        stream.next().await;
        drop(stream);

        assert!(wait_until_gone(&store, "6-6-optimized.webp").await);
        assert!(wait_until_gone(&store, "6-6.png").await);
    }

    #[tokio::test]
    async fn test_expected_len_counts_as_complete_without_end() {
        let (_dir, store) = setup().await;
        store.write("8-8-optimized.webp", b"data").await.unwrap();
        store.write("8-8.jpg", b"orig").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Ok(Bytes::from_static(b"da")), Ok(Bytes::from_static(b"ta"))]),
            store.clone(),
            vec!["8-8-optimized.webp".to_string(), "8-8.jpg".to_string()],
            CleanupTrigger::OnCompletion,
            "test",
        )
        .with_expected_len(4);
        // Take exactly the announced bytes, never polling for the end.
        stream.next().await;
        stream.next().await;
        drop(stream);

        assert!(wait_until_gone(&store, "8-8-optimized.webp").await);
        assert!(wait_until_gone(&store, "8-8.jpg").await);
    }

    #[tokio::test]
    async fn test_expected_len_keeps_files_when_cut_short() {
        let (_dir, store) = setup().await;
        store.write("9-9-optimized.webp", b"data").await.unwrap();

        let mut stream = CleanupStream::new(
            body(vec![Ok(Bytes::from_static(b"da")), Ok(Bytes::from_static(b"ta"))]),
            store.clone(),
            vec!["9-9-optimized.webp".to_string()],
            CleanupTrigger::OnCompletion,
            "test",
        )
        .with_expected_len(4);
        stream.next().await;
        drop(stream);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.exists("9-9-optimized.webp").await.unwrap());
    }
}
