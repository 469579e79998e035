use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::warn;

use spacey_core::model::LessonProgress;
use storage::repository::{ProgressRepository, StorageError};

/// Quiet period before a scheduled progress write is committed.
pub const PROGRESS_DEBOUNCE: Duration = Duration::from_secs(2);

struct WriterInner {
    generation: u64,
    pending: Option<LessonProgress>,
}

/// Debounced progress persistence.
///
/// Rapid navigation schedules many snapshots; only the latest one is written,
/// one quiet period after the last change. Each schedule bumps a generation;
/// a timer that wakes up to find a newer generation simply drops out, the
/// same guard the player uses for stale callbacks.
#[derive(Clone)]
pub struct ProgressWriter {
    repo: Arc<dyn ProgressRepository>,
    delay: Duration,
    inner: Arc<Mutex<WriterInner>>,
}

impl ProgressWriter {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            repo,
            delay: PROGRESS_DEBOUNCE,
            inner: Arc::new(Mutex::new(WriterInner {
                generation: 0,
                pending: None,
            })),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a snapshot, superseding any pending one, and (re)arm the timer.
    pub fn schedule(&self, snapshot: LessonProgress) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.pending = Some(snapshot);
            inner.generation
        };

        let writer = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(writer.delay).await;
            writer.commit_if_current(generation).await;
        });
    }

    /// Whether a snapshot is still waiting for its quiet period.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Write any pending snapshot immediately (shutdown path).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails; the snapshot is dropped
    /// either way, matching the no-automatic-retry policy.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let snapshot = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.pending.take()
        };
        match snapshot {
            Some(snapshot) => self.repo.upsert_progress(&snapshot).await,
            None => Ok(()),
        }
    }

    async fn commit_if_current(&self, generation: u64) {
        let snapshot = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.pending.take()
        };
        if let Some(snapshot) = snapshot {
            if let Err(err) = self.repo.upsert_progress(&snapshot).await {
                warn!(doc = %snapshot.doc_id(), error = %err, "progress write failed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_core::model::{LessonSlug, UserId};
    use spacey_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn snapshot(index: usize) -> LessonProgress {
        LessonProgress::new(
            UserId::new("uid-1").unwrap(),
            LessonSlug::new("build-your-own-satellite").unwrap(),
            "Build Your Own Satellite",
            index,
            12,
            fixed_now(),
        )
        .unwrap()
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_schedules_coalesce_into_one_write() {
        let repo = Arc::new(InMemoryRepository::new());
        let writer = ProgressWriter::new(repo.clone());

        writer.schedule(snapshot(1));
        writer.schedule(snapshot(2));
        writer.schedule(snapshot(3));

        tokio::time::advance(PROGRESS_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;

        let records = repo
            .list_progress_for_user(&UserId::new("uid-1").unwrap())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_section_index(), 3);
        assert!(!writer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_written_before_the_quiet_period() {
        let repo = Arc::new(InMemoryRepository::new());
        let writer = ProgressWriter::new(repo.clone());

        writer.schedule(snapshot(4));
        tokio::time::advance(PROGRESS_DEBOUNCE / 2).await;
        settle().await;

        let records = repo
            .list_progress_for_user(&UserId::new("uid-1").unwrap())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(writer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_pending_snapshot_immediately() {
        let repo = Arc::new(InMemoryRepository::new());
        let writer = ProgressWriter::new(repo.clone());

        writer.schedule(snapshot(7));
        writer.flush().await.unwrap();

        let records = repo
            .list_progress_for_user(&UserId::new("uid-1").unwrap())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_section_index(), 7);

        // The superseded timer must not write again.
        tokio::time::advance(PROGRESS_DEBOUNCE * 2).await;
        settle().await;
        let records = repo
            .list_progress_for_user(&UserId::new("uid-1").unwrap())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
