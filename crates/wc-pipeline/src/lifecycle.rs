//! Scoped ownership of a job's local state and its source object.
//!
//! A [`JobScope`] is opened when the job is created and released exactly
//! once, either explicitly through [`JobScope::teardown`] or, if the owner
//! unwinds first, by its `Drop` impl.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use wc_store::ObjectStore;

use crate::job::Job;

/// What teardown managed to release. A resource that was already absent
/// counts as released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeardownReport {
    pub input_removed: bool,
    pub work_dir_removed: bool,
    /// `None` when source deletion is disabled.
    pub source_deleted: Option<bool>,
}

/// Guard over one job's working directory, downloaded input, and source
/// object.
///
/// Local paths are only ever removed when they sit directly inside the work
/// root; anything else is left alone and logged.
pub struct JobScope {
    key: String,
    bucket: String,
    work_dir: PathBuf,
    input_path: PathBuf,
    store: Arc<dyn ObjectStore>,
    delete_source: bool,
    contained: bool,
    released: bool,
}

impl JobScope {
    /// Create the job's working directory and start tracking its resources.
    ///
    /// A directory that cannot be created is logged, not raised; the first
    /// stage that needs it fails instead.
    pub fn open(job: &Job, work_root: &Path, store: Arc<dyn ObjectStore>, delete_source: bool) -> Self {
        let contained = is_child_of(&job.work_dir, work_root) && is_child_of(&job.input_path, work_root);
        if !contained {
            tracing::error!(
                key = %job.key,
                work_root = %work_root.display(),
                dir = %job.work_dir.display(),
                "Job paths escape the work root; local state will not be touched"
            );
        } else {
            match std::fs::create_dir_all(&job.work_dir) {
                Ok(()) => {
                    tracing::debug!(key = %job.key, dir = %job.work_dir.display(), "Created work dir");
                }
                Err(e) => {
                    tracing::error!(key = %job.key, dir = %job.work_dir.display(), "Failed to create work dir: {e}");
                }
            }
        }

        Self {
            key: job.key.clone(),
            bucket: job.bucket.clone(),
            work_dir: job.work_dir.clone(),
            input_path: job.input_path.clone(),
            store,
            delete_source,
            contained,
            released: false,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Release everything. Each step is independent and best-effort.
    pub async fn teardown(mut self) -> TeardownReport {
        self.released = true;

        let (input_removed, work_dir_removed) = if self.contained {
            let input = tokio::fs::remove_file(&self.input_path).await;
            let dir = tokio::fs::remove_dir_all(&self.work_dir).await;
            (
                log_removal(&self.key, "input", &self.input_path, input),
                log_removal(&self.key, "work dir", &self.work_dir, dir),
            )
        } else {
            (false, false)
        };

        let source_deleted = if self.delete_source {
            match self.store.delete(&self.bucket, &self.key).await {
                Ok(()) => Some(true),
                Err(e) => {
                    tracing::warn!(key = %self.key, bucket = %self.bucket, "Failed to delete source object: {e}");
                    Some(false)
                }
            }
        } else {
            None
        };

        tracing::info!(key = %self.key, "Torn down");
        TeardownReport {
            input_removed,
            work_dir_removed,
            source_deleted,
        }
    }
}

impl Drop for JobScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        tracing::warn!(key = %self.key, "Job scope dropped without teardown; releasing");

        if self.contained {
            let input = std::fs::remove_file(&self.input_path);
            log_removal(&self.key, "input", &self.input_path, input);
            let dir = std::fs::remove_dir_all(&self.work_dir);
            log_removal(&self.key, "work dir", &self.work_dir, dir);
        }

        if !self.delete_source {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                let bucket = self.bucket.clone();
                let key = self.key.clone();
                handle.spawn(async move {
                    if let Err(e) = store.delete(&bucket, &key).await {
                        tracing::warn!(key = %key, bucket = %bucket, "Failed to delete source object: {e}");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(key = %self.key, "No runtime; source object left in place");
            }
        }
    }
}

/// `path` names an entry directly inside `root`.
fn is_child_of(path: &Path, root: &Path) -> bool {
    path.parent() == Some(root)
        && matches!(path.components().next_back(), Some(Component::Normal(_)))
}

fn log_removal(key: &str, what: &str, path: &Path, result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(key, path = %path.display(), "No {what} to remove");
            true
        }
        Err(e) => {
            tracing::warn!(key, path = %path.display(), "Failed to remove {what}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wc_store::FsObjectStore;

    fn root_of(job: &Job) -> &Path {
        job.work_dir.parent().unwrap()
    }

    fn setup() -> (tempfile::TempDir, Arc<FsObjectStore>, Job) {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(root.path().join("store")));
        std::fs::create_dir_all(root.path().join("store/uploads")).unwrap();
        std::fs::write(root.path().join("store/uploads/track.wav"), b"riff").unwrap();
        let job = Job::new("track.wav", "uploads", &root.path().join("work"));
        (root, store, job)
    }

    #[tokio::test]
    async fn open_creates_work_dir_and_teardown_releases_all() {
        let (root, store, job) = setup();
        let scope = JobScope::open(&job, root_of(&job), store, true);
        assert!(job.work_dir.is_dir());

        std::fs::write(&job.input_path, b"copy").unwrap();
        std::fs::write(job.work_dir.join("seg0.ts"), b"ts").unwrap();

        let report = scope.teardown().await;
        assert_eq!(
            report,
            TeardownReport {
                input_removed: true,
                work_dir_removed: true,
                source_deleted: Some(true),
            }
        );
        assert!(!job.input_path.exists());
        assert!(!job.work_dir.exists());
        assert!(!root.path().join("store/uploads/track.wav").exists());
    }

    #[tokio::test]
    async fn source_kept_when_deletion_disabled() {
        let (root, store, job) = setup();
        let report = JobScope::open(&job, root_of(&job), store, false).teardown().await;
        assert_eq!(report.source_deleted, None);
        assert!(root.path().join("store/uploads/track.wav").exists());
    }

    #[tokio::test]
    async fn teardown_tolerates_missing_resources() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(root.path().join("store")));
        // A file where the work root should be makes directory creation fail.
        std::fs::write(root.path().join("blocked"), b"").unwrap();
        let job = Job::new("never", "uploads", &root.path().join("blocked"));

        let scope = JobScope::open(&job, root_of(&job), store, true);
        assert!(!job.work_dir.exists());

        let report = scope.teardown().await;
        assert_eq!(report.source_deleted, Some(true));
    }

    #[tokio::test]
    async fn already_removed_state_counts_as_released() {
        let (_root, store, job) = setup();
        let scope = JobScope::open(&job, root_of(&job), store, false);
        std::fs::remove_dir(&job.work_dir).unwrap();

        let report = scope.teardown().await;
        assert!(report.input_removed);
        assert!(report.work_dir_removed);
    }

    #[tokio::test]
    async fn drop_releases_local_state() {
        let (_root, store, job) = setup();
        {
            let _scope = JobScope::open(&job, root_of(&job), store, false);
            std::fs::write(&job.input_path, b"copy").unwrap();
        }
        assert!(!job.input_path.exists());
        assert!(!job.work_dir.exists());
    }

    #[tokio::test]
    async fn paths_outside_work_root_are_never_removed() {
        let (root, store, mut job) = setup();
        let work_root = root.path().join("work");
        std::fs::create_dir_all(&work_root).unwrap();
        std::fs::write(root.path().join("precious.txt"), b"keep").unwrap();
        job.work_dir = work_root.join("..");

        let scope = JobScope::open(&job, &work_root, store, false);
        let report = scope.teardown().await;

        assert!(!report.work_dir_removed);
        assert!(!report.input_removed);
        assert!(root.path().join("precious.txt").exists());
        assert!(work_root.exists());
    }

    #[tokio::test]
    async fn dropped_scope_outside_work_root_leaves_files() {
        let (root, store, mut job) = setup();
        let work_root = root.path().join("work");
        std::fs::create_dir_all(&work_root).unwrap();
        std::fs::write(work_root.join("other-job"), b"busy").unwrap();
        job.work_dir = work_root.join(".");

        drop(JobScope::open(&job, &work_root, store, false));
        assert!(work_root.join("other-job").exists());
    }
}
