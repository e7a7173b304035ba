//! Best-effort removal of intermediate files

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Number of files removed at the same time
pub const CLEANUP_CONCURRENCY: usize = 4;

/// Delete `paths` with at most `concurrency` removals in flight.
///
/// Missing files are ignored and other failures are logged, never returned.
/// Returns the number of files actually removed.
pub async fn remove_files(paths: Vec<PathBuf>, concurrency: usize) -> usize {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for path in paths {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        tasks.spawn(async move {
            let _permit = permit;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed temporary file {}", path.display());
                    true
                }
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => {
                    warn!("Failed to remove temporary file {}: {}", path.display(), e);
                    false
                }
            }
        });
    }

    let mut removed = 0;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!("Cleanup task failed: {}", e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_existing_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("part-{}.mp4", i));
            std::fs::write(&path, b"x").unwrap();
            paths.push(path);
        }
        paths.push(dir.path().join("never-created.mp4"));

        let removed = remove_files(paths.clone(), 2).await;
        assert_eq!(removed, 6);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_empty_list() {
        assert_eq!(remove_files(Vec::new(), CLEANUP_CONCURRENCY).await, 0);
    }
}
