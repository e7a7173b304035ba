//! Cooperative cancellation and the per-session job registry

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, info};

/// Cooperative cancellation token shared between a job and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a new, untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cancellation; calling this more than once is harmless
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token has been triggered
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Registry of running jobs for one export session.
///
/// Cloning shares the registry. Jobs register for the lifetime of one
/// external-tool invocation and deregister when their [`JobGuard`] drops.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    jobs: Mutex<HashMap<u64, CancelToken>>,
    next_id: AtomicU64,
    aborted: AtomicBool,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job and hand back its guard
    pub fn register(&self) -> JobGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let token = CancelToken::new();
        if self.is_aborted() {
            token.cancel();
        }
        self.lock_jobs().insert(id, token.clone());
        debug!("Registered job {}", id);
        JobGuard {
            id,
            token,
            registry: self.clone(),
        }
    }

    /// Cancel every registered job and refuse new ones.
    ///
    /// Returns the number of jobs that were signalled. Jobs that already
    /// finished are simply no longer registered.
    pub fn abort_all(&self) -> usize {
        self.inner.aborted.store(true, Ordering::SeqCst);
        let jobs = self.lock_jobs();
        for token in jobs.values() {
            token.cancel();
        }
        if !jobs.is_empty() {
            info!("Aborting {} running job(s)", jobs.len());
        }
        jobs.len()
    }

    /// Whether `abort_all` has been called on this session
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Number of jobs currently registered
    pub fn running_count(&self) -> usize {
        self.lock_jobs().len()
    }

    fn deregister(&self, id: u64) {
        self.lock_jobs().remove(&id);
        debug!("Deregistered job {}", id);
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<u64, CancelToken>> {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registration of one running job; removes itself on drop
#[derive(Debug)]
pub struct JobGuard {
    id: u64,
    token: CancelToken,
    registry: JobRegistry,
}

impl JobGuard {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_triggered() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }

    #[test]
    fn test_guard_deregisters_on_drop() {
        let registry = JobRegistry::new();
        let guard = registry.register();
        assert_eq!(registry.running_count(), 1);
        drop(guard);
        assert_eq!(registry.running_count(), 0);
    }

    #[test]
    fn test_abort_all_signals_running_jobs() {
        let registry = JobRegistry::new();
        let first = registry.register();
        let second = registry.register();
        assert_eq!(registry.abort_all(), 2);
        assert!(first.token().is_cancelled());
        assert!(second.token().is_cancelled());
    }

    #[test]
    fn test_abort_all_after_jobs_finished_is_harmless() {
        let registry = JobRegistry::new();
        drop(registry.register());
        assert_eq!(registry.abort_all(), 0);
        assert_eq!(registry.abort_all(), 0);
        assert!(registry.is_aborted());
    }

    #[test]
    fn test_jobs_registered_after_abort_start_cancelled() {
        let registry = JobRegistry::new();
        registry.abort_all();
        let guard = registry.register();
        assert!(guard.token().is_cancelled());
    }
}
