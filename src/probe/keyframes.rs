//! Keyframe Index Cache
//!
//! A bounded, time-keyed map of frame samples for the file currently being
//! worked on. Samples are merged in from windowed probes and evicted in
//! insertion order once the capacity is exceeded. Switching to another
//! file clears the cache.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::domain::model::{KeyframeDirection, KeyframeSample};
use crate::error::SeamcutResult;
use crate::ports::ProbePort;

/// Default number of cached samples
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Times closer than this are treated as the same instant
pub const TIME_TOLERANCE: f64 = 0.001;

/// Samples are keyed by whole microseconds
type TimeKey = i64;

fn time_key(time: f64) -> TimeKey {
    (time * 1_000_000.0).round() as TimeKey
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    path: PathBuf,
    around: TimeKey,
    window: TimeKey,
}

#[derive(Debug, Default)]
struct CacheState {
    file: Option<PathBuf>,
    samples: BTreeMap<TimeKey, KeyframeSample>,
    insertion_order: VecDeque<TimeKey>,
}

/// Bounded cache of frame samples around points of interest
pub struct KeyframeIndexCache {
    probe: Arc<dyn ProbePort>,
    capacity: usize,
    state: Mutex<CacheState>,
    in_flight: Mutex<HashMap<WindowKey, Arc<OnceCell<()>>>>,
}

impl KeyframeIndexCache {
    /// Create a cache with the default capacity
    pub fn new(probe: Arc<dyn ProbePort>) -> Self {
        Self::with_capacity(probe, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` samples
    pub fn with_capacity(probe: Arc<dyn ProbePort>, capacity: usize) -> Self {
        Self {
            probe,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Make sure samples in `[around - window, around + window]` of `path` are cached.
    ///
    /// Concurrent requests for the same file and window share one probe.
    /// Returns every cached sample in time order.
    pub async fn ensure_window(
        &self,
        path: &Path,
        around: f64,
        window: f64,
    ) -> SeamcutResult<Vec<KeyframeSample>> {
        self.switch_file(path);

        let key = WindowKey {
            path: path.to_path_buf(),
            around: time_key(around),
            window: time_key(window),
        };
        let cell = self
            .lock_in_flight()
            .entry(key.clone())
            .or_default()
            .clone();

        let result = cell
            .get_or_try_init(|| async {
                let from = (around - window).max(0.0);
                let to = around + window;
                debug!(
                    "Reading frames of {} in [{:.3}, {:.3}]",
                    path.display(),
                    from,
                    to
                );
                let samples = self.probe.read_frames(path, from, to).await?;
                self.merge(path, samples);
                Ok::<(), crate::error::SeamcutError>(())
            })
            .await
            .map(|_| ());

        {
            let mut in_flight = self.lock_in_flight();
            if in_flight
                .get(&key)
                .map_or(false, |current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(&key);
            }
        }

        result?;
        Ok(self.samples())
    }

    /// Keyframe nearest to `time` in `direction`, using cached samples only.
    ///
    /// `None` means the cache does not know of one, not that none exists.
    pub fn find_nearest_keyframe(&self, time: f64, direction: KeyframeDirection) -> Option<f64> {
        let state = self.lock_state();
        let keyframes = state
            .samples
            .values()
            .filter(|s| s.is_keyframe)
            .map(|s| s.time);

        match direction {
            KeyframeDirection::Before => keyframes
                .filter(|t| *t <= time + TIME_TOLERANCE)
                .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.max(t)))),
            KeyframeDirection::After => keyframes
                .filter(|t| *t >= time - TIME_TOLERANCE)
                .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t)))),
            KeyframeDirection::Nearest => keyframes.fold(None, |best: Option<f64>, t| match best {
                Some(b) if (b - time).abs() <= (t - time).abs() => Some(b),
                _ => Some(t),
            }),
        }
    }

    /// All cached samples in time order
    pub fn samples(&self) -> Vec<KeyframeSample> {
        self.lock_state().samples.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_state().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached sample
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.samples.clear();
        state.insertion_order.clear();
    }

    fn switch_file(&self, path: &Path) {
        let mut state = self.lock_state();
        if state.file.as_deref() != Some(path) {
            if state.file.is_some() {
                debug!("Active file changed, clearing keyframe cache");
            }
            state.file = Some(path.to_path_buf());
            state.samples.clear();
            state.insertion_order.clear();
        }
    }

    fn merge(&self, path: &Path, samples: Vec<KeyframeSample>) {
        let mut state = self.lock_state();
        if state.file.as_deref() != Some(path) {
            debug!("Discarding frames of {}, no longer the active file", path.display());
            return;
        }

        let mut added = 0;
        for sample in samples {
            let key = time_key(sample.time);
            if state.samples.insert(key, sample).is_none() {
                state.insertion_order.push_back(key);
                added += 1;
            }
        }

        while state.samples.len() > self.capacity {
            match state.insertion_order.pop_front() {
                Some(oldest) => {
                    state.samples.remove(&oldest);
                }
                None => break,
            }
        }
        debug!("Cached {} new frame sample(s), {} total", added, state.samples.len());
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<WindowKey, Arc<OnceCell<()>>>> {
        self.in_flight.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeamcutResult;
    use crate::probe::ProbeResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Frames every 0.5s, keyframes every 2s
    struct GridProbe {
        reads: AtomicUsize,
        delay: Duration,
    }

    impl GridProbe {
        fn new(delay: Duration) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl ProbePort for GridProbe {
        async fn probe(&self, _path: &Path) -> SeamcutResult<ProbeResult> {
            Ok(ProbeResult::default())
        }

        async fn read_frames(
            &self,
            _path: &Path,
            from: f64,
            to: f64,
        ) -> SeamcutResult<Vec<KeyframeSample>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let mut samples = Vec::new();
            let mut i = (from * 2.0).ceil() as i64;
            while (i as f64) / 2.0 <= to {
                samples.push(KeyframeSample {
                    time: i as f64 / 2.0,
                    is_keyframe: i % 4 == 0,
                });
                i += 1;
            }
            Ok(samples)
        }
    }

    #[tokio::test]
    async fn test_find_nearest_keyframe_directions() {
        let cache = KeyframeIndexCache::new(Arc::new(GridProbe::new(Duration::ZERO)));
        cache.ensure_window(Path::new("a.mp4"), 5.0, 3.0).await.unwrap();

        assert_eq!(cache.find_nearest_keyframe(5.0, KeyframeDirection::Before), Some(4.0));
        assert_eq!(cache.find_nearest_keyframe(5.0, KeyframeDirection::After), Some(6.0));
        assert_eq!(cache.find_nearest_keyframe(5.2, KeyframeDirection::Nearest), Some(6.0));
        assert_eq!(cache.find_nearest_keyframe(4.0, KeyframeDirection::After), Some(4.0));
    }

    #[tokio::test]
    async fn test_unknown_before_probing() {
        let cache = KeyframeIndexCache::new(Arc::new(GridProbe::new(Duration::ZERO)));
        assert_eq!(cache.find_nearest_keyframe(5.0, KeyframeDirection::Nearest), None);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_inserted() {
        let cache = KeyframeIndexCache::with_capacity(Arc::new(GridProbe::new(Duration::ZERO)), 5);
        cache.ensure_window(Path::new("a.mp4"), 1.0, 1.0).await.unwrap();
        cache.ensure_window(Path::new("a.mp4"), 20.0, 1.0).await.unwrap();

        let times: Vec<f64> = cache.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![19.0, 19.5, 20.0, 20.5, 21.0]);
        assert_eq!(cache.len(), cache.capacity());
    }

    #[tokio::test]
    async fn test_switching_file_clears_cache() {
        let cache = KeyframeIndexCache::new(Arc::new(GridProbe::new(Duration::ZERO)));
        cache.ensure_window(Path::new("a.mp4"), 10.0, 2.0).await.unwrap();
        assert!(!cache.is_empty());
        let samples = cache.ensure_window(Path::new("b.mp4"), 0.0, 1.0).await.unwrap();
        assert!(samples.iter().all(|s| s.time <= 1.0));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_probe() {
        let probe = Arc::new(GridProbe::new(Duration::from_millis(50)));
        let cache = KeyframeIndexCache::new(probe.clone());
        let path = Path::new("a.mp4");

        let (a, b) = tokio::join!(
            cache.ensure_window(path, 10.0, 2.0),
            cache.ensure_window(path, 10.0, 2.0)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(probe.reads.load(Ordering::SeqCst), 1);

        cache.ensure_window(path, 10.0, 2.0).await.unwrap();
        assert_eq!(probe.reads.load(Ordering::SeqCst), 2);
    }
}
