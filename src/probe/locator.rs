//! Keyframe locator backed by the keyframe index cache

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::model::KeyframeDirection;
use crate::error::SeamcutResult;
use crate::ports::KeyframeLocator;
use crate::probe::KeyframeIndexCache;

/// Default half-width of the keyframe search window in seconds
pub const DEFAULT_SEARCH_WINDOW: f64 = 5.0;

/// Finds keyframes of one file by probing a window around each query
pub struct ProbeKeyframeLocator {
    cache: Arc<KeyframeIndexCache>,
    path: PathBuf,
    window: f64,
}

impl ProbeKeyframeLocator {
    /// Create a new locator for `path`
    pub fn new(cache: Arc<KeyframeIndexCache>, path: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            path: path.into(),
            window: DEFAULT_SEARCH_WINDOW,
        }
    }

    /// Set the search window half-width
    pub fn with_window(mut self, window: f64) -> Self {
        self.window = window;
        self
    }
}

#[async_trait]
impl KeyframeLocator for ProbeKeyframeLocator {
    async fn find_keyframe(
        &self,
        time: f64,
        direction: KeyframeDirection,
    ) -> SeamcutResult<Option<f64>> {
        self.cache
            .ensure_window(&self.path, time, self.window)
            .await?;
        Ok(self
            .cache
            .find_nearest_keyframe(time, direction)
            .filter(|keyframe| (keyframe - time).abs() <= self.window))
    }

    fn search_window(&self) -> f64 {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::KeyframeSample;
    use crate::ports::ProbePort;
    use crate::probe::ProbeResult;
    use std::path::Path;

    struct SparseProbe;

    #[async_trait]
    impl ProbePort for SparseProbe {
        async fn probe(&self, _path: &Path) -> SeamcutResult<ProbeResult> {
            Ok(ProbeResult::default())
        }

        async fn read_frames(
            &self,
            _path: &Path,
            from: f64,
            to: f64,
        ) -> SeamcutResult<Vec<KeyframeSample>> {
            Ok([0.0, 30.0]
                .iter()
                .filter(|t| **t >= from && **t <= to)
                .map(|t| KeyframeSample {
                    time: *t,
                    is_keyframe: true,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_finds_keyframe_in_window() {
        let cache = Arc::new(KeyframeIndexCache::new(Arc::new(SparseProbe)));
        let locator = ProbeKeyframeLocator::new(cache, "a.mp4").with_window(3.0);
        assert_eq!(
            locator.find_keyframe(28.5, KeyframeDirection::Nearest).await.unwrap(),
            Some(30.0)
        );
    }

    #[tokio::test]
    async fn test_nothing_outside_window() {
        let cache = Arc::new(KeyframeIndexCache::new(Arc::new(SparseProbe)));
        let locator = ProbeKeyframeLocator::new(cache, "a.mp4").with_window(3.0);
        assert_eq!(
            locator.find_keyframe(15.0, KeyframeDirection::Before).await.unwrap(),
            None
        );
    }
}
