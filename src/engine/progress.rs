//! Progress parsing and aggregation
//!
//! The external tool reports progress as `time=H:MM:SS.cc` on its error
//! channel. Those values are mapped to a `0..=1` fraction of the known job
//! duration and combined across sub-jobs and segments.

use std::sync::Mutex;

/// Callback receiving a completion fraction in `0..=1`
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Progress callback that ignores every update
pub fn no_progress(_fraction: f64) {}

/// Extract the elapsed `time=` field of a log line in seconds.
///
/// Negative values are a known artefact of the tool at the start of some
/// jobs and yield `None`.
pub fn parse_elapsed(line: &str) -> Option<f64> {
    let start = line.find("time=")? + "time=".len();
    let value = line[start..].split_whitespace().next()?;
    if value.starts_with('-') {
        return None;
    }
    parse_clock(value)
}

/// Map a log line to a completion fraction of `duration` seconds
pub fn parse_progress(line: &str, duration: f64) -> Option<f64> {
    if duration.is_nan() || duration <= 0.0 {
        return None;
    }
    let elapsed = parse_elapsed(line)?;
    Some((elapsed / duration).clamp(0.0, 1.0))
}

/// Parse `H:MM:SS.cc` (hours may have any width)
pub fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Forwards progress only when it moves forward
pub struct MonotonicProgress<'a> {
    last: Mutex<f64>,
    sink: ProgressFn<'a>,
}

impl<'a> MonotonicProgress<'a> {
    pub fn new(sink: ProgressFn<'a>) -> Self {
        Self {
            last: Mutex::new(0.0),
            sink,
        }
    }

    /// Report a fraction; values at or below the last reported one are dropped
    pub fn report(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if fraction > *last {
            *last = fraction;
            (self.sink)(fraction);
        }
    }

    /// Last value forwarded
    pub fn last(&self) -> f64 {
        *self.last.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Combines the progress of concurrently running sub-jobs by averaging
pub struct PartsProgress<'a> {
    parts: Mutex<Vec<f64>>,
    sink: &'a (dyn Fn(f64) + Send + Sync),
}

impl<'a> PartsProgress<'a> {
    pub fn new(count: usize, sink: &'a (dyn Fn(f64) + Send + Sync)) -> Self {
        Self {
            parts: Mutex::new(vec![0.0; count.max(1)]),
            sink,
        }
    }

    /// Update one part and forward the mean of all parts
    pub fn update(&self, part: usize, fraction: f64) {
        let mean = {
            let mut parts = self.parts.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(slot) = parts.get_mut(part) {
                *slot = fraction.clamp(0.0, 1.0);
            }
            parts.iter().sum::<f64>() / parts.len() as f64
        };
        (self.sink)(mean);
    }
}

/// Scale a fraction into the `[offset, offset + span]` window of an overall job
pub fn scaled(fraction: f64, offset: f64, span: f64) -> f64 {
    offset + fraction.clamp(0.0, 1.0) * span
}
