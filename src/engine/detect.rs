//! Interval detectors: black frames, silence and scene changes
//!
//! Each detector contributes a filter to the tool invocation and a line
//! matcher for its log output. Matches are aggregated in one of two modes:
//!
//! * bounding: every matched line carries a complete interval
//! * midpoint: every matched line carries a single point; intervals run
//!   from `from` to the first point, between consecutive points, and from
//!   the last point to `to`

use std::fmt;

use crate::domain::model::Interval;

/// How matched lines become intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    Bounding,
    Midpoint,
}

/// A single match produced by a detector line matcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorEvent {
    /// A complete interval, relative to the job start
    Span { start: f64, end: f64 },
    /// A split point, relative to the job start
    Point(f64),
}

/// Supported detectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalDetector {
    /// `blackdetect`; minimum black duration in seconds
    Black { min_duration: f64 },
    /// `silencedetect`; noise floor in dB and minimum silence duration
    Silence { noise_db: f64, min_duration: f64 },
    /// Scene-change scores above `threshold` split the range
    Scene { threshold: f64 },
}

impl IntervalDetector {
    /// Detector defaults used by the command line
    pub fn black() -> Self {
        IntervalDetector::Black { min_duration: 2.0 }
    }

    pub fn silence() -> Self {
        IntervalDetector::Silence {
            noise_db: -60.0,
            min_duration: 2.0,
        }
    }

    pub fn scene() -> Self {
        IntervalDetector::Scene { threshold: 0.3 }
    }

    /// Parse a detector kind name
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "black" => Some(Self::black()),
            "silence" => Some(Self::silence()),
            "scene" => Some(Self::scene()),
            _ => None,
        }
    }

    pub fn mode(&self) -> AggregationMode {
        match self {
            IntervalDetector::Black { .. } => AggregationMode::Bounding,
            IntervalDetector::Silence { .. } | IntervalDetector::Scene { .. } => {
                AggregationMode::Midpoint
            }
        }
    }

    /// Filter arguments placed between the input and the null output
    pub fn filter_args(&self) -> Vec<String> {
        match self {
            IntervalDetector::Black { min_duration } => vec![
                "-vf".to_string(),
                format!("blackdetect=d={}:pix_th=0.10", min_duration),
                "-an".to_string(),
            ],
            IntervalDetector::Silence {
                noise_db,
                min_duration,
            } => vec![
                "-af".to_string(),
                format!("silencedetect=n={}dB:d={}", noise_db, min_duration),
                "-vn".to_string(),
            ],
            IntervalDetector::Scene { threshold } => vec![
                "-vf".to_string(),
                format!("select='gt(scene,{})',metadata=print", threshold),
                "-an".to_string(),
            ],
        }
    }

    /// Match one log line
    pub fn match_line(&self, line: &str) -> Option<DetectorEvent> {
        match self {
            IntervalDetector::Black { .. } => {
                if !line.contains("blackdetect") {
                    return None;
                }
                let start = field(line, "black_start:")?;
                let end = field(line, "black_end:")?;
                Some(DetectorEvent::Span { start, end })
            }
            IntervalDetector::Silence { .. } => {
                if !line.contains("silencedetect") {
                    return None;
                }
                let end = field(line, "silence_end:")?;
                let duration = field(line, "silence_duration:")?;
                Some(DetectorEvent::Point(end - duration / 2.0))
            }
            IntervalDetector::Scene { .. } => field(line, "pts_time:").map(DetectorEvent::Point),
        }
    }
}

impl fmt::Display for IntervalDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntervalDetector::Black { .. } => "black",
            IntervalDetector::Silence { .. } => "silence",
            IntervalDetector::Scene { .. } => "scene",
        };
        write!(f, "{}", name)
    }
}

/// Value following `key`, up to the next whitespace or `|`
fn field(line: &str, key: &str) -> Option<f64> {
    let start = line.find(key)? + key.len();
    line[start..]
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '|')
        .next()?
        .parse()
        .ok()
}

/// Accumulates detector events for one job over `[from, to]`
#[derive(Debug, Clone)]
pub struct IntervalCollector {
    mode: AggregationMode,
    from: f64,
    to: f64,
    spans: Vec<Interval>,
    points: Vec<f64>,
}

impl IntervalCollector {
    pub fn new(mode: AggregationMode, from: f64, to: f64) -> Self {
        Self {
            mode,
            from,
            to,
            spans: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Record an event; times are offset by the job's `from`
    pub fn push(&mut self, event: DetectorEvent) {
        match (self.mode, event) {
            (AggregationMode::Bounding, DetectorEvent::Span { start, end }) => {
                self.spans
                    .push(Interval::new(self.from + start, self.from + end));
            }
            (AggregationMode::Midpoint, DetectorEvent::Point(point)) => {
                let point = self.from + point;
                if point > self.from && point < self.to {
                    self.points.push(point);
                }
            }
            // Events of the other mode are not produced by any detector
            _ => {}
        }
    }

    /// Produce the detected intervals
    pub fn finish(mut self) -> Vec<Interval> {
        match self.mode {
            AggregationMode::Bounding => self.spans,
            AggregationMode::Midpoint => {
                if self.points.is_empty() {
                    return Vec::new();
                }
                self.points
                    .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                self.points.dedup();

                let mut bounds = Vec::with_capacity(self.points.len() + 2);
                bounds.push(self.from);
                bounds.extend(self.points.iter().copied());
                bounds.push(self.to);

                bounds
                    .windows(2)
                    .map(|pair| Interval::new(pair[0], pair[1]))
                    .filter(|interval| interval.end > interval.start)
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_line_is_bounding() {
        let detector = IntervalDetector::black();
        let line = "[blackdetect @ 0x7f8] black_start:1.5 black_end:3.25 black_duration:1.75";
        assert_eq!(
            detector.match_line(line),
            Some(DetectorEvent::Span {
                start: 1.5,
                end: 3.25
            })
        );
        assert_eq!(detector.mode(), AggregationMode::Bounding);
    }

    #[test]
    fn test_silence_line_yields_midpoint() {
        let detector = IntervalDetector::silence();
        let line = "[silencedetect @ 0x55] silence_end: 12.5 | silence_duration: 3";
        assert_eq!(detector.match_line(line), Some(DetectorEvent::Point(11.0)));
        assert_eq!(
            detector.match_line("[silencedetect @ 0x55] silence_start: 9.5"),
            None
        );
    }

    #[test]
    fn test_scene_line_yields_point() {
        let detector = IntervalDetector::scene();
        let line = "[Parsed_metadata_1 @ 0x1] frame:3    pts:96000   pts_time:4.2";
        assert_eq!(detector.match_line(line), Some(DetectorEvent::Point(4.2)));
        assert_eq!(detector.match_line("lavfi.scene_score=0.41"), None);
    }

    #[test]
    fn test_bounding_offsets_by_from() {
        let mut collector = IntervalCollector::new(AggregationMode::Bounding, 10.0, 60.0);
        collector.push(DetectorEvent::Span {
            start: 1.0,
            end: 2.0,
        });
        collector.push(DetectorEvent::Span {
            start: 5.0,
            end: 7.5,
        });
        assert_eq!(
            collector.finish(),
            vec![Interval::new(11.0, 12.0), Interval::new(15.0, 17.5)]
        );
    }

    #[test]
    fn test_midpoint_spans_from_to() {
        let mut collector = IntervalCollector::new(AggregationMode::Midpoint, 10.0, 40.0);
        collector.push(DetectorEvent::Point(5.0));
        collector.push(DetectorEvent::Point(20.0));
        assert_eq!(
            collector.finish(),
            vec![
                Interval::new(10.0, 15.0),
                Interval::new(15.0, 30.0),
                Interval::new(30.0, 40.0)
            ]
        );
    }

    #[test]
    fn test_midpoint_without_points_is_empty() {
        let collector = IntervalCollector::new(AggregationMode::Midpoint, 0.0, 40.0);
        assert!(collector.finish().is_empty());
    }

    #[test]
    fn test_midpoint_ignores_points_outside_range() {
        let mut collector = IntervalCollector::new(AggregationMode::Midpoint, 0.0, 10.0);
        collector.push(DetectorEvent::Point(0.0));
        collector.push(DetectorEvent::Point(4.0));
        collector.push(DetectorEvent::Point(4.0));
        collector.push(DetectorEvent::Point(12.0));
        assert_eq!(
            collector.finish(),
            vec![Interval::new(0.0, 4.0), Interval::new(4.0, 10.0)]
        );
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(IntervalDetector::parse("Black"), Some(IntervalDetector::black()));
        assert_eq!(IntervalDetector::parse("loud"), None);
    }
}
