// Domain rules - Pure segment-set policies

use std::cmp::Ordering;

use crate::domain::model::*;

/// Total ordering for seconds values that are never NaN in practice
pub fn cmp_time(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Resolve and sort segments by apparent start (stable)
pub fn sorted_apparent(segments: &[Segment], duration: Option<f64>) -> Vec<ApparentSegment> {
    let mut apparent: Vec<ApparentSegment> =
        segments.iter().map(|s| s.apparent(duration)).collect();
    apparent.sort_by(|a, b| cmp_time(a.start, b.start));
    apparent
}

/// Whether any two segments of a start-sorted list overlap
pub fn has_any_overlap(sorted: &[ApparentSegment]) -> bool {
    sorted.windows(2).any(|pair| pair[1].start < pair[0].end)
}

/// Compute the gaps between segments.
///
/// Returns `None` when the duration is unknown, any apparent segment is
/// invalid, or segments overlap.
pub fn inverse_segments(segments: &[Segment], duration: Option<f64>) -> Option<Vec<Interval>> {
    let duration = duration?;
    let sorted = sorted_apparent(segments, Some(duration));
    if sorted.is_empty() || sorted.iter().any(|s| !s.is_valid()) || has_any_overlap(&sorted) {
        return None;
    }

    let mut gaps = Vec::new();

    if let Some(first) = sorted.first() {
        if first.start > 0.0 {
            gaps.push(Interval::new(0.0, first.start));
        }
    }

    for pair in sorted.windows(2) {
        if pair[0].end < pair[1].start {
            gaps.push(Interval::new(pair[0].end, pair[1].start));
        }
    }

    if let Some(last) = sorted.last() {
        if last.end < duration {
            gaps.push(Interval::new(last.end, duration));
        }
    }

    Some(gaps)
}

/// Merge overlapping segments until no pair overlaps.
///
/// The merged segment keeps the identity, name, color and tags of the
/// earliest-starting member. Bounds that resolved from the timeline edges
/// stay open.
pub fn combine_overlapping(segments: &[Segment], duration: Option<f64>) -> Vec<Segment> {
    let mut current: Vec<Segment> = segments.to_vec();

    loop {
        current.sort_by(|a, b| cmp_time(a.apparent(duration).start, b.apparent(duration).start));

        let mut merged: Vec<Segment> = Vec::with_capacity(current.len());
        let mut changed = false;

        for segment in current.into_iter() {
            let Some(last) = merged.last_mut() else {
                merged.push(segment);
                continue;
            };

            let last_apparent = last.apparent(duration);
            let next_apparent = segment.apparent(duration);

            if last_apparent.overlaps(&next_apparent) {
                if next_apparent.end > last_apparent.end {
                    last.end = segment.end;
                }
                changed = true;
            } else {
                merged.push(segment);
            }
        }

        current = merged;
        if !changed {
            return current;
        }
    }
}

/// Merge several segments into one spanning their union
pub fn combine_all(segments: &[Segment], duration: Option<f64>) -> Option<Segment> {
    let first = segments
        .iter()
        .min_by(|a, b| cmp_time(a.apparent(duration).start, b.apparent(duration).start))?;
    let last = segments
        .iter()
        .max_by(|a, b| cmp_time(a.apparent(duration).end, b.apparent(duration).end))?;

    let mut combined = first.clone();
    combined.end = last.end;
    Some(combined)
}
