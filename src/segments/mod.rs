//! Segment Store: the ordered segment collection, its selection and history
//!
//! Every structural edit goes through [`SegmentStore`], which keeps the
//! collection non-empty, keeps `start < end` for every segment whose bounds
//! are both defined, and records a snapshot in the undo history.

pub mod history;
pub mod project;
pub mod selection;

use tracing::{debug, info};

use crate::domain::model::*;
use crate::domain::rules;
use crate::error::{SeamcutError, SeamcutResult};
use crate::ports::KeyframeLocator;

pub use history::{History, HISTORY_LIMIT};
pub use selection::Selection;

/// A restorable state of the collection
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSnapshot {
    pub segments: Vec<Segment>,
    pub current: usize,
}

/// Owner of the segment collection
#[derive(Debug, Clone)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    current: usize,
    selection: Selection,
    history: History<SegmentSnapshot>,
    duration: Option<f64>,
    next_color: u32,
}

impl SegmentStore {
    /// Create a store holding a single full-timeline segment
    pub fn new(duration: Option<f64>) -> Self {
        let segments = vec![Segment::full_timeline(0)];
        let history = History::new(SegmentSnapshot {
            segments: segments.clone(),
            current: 0,
        });
        Self {
            segments,
            current: 0,
            selection: Selection::all(),
            history,
            duration,
            next_color: 1,
        }
    }

    /// Create a store from existing segments; an empty list yields a full-timeline segment
    pub fn from_segments(segments: Vec<Segment>, duration: Option<f64>) -> SeamcutResult<Self> {
        if let Some(bad) = segments.iter().find(|s| !s.has_valid_bounds()) {
            return Err(SeamcutError::invalid_range(format!(
                "segment {} has start >= end",
                bad.id
            )));
        }

        let mut store = Self::new(duration);
        if segments.is_empty() {
            return Ok(store);
        }

        store.next_color = segments.iter().map(|s| s.color_index + 1).max().unwrap_or(1);
        store.segments = segments;
        store.history = History::new(store.snapshot());
        Ok(store)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Update the media duration that open bounds resolve against
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Segment {
        &self.segments[self.current]
    }

    /// Move the cursor to another segment
    pub fn set_current(&mut self, index: usize) -> SeamcutResult<()> {
        if index >= self.segments.len() {
            return Err(SeamcutError::invalid_range(format!(
                "segment index {} out of bounds ({} segments)",
                index,
                self.segments.len()
            )));
        }
        self.current = index;
        Ok(())
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// All segments with bounds resolved against the duration
    pub fn apparent_segments(&self) -> Vec<ApparentSegment> {
        self.segments.iter().map(|s| s.apparent(self.duration)).collect()
    }

    /// Selected segments in timeline order
    pub fn selected_segments(&self) -> Vec<&Segment> {
        self.selection.effective(&self.segments)
    }

    /// Compute the gaps between segments without modifying the store
    pub fn inverse_segments(&self) -> Option<Vec<Interval>> {
        rules::inverse_segments(&self.segments, self.duration)
    }

    /// Append a new segment starting at `at_time`.
    ///
    /// Returns `Ok(None)` without changes while the current segment is still
    /// open (neither bound set).
    pub fn add_segment(&mut self, at_time: f64) -> SeamcutResult<Option<SegmentId>> {
        if self.current().is_open() {
            debug!("Cannot add a segment while the previous one is unfinished");
            return Ok(None);
        }
        if let Some(duration) = self.duration {
            if at_time >= duration {
                return Err(SeamcutError::invalid_range(format!(
                    "cannot add a segment at {:.3}s, media ends at {:.3}s",
                    at_time, duration
                )));
            }
        }

        let segment = Segment::new(Some(at_time.max(0.0)), None, self.take_color());
        let id = segment.id;
        self.segments.push(segment);
        self.current = self.segments.len() - 1;
        self.commit();
        Ok(Some(id))
    }

    /// Set the start or end of the current segment
    pub fn set_cut_point(&mut self, side: CutSide, time: f64) -> SeamcutResult<()> {
        let segment = self.current();
        let apparent_start = segment.start.unwrap_or(0.0);
        let apparent_end = segment.end.or(self.duration);

        match side {
            CutSide::Start => {
                if let Some(end) = apparent_end {
                    if time >= end {
                        return Err(SeamcutError::invalid_range(format!(
                            "start {:.3}s must be before end {:.3}s",
                            time, end
                        )));
                    }
                }
            }
            CutSide::End => {
                if time <= apparent_start {
                    return Err(SeamcutError::invalid_range(format!(
                        "end {:.3}s must be after start {:.3}s",
                        time, apparent_start
                    )));
                }
            }
        }

        let clamped = self.clamp_time(time);
        let current = self.current;
        match side {
            CutSide::Start => self.segments[current].start = Some(clamped),
            CutSide::End => self.segments[current].end = Some(clamped),
        }
        self.commit();
        Ok(())
    }

    /// Split the first segment containing `time` into two halves
    pub fn split_at(&mut self, time: f64) -> SeamcutResult<(SegmentId, SegmentId)> {
        let index = self
            .segments
            .iter()
            .position(|s| s.apparent(self.duration).contains(time))
            .ok_or(SeamcutError::NoSegmentAtCursor { time })?;

        let original = self.segments[index].clone();
        let suffixed = |suffix: &str| {
            if original.name.is_empty() {
                String::new()
            } else {
                format!("{} {}", original.name, suffix)
            }
        };

        let first = Segment {
            end: Some(time),
            name: suffixed("1"),
            ..original.clone()
        };
        let second = Segment {
            id: SegmentId::new(),
            color_index: self.take_color(),
            start: Some(time),
            end: original.end,
            name: suffixed("2"),
            tags: original.tags.clone(),
        };
        let ids = (first.id, second.id);

        self.segments.splice(index..=index, [first, second]);
        if self.current > index {
            self.current += 1;
        }
        self.commit();
        info!("Split segment {} at {:.3}s", original.id, time);
        Ok(ids)
    }

    /// Replace the collection with the gaps between current segments.
    ///
    /// Returns the number of segments created. When there are no gaps the
    /// store is left untouched and `0` is returned.
    pub fn invert_all(&mut self) -> SeamcutResult<usize> {
        let gaps = self.inverse_segments().ok_or(SeamcutError::OverlapDetected)?;
        if gaps.is_empty() {
            return Ok(0);
        }

        self.segments = gaps
            .iter()
            .enumerate()
            .map(|(i, gap)| Segment::new(Some(gap.start), Some(gap.end), i as u32))
            .collect();
        self.next_color = self.segments.len() as u32;
        self.current = 0;
        self.selection.select_all();
        self.commit();
        Ok(self.segments.len())
    }

    /// Append segments covering every gap, keeping existing segments
    pub fn fill_gaps(&mut self) -> SeamcutResult<usize> {
        let gaps = self.inverse_segments().ok_or(SeamcutError::OverlapDetected)?;
        if gaps.is_empty() {
            return Ok(0);
        }

        for gap in &gaps {
            let color = self.take_color();
            self.segments
                .push(Segment::new(Some(gap.start), Some(gap.end), color));
        }
        self.commit();
        Ok(gaps.len())
    }

    /// Merge overlapping segments until none overlap
    pub fn combine_overlapping(&mut self) {
        let current_id = self.current().id;
        self.segments = rules::combine_overlapping(&self.segments, self.duration);
        self.current = self
            .segments
            .iter()
            .position(|s| s.id == current_id)
            .unwrap_or(0);
        self.commit();
    }

    /// Merge all selected segments into one spanning their union
    pub fn combine_selected(&mut self) -> SeamcutResult<SegmentId> {
        let selected: Vec<Segment> = self.selected_segments().into_iter().cloned().collect();
        if selected.len() < 2 {
            return Err(SeamcutError::invalid_range(
                "at least two segments must be selected to combine",
            ));
        }
        let combined = rules::combine_all(&selected, self.duration)
            .ok_or_else(|| SeamcutError::invalid_range("nothing to combine"))?;
        let combined_id = combined.id;

        let insert_at = self
            .segments
            .iter()
            .position(|s| self.selection.is_selected(&s.id))
            .unwrap_or(0);
        let selection = self.selection.clone();
        self.segments.retain(|s| !selection.is_selected(&s.id));
        let insert_at = insert_at.min(self.segments.len());
        self.segments.insert(insert_at, combined);
        self.current = insert_at;
        self.commit();
        Ok(combined_id)
    }

    /// Shift the chosen bound(s) of every selected segment.
    ///
    /// Results are clamped into `[0, duration]`; segments whose end no longer
    /// exceeds their start are dropped.
    pub fn shift_selected(&mut self, amount: f64, which: BoundSelector) {
        let duration = self.duration;
        let clamp = |t: f64| match duration {
            Some(d) => t.max(0.0).min(d),
            None => t.max(0.0),
        };

        let selection = self.selection.clone();
        let shifted: Vec<Segment> = self
            .segments
            .iter()
            .map(|segment| {
                if !selection.is_selected(&segment.id) {
                    return segment.clone();
                }
                let mut updated = segment.clone();
                if which.includes_start() {
                    updated.start = Some(clamp(segment.start.unwrap_or(0.0) + amount));
                }
                if which.includes_end() {
                    updated.end = segment.end.or(duration).map(|end| clamp(end + amount));
                }
                updated
            })
            .filter(|segment| match (segment.start, segment.end.or(duration)) {
                (Some(start), Some(end)) => end > start,
                (None, Some(end)) => end > 0.0,
                _ => true,
            })
            .collect();

        let dropped = self.segments.len() - shifted.len();
        if dropped > 0 {
            info!("Shift removed {} segment(s) that became empty", dropped);
        }

        if shifted.is_empty() {
            self.reset();
            return;
        }

        self.segments = shifted;
        self.current = self.current.min(self.segments.len() - 1);
        self.commit();
    }

    /// Snap the chosen bound(s) of every selected segment to a keyframe.
    ///
    /// Open bounds are already on the timeline edges and are left alone. If
    /// any lookup comes back empty the whole operation fails and the store is
    /// not modified.
    pub async fn align_selected_to_keyframes(
        &mut self,
        locator: &dyn KeyframeLocator,
        which: BoundSelector,
        direction: KeyframeDirection,
    ) -> SeamcutResult<()> {
        let mut updated = self.segments.clone();

        for segment in updated.iter_mut() {
            if !self.selection.is_selected(&segment.id) {
                continue;
            }
            if which.includes_start() {
                if let Some(start) = segment.start {
                    segment.start = Some(snap(locator, start, direction).await?);
                }
            }
            if which.includes_end() {
                if let Some(end) = segment.end {
                    segment.end = Some(snap(locator, end, direction).await?);
                }
            }
            if !segment.has_valid_bounds() {
                return Err(SeamcutError::invalid_range(format!(
                    "aligning segment {} to keyframes would make it empty",
                    segment.id
                )));
            }
        }

        self.segments = updated;
        self.commit();
        Ok(())
    }

    /// Stable-sort segments by apparent start, keeping the cursor on the same segment
    pub fn reorder_by_start_time(&mut self) {
        let current_id = self.current().id;
        let duration = self.duration;
        self.segments
            .sort_by(|a, b| rules::cmp_time(a.apparent(duration).start, b.apparent(duration).start));
        self.current = self
            .segments
            .iter()
            .position(|s| s.id == current_id)
            .unwrap_or(0);
        self.commit();
    }

    /// Remove one segment; removing the last one resets the store
    pub fn remove_segment(&mut self, id: SegmentId) -> SeamcutResult<()> {
        let index = self
            .segments
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SeamcutError::invalid_range(format!("unknown segment {}", id)))?;

        if self.segments.len() == 1 {
            self.reset();
            return Ok(());
        }

        self.segments.remove(index);
        if self.current >= self.segments.len() || self.current > index {
            self.current = self.current.saturating_sub(1);
        }
        self.commit();
        Ok(())
    }

    /// Reset to a single full-timeline segment and restart color assignment
    pub fn reset(&mut self) {
        self.segments = vec![Segment::full_timeline(0)];
        self.next_color = 1;
        self.current = 0;
        self.selection.select_all();
        self.commit();
    }

    pub fn select_only(&mut self, id: SegmentId) {
        self.selection.select_only(&self.segments, id);
    }

    pub fn toggle_selected(&mut self, id: SegmentId) {
        self.selection.toggle(id);
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    pub fn deselect_all(&mut self) {
        self.selection.deselect_all(&self.segments);
    }

    pub fn select_by_label(&mut self, label: &str) {
        self.selection.select_by_label(&self.segments, label);
    }

    pub fn select_by_tag_value(&mut self, key: &str, value: &str) {
        self.selection.select_by_tag_value(&self.segments, key, value);
    }

    /// Restore the previous snapshot
    pub fn undo(&mut self) -> bool {
        match self.history.undo().cloned() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone snapshot
    pub fn redo(&mut self) -> bool {
        match self.history.redo().cloned() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn snapshot(&self) -> SegmentSnapshot {
        SegmentSnapshot {
            segments: self.segments.clone(),
            current: self.current,
        }
    }

    fn restore(&mut self, snapshot: SegmentSnapshot) {
        self.segments = snapshot.segments;
        self.current = snapshot.current.min(self.segments.len().saturating_sub(1));
        self.selection.retain_existing(&self.segments);
        // Restored segments may carry colours handed out before a reset
        let restored = self.segments.iter().map(|s| s.color_index + 1).max().unwrap_or(1);
        self.next_color = self.next_color.max(restored);
    }

    fn commit(&mut self) {
        self.selection.retain_existing(&self.segments);
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    fn take_color(&mut self) -> u32 {
        let color = self.next_color;
        self.next_color += 1;
        color
    }

    fn clamp_time(&self, time: f64) -> f64 {
        match self.duration {
            Some(duration) => time.max(0.0).min(duration),
            None => time.max(0.0),
        }
    }
}

async fn snap(
    locator: &dyn KeyframeLocator,
    time: f64,
    direction: KeyframeDirection,
) -> SeamcutResult<f64> {
    locator
        .find_keyframe(time, direction)
        .await?
        .ok_or(SeamcutError::KeyframeSearchFailed {
            time,
            window: locator.search_window(),
        })
}

#[cfg(test)]
mod tests;
