//! Segment selection stored as its complement

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::model::{Segment, SegmentId};

/// Selection state kept as the set of *deselected* ids.
///
/// The empty set means every segment is selected, so "select all" is the
/// default and costs nothing. A segment is selected exactly when its id is
/// not in the set; ids of segments that no longer exist are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    deselected: HashSet<SegmentId>,
}

impl Selection {
    /// Everything selected
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether a segment is selected
    pub fn is_selected(&self, id: &SegmentId) -> bool {
        !self.deselected.contains(id)
    }

    /// Whether every segment in `segments` is selected
    pub fn covers_all(&self, segments: &[Segment]) -> bool {
        segments.iter().all(|s| self.is_selected(&s.id))
    }

    /// The effective selection, in timeline order
    pub fn effective<'a>(&self, segments: &'a [Segment]) -> Vec<&'a Segment> {
        segments.iter().filter(|s| self.is_selected(&s.id)).collect()
    }

    /// Number of selected segments
    pub fn count(&self, segments: &[Segment]) -> usize {
        segments.iter().filter(|s| self.is_selected(&s.id)).count()
    }

    /// Select exactly one segment
    pub fn select_only(&mut self, segments: &[Segment], id: SegmentId) {
        self.deselected = segments.iter().map(|s| s.id).filter(|sid| *sid != id).collect();
    }

    /// Flip the selection state of one segment
    pub fn toggle(&mut self, id: SegmentId) {
        if !self.deselected.remove(&id) {
            self.deselected.insert(id);
        }
    }

    /// Select every segment
    pub fn select_all(&mut self) {
        self.deselected.clear();
    }

    /// Deselect every segment
    pub fn deselect_all(&mut self, segments: &[Segment]) {
        self.deselected = segments.iter().map(|s| s.id).collect();
    }

    /// Select exactly the segments whose name equals `label`
    pub fn select_by_label(&mut self, segments: &[Segment], label: &str) {
        self.select_where(segments, |s| s.name == label);
    }

    /// Select exactly the segments carrying tag `key` with value `value`
    pub fn select_by_tag_value(&mut self, segments: &[Segment], key: &str, value: &str) {
        self.select_where(segments, |s| s.tags.get(key).map(String::as_str) == Some(value));
    }

    /// Drop ids that no longer refer to a segment
    pub fn retain_existing(&mut self, segments: &[Segment]) {
        self.deselected.retain(|id| segments.iter().any(|s| s.id == *id));
    }

    fn select_where<F>(&mut self, segments: &[Segment], predicate: F)
    where
        F: Fn(&Segment) -> bool,
    {
        self.deselected = segments
            .iter()
            .filter(|s| !predicate(s))
            .map(|s| s.id)
            .collect();
    }
}
