// Unit tests for the segment store

use async_trait::async_trait;

use super::*;

fn store_with(bounds: &[(f64, f64)], duration: f64) -> SegmentStore {
    let segments = bounds
        .iter()
        .enumerate()
        .map(|(i, (start, end))| Segment::new(Some(*start), Some(*end), i as u32))
        .collect();
    SegmentStore::from_segments(segments, Some(duration)).unwrap()
}

fn bounds(store: &SegmentStore) -> Vec<(f64, f64)> {
    store
        .apparent_segments()
        .iter()
        .map(|s| (s.start, s.end))
        .collect()
}

fn assert_invariants(store: &SegmentStore) {
    assert!(!store.segments().is_empty());
    for segment in store.segments() {
        assert!(segment.has_valid_bounds(), "invalid segment {:?}", segment);
    }
}

/// Locator that answers from a fixed keyframe list within a window
struct FixedLocator {
    keyframes: Vec<f64>,
    window: f64,
}

#[async_trait]
impl KeyframeLocator for FixedLocator {
    async fn find_keyframe(
        &self,
        time: f64,
        direction: KeyframeDirection,
    ) -> SeamcutResult<Option<f64>> {
        let in_window = self
            .keyframes
            .iter()
            .copied()
            .filter(|k| (k - time).abs() <= self.window);
        Ok(match direction {
            KeyframeDirection::Before => in_window.filter(|k| *k <= time).fold(None, |acc, k| {
                Some(acc.map_or(k, |a: f64| a.max(k)))
            }),
            KeyframeDirection::After => in_window.filter(|k| *k >= time).fold(None, |acc, k| {
                Some(acc.map_or(k, |a: f64| a.min(k)))
            }),
            KeyframeDirection::Nearest => in_window.fold(None, |acc: Option<f64>, k| match acc {
                Some(a) if (a - time).abs() <= (k - time).abs() => Some(a),
                _ => Some(k),
            }),
        })
    }

    fn search_window(&self) -> f64 {
        self.window
    }
}

#[test]
fn test_new_store_has_single_full_segment() {
    let store = SegmentStore::new(Some(60.0));
    assert_eq!(store.segments().len(), 1);
    assert!(store.current().is_open());
    assert_eq!(bounds(&store), vec![(0.0, 60.0)]);
}

#[test]
fn test_add_segment_is_noop_while_current_is_open() {
    let mut store = SegmentStore::new(Some(60.0));
    assert_eq!(store.add_segment(10.0).unwrap(), None);
    assert_eq!(store.segments().len(), 1);
}

#[test]
fn test_add_segment_after_setting_a_bound() {
    let mut store = SegmentStore::new(Some(60.0));
    store.set_cut_point(CutSide::End, 10.0).unwrap();
    let id = store.add_segment(20.0).unwrap().unwrap();
    assert_eq!(store.segments().len(), 2);
    assert_eq!(store.current().id, id);
    assert_eq!(store.current().start, Some(20.0));
    assert_eq!(store.current().color_index, 1);
    assert_invariants(&store);
}

#[test]
fn test_add_segment_past_end_is_rejected() {
    let mut store = store_with(&[(0.0, 10.0)], 60.0);
    assert!(matches!(
        store.add_segment(60.0),
        Err(SeamcutError::InvalidRange { .. })
    ));
    assert_eq!(store.segments().len(), 1);
}

#[test]
fn test_set_cut_point_rejects_inverted_bounds() {
    let mut store = store_with(&[(10.0, 20.0)], 60.0);
    assert!(matches!(
        store.set_cut_point(CutSide::Start, 20.0),
        Err(SeamcutError::InvalidRange { .. })
    ));
    assert!(matches!(
        store.set_cut_point(CutSide::End, 10.0),
        Err(SeamcutError::InvalidRange { .. })
    ));
    assert_eq!(bounds(&store), vec![(10.0, 20.0)]);
}

#[test]
fn test_set_cut_point_clamps_into_duration() {
    let mut store = store_with(&[(10.0, 20.0)], 60.0);
    store.set_cut_point(CutSide::End, 75.0).unwrap();
    assert_eq!(store.current().end, Some(60.0));
    store.set_cut_point(CutSide::Start, -3.0).unwrap();
    assert_eq!(store.current().start, Some(0.0));
    assert_invariants(&store);
}

#[test]
fn test_split_reproduces_original_range() {
    let mut store = SegmentStore::new(Some(60.0));
    let before = bounds(&store)[0];
    store.split_at(25.0).unwrap();
    let after = bounds(&store);
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].0, before.0);
    assert_eq!(after[0].1, 25.0);
    assert_eq!(after[1].0, 25.0);
    assert_eq!(after[1].1, before.1);
    assert_invariants(&store);
}

#[test]
fn test_split_names_and_colors() {
    let segment = Segment::new(Some(0.0), Some(30.0), 0)
        .with_name("scene")
        .with_tag("take", "2");
    let mut store = SegmentStore::from_segments(vec![segment], Some(60.0)).unwrap();
    let (first, second) = store.split_at(10.0).unwrap();

    let segments = store.segments();
    assert_eq!(segments[0].id, first);
    assert_eq!(segments[1].id, second);
    assert_eq!(segments[0].name, "scene 1");
    assert_eq!(segments[1].name, "scene 2");
    assert_eq!(segments[0].color_index, 0);
    assert_eq!(segments[1].color_index, 1);
    assert_eq!(segments[1].tags.get("take").unwrap(), "2");
}

#[test]
fn test_split_unnamed_segment_stays_unnamed() {
    let mut store = SegmentStore::new(Some(60.0));
    store.split_at(10.0).unwrap();
    assert!(store.segments().iter().all(|s| s.name.is_empty()));
}

#[test]
fn test_split_outside_any_segment_fails() {
    let mut store = store_with(&[(10.0, 20.0)], 60.0);
    assert!(matches!(
        store.split_at(30.0),
        Err(SeamcutError::NoSegmentAtCursor { .. })
    ));
    assert!(matches!(
        store.split_at(10.0),
        Err(SeamcutError::NoSegmentAtCursor { .. })
    ));
}

#[test]
fn test_invert_twice_restores_boundaries() {
    let original = vec![(5.0, 10.0), (20.0, 30.0), (45.0, 60.0)];
    let mut store = store_with(&original, 60.0);
    store.invert_all().unwrap();
    assert_eq!(bounds(&store), vec![(0.0, 5.0), (10.0, 20.0), (30.0, 45.0)]);
    store.invert_all().unwrap();
    assert_eq!(bounds(&store), original);
    assert_invariants(&store);
}

#[test]
fn test_invert_reassigns_colors_by_position() {
    let mut store = store_with(&[(5.0, 10.0), (20.0, 30.0)], 60.0);
    store.invert_all().unwrap();
    let colors: Vec<u32> = store.segments().iter().map(|s| s.color_index).collect();
    assert_eq!(colors, vec![0, 1, 2]);
}

#[test]
fn test_invert_with_overlap_fails_without_mutation() {
    let mut store = store_with(&[(0.0, 20.0), (10.0, 30.0)], 60.0);
    let before = bounds(&store);
    assert!(matches!(store.invert_all(), Err(SeamcutError::OverlapDetected)));
    assert_eq!(bounds(&store), before);
}

#[test]
fn test_invert_without_duration_fails() {
    let mut store = SegmentStore::new(None);
    assert!(matches!(store.invert_all(), Err(SeamcutError::OverlapDetected)));
}

#[test]
fn test_invert_full_coverage_is_noop() {
    let mut store = SegmentStore::new(Some(60.0));
    assert_eq!(store.invert_all().unwrap(), 0);
    assert_eq!(store.segments().len(), 1);
}

#[test]
fn test_fill_gaps_appends_with_continuing_colors() {
    let mut store = store_with(&[(5.0, 10.0), (20.0, 30.0)], 40.0);
    assert_eq!(store.fill_gaps().unwrap(), 3);
    assert_eq!(store.segments().len(), 5);
    let colors: Vec<u32> = store.segments().iter().map(|s| s.color_index).collect();
    assert_eq!(colors, vec![0, 1, 2, 3, 4]);
    assert!(store.inverse_segments().unwrap().is_empty());
}

#[test]
fn test_combine_overlapping() {
    let mut store = store_with(&[(0.0, 10.0), (8.0, 20.0), (30.0, 40.0)], 60.0);
    store.combine_overlapping();
    assert_eq!(bounds(&store), vec![(0.0, 20.0), (30.0, 40.0)]);
}

#[test]
fn test_combine_selected() {
    let mut store = store_with(&[(0.0, 10.0), (20.0, 30.0), (40.0, 50.0)], 60.0);
    let third = store.segments()[2].id;
    store.toggle_selected(third);
    store.combine_selected().unwrap();
    assert_eq!(bounds(&store), vec![(0.0, 30.0), (40.0, 50.0)]);
}

#[test]
fn test_combine_selected_needs_two() {
    let mut store = store_with(&[(0.0, 10.0), (20.0, 30.0)], 60.0);
    let first = store.segments()[0].id;
    store.select_only(first);
    assert!(store.combine_selected().is_err());
}

#[test]
fn test_shift_clamps_and_drops_empty_segments() {
    let mut store = store_with(&[(0.0, 2.0), (10.0, 20.0), (55.0, 58.0)], 60.0);
    store.shift_selected(-5.0, BoundSelector::Both);
    assert_eq!(bounds(&store), vec![(5.0, 15.0), (50.0, 53.0)]);
    assert_invariants(&store);

    store.shift_selected(10.0, BoundSelector::Both);
    assert_eq!(bounds(&store), vec![(15.0, 25.0)]);
    assert_invariants(&store);
}

#[test]
fn test_shift_only_selected_start() {
    let mut store = store_with(&[(10.0, 20.0), (30.0, 40.0)], 60.0);
    let second = store.segments()[1].id;
    store.select_only(second);
    store.shift_selected(2.0, BoundSelector::Start);
    assert_eq!(bounds(&store), vec![(10.0, 20.0), (32.0, 40.0)]);
}

#[test]
fn test_shift_everything_away_resets() {
    let mut store = store_with(&[(10.0, 20.0)], 60.0);
    store.shift_selected(100.0, BoundSelector::Both);
    assert_eq!(store.segments().len(), 1);
    assert!(store.current().is_open());
}

#[tokio::test]
async fn test_align_to_keyframes() {
    let mut store = store_with(&[(10.3, 20.7)], 60.0);
    let locator = FixedLocator {
        keyframes: vec![0.0, 10.0, 12.0, 20.0, 22.0],
        window: 5.0,
    };
    store
        .align_selected_to_keyframes(&locator, BoundSelector::Both, KeyframeDirection::Before)
        .await
        .unwrap();
    assert_eq!(bounds(&store), vec![(10.0, 20.0)]);

    store
        .align_selected_to_keyframes(&locator, BoundSelector::End, KeyframeDirection::After)
        .await
        .unwrap();
    assert_eq!(bounds(&store), vec![(10.0, 20.0)]);
}

#[tokio::test]
async fn test_align_failure_leaves_state_unchanged() {
    let mut store = store_with(&[(10.3, 20.7), (40.5, 50.0)], 60.0);
    let locator = FixedLocator {
        keyframes: vec![10.0, 20.0],
        window: 2.0,
    };
    let before = bounds(&store);
    let result = store
        .align_selected_to_keyframes(&locator, BoundSelector::Start, KeyframeDirection::Nearest)
        .await;
    assert!(matches!(
        result,
        Err(SeamcutError::KeyframeSearchFailed { .. })
    ));
    assert_eq!(bounds(&store), before);
}

#[test]
fn test_reorder_keeps_cursor_on_same_segment() {
    let mut store = store_with(&[(30.0, 40.0), (0.0, 10.0), (15.0, 20.0)], 60.0);
    let id = store.segments()[0].id;
    store.set_current(0).unwrap();
    store.reorder_by_start_time();
    assert_eq!(bounds(&store), vec![(0.0, 10.0), (15.0, 20.0), (30.0, 40.0)]);
    assert_eq!(store.current().id, id);
    assert_eq!(store.current_index(), 2);
}

#[test]
fn test_remove_last_segment_resets_counter() {
    let mut store = store_with(&[(0.0, 10.0), (20.0, 30.0)], 60.0);
    let ids: Vec<_> = store.segments().iter().map(|s| s.id).collect();
    store.remove_segment(ids[0]).unwrap();
    store.remove_segment(ids[1]).unwrap();
    assert_eq!(store.segments().len(), 1);
    assert!(store.current().is_open());

    store.set_cut_point(CutSide::End, 5.0).unwrap();
    store.add_segment(10.0).unwrap();
    assert_eq!(store.current().color_index, 1);
}

#[test]
fn test_undo_redo() {
    let mut store = SegmentStore::new(Some(60.0));
    store.split_at(30.0).unwrap();
    assert_eq!(store.segments().len(), 2);
    assert!(store.undo());
    assert_eq!(store.segments().len(), 1);
    assert!(store.redo());
    assert_eq!(store.segments().len(), 2);
    assert!(!store.redo());
}

#[test]
fn test_undo_after_reset_does_not_reuse_colors() {
    let mut store = store_with(&[(0.0, 10.0), (20.0, 30.0), (40.0, 50.0)], 100.0);
    store.reset();
    assert!(store.undo());
    assert_eq!(store.segments().len(), 3);

    store.set_current(2).unwrap();
    store.add_segment(60.0).unwrap().unwrap();
    let mut colors: Vec<u32> = store.segments().iter().map(|s| s.color_index).collect();
    assert_eq!(colors, vec![0, 1, 2, 3]);

    store.split_at(5.0).unwrap();
    colors = store.segments().iter().map(|s| s.color_index).collect();
    colors.sort_unstable();
    colors.dedup();
    assert_eq!(colors.len(), store.segments().len());
}

#[test]
fn test_selection_primitives_through_store() {
    let mut store = store_with(&[(0.0, 10.0), (20.0, 30.0)], 60.0);
    store.deselect_all();
    assert!(store.selected_segments().is_empty());
    store.select_all();
    assert_eq!(store.selected_segments().len(), 2);
}

#[test]
fn test_invariants_hold_across_edit_sequence() {
    let mut store = SegmentStore::new(Some(120.0));
    store.set_cut_point(CutSide::Start, 3.0).unwrap();
    store.set_cut_point(CutSide::End, 50.0).unwrap();
    store.add_segment(60.0).unwrap();
    store.set_cut_point(CutSide::End, 90.0).unwrap();
    store.split_at(75.0).unwrap();
    store.fill_gaps().unwrap();
    store.reorder_by_start_time();
    store.shift_selected(-10.0, BoundSelector::Start);
    store.combine_overlapping();
    assert_invariants(&store);
    for segment in store.apparent_segments() {
        assert!(segment.is_valid());
    }
}
