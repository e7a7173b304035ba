//! Bounded linear undo/redo log

use std::collections::VecDeque;

/// Maximum number of snapshots retained
pub const HISTORY_LIMIT: usize = 100;

/// Linear undo/redo history of full snapshots.
///
/// Pushing after an undo discards the redo branch. Once more than
/// `limit` snapshots exist the oldest one is dropped.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Start a history whose first entry is `initial`
    pub fn new(initial: T) -> Self {
        Self::with_limit(initial, HISTORY_LIMIT)
    }

    /// Start a history with a custom size bound
    pub fn with_limit(initial: T, limit: usize) -> Self {
        let mut entries = VecDeque::with_capacity(limit.min(16));
        entries.push_back(initial);
        Self {
            entries,
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record a new snapshot
    pub fn push(&mut self, snapshot: T) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back, returning the snapshot to restore
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward, returning the snapshot to restore
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::new(0);
        history.push(1);
        history.push(2);
        assert_eq!(history.undo(), Some(&1));
        assert_eq!(history.undo(), Some(&0));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some(&1));
        assert_eq!(history.redo(), Some(&2));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut history = History::new(0);
        history.push(1);
        history.push(2);
        history.undo();
        history.push(3);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(&1));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(0, 3);
        for i in 1..=5 {
            history.push(i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(&4));
        assert_eq!(history.undo(), Some(&3));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_default_limit_is_one_hundred() {
        let mut history = History::new(0);
        for i in 1..=250 {
            history.push(i);
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
    }
}
