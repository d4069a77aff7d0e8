use crate::config::HISTORY_LIMIT;
use crate::planner::types::HistoryEntry;

/// Linear undo/redo log with a cursor. The cursor points at the most recently
/// applied entry, or -1 when everything has been undone. Recording while not
/// at the end truncates the abandoned redo branch first.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: isize,
}

impl History {
    pub fn new() -> Self {
        History {
            entries: Vec::new(),
            cursor: -1,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        // Drop any undone-then-superseded branch
        if self.cursor < self.entries.len() as isize - 1 {
            self.entries.truncate((self.cursor + 1) as usize);
        }

        self.entries.push(entry);
        self.cursor += 1;

        if self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    /// Steps the cursor back and returns the entry to invert, if any.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        if self.cursor >= 0 {
            let entry = self.entries[self.cursor as usize].clone();
            self.cursor -= 1;
            Some(entry)
        } else {
            None
        }
    }

    /// Steps the cursor forward and returns the entry to re-apply, if any.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        if self.cursor < self.entries.len() as isize - 1 {
            self.cursor += 1;
            Some(self.entries[self.cursor as usize].clone())
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len() as isize - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::HistoryAction;

    fn entry(index: usize) -> HistoryEntry {
        HistoryEntry {
            action: HistoryAction::Add,
            index,
            previous: None,
            new: None,
            timestamp: 0,
        }
    }

    #[test]
    fn undo_redo_walk_the_cursor() {
        let mut history = History::new();
        history.record(entry(0));
        history.record(entry(1));

        assert!(history.can_undo());
        assert_eq!(history.undo().unwrap().index, 1);
        assert_eq!(history.undo().unwrap().index, 0);
        assert!(!history.can_undo());
        assert!(history.undo().is_none());

        assert_eq!(history.redo().unwrap().index, 0);
        assert_eq!(history.redo().unwrap().index, 1);
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn recording_after_undo_truncates_branch() {
        let mut history = History::new();
        history.record(entry(0));
        history.record(entry(1));
        history.record(entry(2));

        history.undo();
        history.undo();
        history.record(entry(9));

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo().unwrap().index, 9);
        assert_eq!(history.undo().unwrap().index, 0);
    }

    #[test]
    fn bounded_at_fifty_entries() {
        let mut history = History::new();
        for i in 0..60 {
            history.record(entry(i));
        }
        assert_eq!(history.len(), 50);
        // Cursor still points at the newest entry; the oldest ten are gone
        assert_eq!(history.undo().unwrap().index, 59);
        let mut oldest = 0;
        while let Some(e) = history.undo() {
            oldest = e.index;
        }
        assert_eq!(oldest, 10);
    }
}
