/// Linear undo stack of snapshots with a cursor at "now".
///
/// Pushing while the cursor sits behind the tail discards the redo branch.
/// An optional limit drops the oldest snapshots once exceeded.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    cursor: Option<usize>,
    limit: Option<usize>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            limit: None,
        }
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `limit` snapshots (a limit of zero is treated as one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// # Panics
    /// When nothing has been pushed yet.
    pub fn current(&self) -> &T {
        self.try_current()
            .expect("history has no current snapshot; push the initial state first")
    }

    pub fn try_current(&self) -> Option<&T> {
        self.cursor.and_then(|index| self.entries.get(index))
    }

    /// The snapshot right before the cursor, if any.
    pub fn previous(&self) -> Option<&T> {
        let index = self.cursor?.checked_sub(1)?;
        self.entries.get(index)
    }

    pub fn try_undo(&mut self) -> bool {
        match self.cursor {
            Some(index) if index > 0 => {
                self.cursor = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    pub fn try_redo(&mut self) -> bool {
        match self.cursor {
            Some(index) if index + 1 < self.entries.len() => {
                self.cursor = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    pub fn create_next(&mut self, next: T) {
        let insert_at = self.cursor.map_or(0, |index| index + 1);
        self.entries.truncate(insert_at);
        self.entries.push(next);
        self.cursor = Some(insert_at);

        if let Some(limit) = self.limit {
            let overflow = self.entries.len().saturating_sub(limit);
            if overflow > 0 {
                self.entries.drain(..overflow);
                self.cursor = Some(insert_at - overflow);
            }
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor
            .is_some_and(|index| index + 1 < self.entries.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = History::new();
        history.create_next("A");
        history.create_next("B");
        assert!(history.try_undo());
        assert_eq!(*history.current(), "A");
        history.create_next("C");
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(*history.current(), "C");
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_stops_at_first_snapshot() {
        let mut history = History::new();
        history.create_next(1);
        assert!(!history.try_undo());
        assert_eq!(*history.current(), 1);
        history.create_next(2);
        assert!(history.try_undo());
        assert!(!history.try_undo());
        assert_eq!(*history.current(), 1);
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn redo_walks_forward_until_tail() {
        let mut history = History::new();
        for value in 0..3 {
            history.create_next(value);
        }
        assert!(history.try_undo());
        assert!(history.try_undo());
        assert!(history.try_redo());
        assert_eq!(*history.current(), 1);
        assert_eq!(history.previous(), Some(&0));
        assert!(history.try_redo());
        assert!(!history.try_redo());
        assert_eq!(*history.current(), 2);
    }

    #[test]
    fn limit_drops_oldest_snapshots() {
        let mut history = History::with_limit(2);
        history.create_next('a');
        history.create_next('b');
        history.create_next('c');
        assert_eq!(history.len(), 2);
        assert_eq!(*history.current(), 'c');
        assert!(history.try_undo());
        assert_eq!(*history.current(), 'b');
        assert!(!history.try_undo());
    }

    #[test]
    fn empty_history_has_no_current() {
        let mut history = History::<u8>::new();
        assert!(history.try_current().is_none());
        assert!(history.previous().is_none());
        assert!(!history.try_undo());
        assert!(!history.try_redo());
    }

    #[test]
    #[should_panic(expected = "no current snapshot")]
    fn current_on_empty_history_panics() {
        let history = History::<u8>::new();
        let _ = history.current();
    }
}
