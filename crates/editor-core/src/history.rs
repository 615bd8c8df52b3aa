//! Debounced snapshot history.
//!
//! Snapshots pushed while the debounce timer is armed replace the pending one
//! without moving the deadline, so bursts of edits coalesce into one entry.
//! Undo and redo always commit the pending snapshot first.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::range::SerializedRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SerializedRange>,
}

impl Snapshot {
    pub fn new(content: impl Into<String>, selection: Option<SerializedRange>) -> Self {
        Self {
            content: content.into(),
            selection,
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
    pending: Option<Snapshot>,
    deadline: Option<Instant>,
    last: Option<Snapshot>,
    cap: usize,
    debounce: Duration,
}

impl History {
    pub fn new(initial: Snapshot, cap: usize, debounce: Duration) -> Self {
        Self {
            snapshots: vec![initial.clone()],
            index: 0,
            pending: None,
            deadline: None,
            last: Some(initial),
            cap: cap.max(1),
            debounce,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0 || (self.pending.is_some() && !self.snapshots.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        self.pending.is_none() && self.index + 1 < self.snapshots.len()
    }

    /// Records a new state. Equal to the last recorded or applied snapshot
    /// means nothing changed.
    pub fn set_state(&mut self, snapshot: Snapshot, now: Instant) {
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }
        self.last = Some(snapshot.clone());
        self.pending = Some(snapshot);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.debounce);
        }
    }

    /// Advances the timer; commits when the deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.commit(),
            _ => false,
        }
    }

    pub fn commit(&mut self) -> bool {
        self.deadline = None;
        let Some(snapshot) = self.pending.take() else {
            return false;
        };
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.cap {
            let overflow = self.snapshots.len() - self.cap;
            self.snapshots.drain(..overflow);
        }
        self.index = self.snapshots.len() - 1;
        tracing::trace!(entries = self.snapshots.len(), "history commit");
        true
    }

    pub fn undo(&mut self) -> Option<&Snapshot> {
        self.commit();
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.applied()
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        self.commit();
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        self.applied()
    }

    fn applied(&mut self) -> Option<&Snapshot> {
        let snapshot = self.snapshots.get(self.index)?;
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Drops all entries and starts over from `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        *self = Self::new(initial, self.cap, self.debounce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(s: &str) -> Snapshot {
        Snapshot::new(s, None)
    }

    #[test]
    fn burst_of_edits_coalesces_into_one_entry() {
        let t0 = Instant::now();
        let mut history = History::new(snap(""), 500, Duration::from_millis(300));
        history.set_state(snap("a"), t0);
        history.set_state(snap("ab"), t0 + Duration::from_millis(100));
        history.set_state(snap("abc"), t0 + Duration::from_millis(250));
        assert!(!history.tick(t0 + Duration::from_millis(299)));
        assert!(history.tick(t0 + Duration::from_millis(300)));
        assert_eq!(history.len(), 2);
        assert_eq!(history.snapshots()[1].content, "abc");
    }

    #[test]
    fn undo_flushes_pending_then_steps_back() {
        let t0 = Instant::now();
        let mut history = History::new(snap("0"), 500, Duration::from_millis(300));
        history.set_state(snap("1"), t0);
        assert!(history.tick(t0 + Duration::from_secs(1)));
        history.set_state(snap("2"), t0 + Duration::from_secs(2));

        assert_eq!(history.undo().map(|s| s.content.clone()), Some("1".into()));
        assert_eq!(history.undo().map(|s| s.content.clone()), Some("0".into()));
        assert!(history.undo().is_none());
        assert_eq!(history.redo().map(|s| s.content.clone()), Some("1".into()));
    }

    #[test]
    fn new_state_after_undo_discards_redo_branch() {
        let t0 = Instant::now();
        let mut history = History::new(snap("0"), 500, Duration::ZERO);
        history.set_state(snap("1"), t0);
        history.commit();
        history.set_state(snap("2"), t0);
        history.commit();
        history.undo();
        history.set_state(snap("x"), t0);
        history.commit();
        let contents: Vec<_> = history.snapshots().iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["0", "1", "x"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn cap_drops_oldest_entries() {
        let t0 = Instant::now();
        let mut history = History::new(snap("0"), 3, Duration::ZERO);
        for i in 1..=5 {
            history.set_state(snap(&i.to_string()), t0);
            history.commit();
        }
        let contents: Vec<_> = history.snapshots().iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["3", "4", "5"]);
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn reapplied_state_is_ignored() {
        let t0 = Instant::now();
        let mut history = History::new(snap("0"), 500, Duration::ZERO);
        history.set_state(snap("1"), t0);
        history.commit();
        history.undo();
        history.set_state(snap("0"), t0);
        assert!(!history.has_pending());
        assert!(history.can_redo());
    }
}
