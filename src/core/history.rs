//! Transition history tracking.
//!
//! The machine appends one entry per completed transition (fired, inner or
//! forced). History is bounded: once the capacity is reached the oldest
//! entry is dropped. A capacity of zero disables recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// How a recorded transition came about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    /// Normal transition selected by firing an event
    Fired,
    /// Inner self-transition (no exit/entry)
    Inner,
    /// Forced transition
    Forced,
}

/// Record of a single completed transition.
///
/// # Example
///
/// ```rust
/// use hsm_core::{HistoryEntry, HistoryKind};
/// use chrono::Utc;
///
/// let entry = HistoryEntry {
///     from: "Pending".to_string(),
///     to: "Running".to_string(),
///     event: "Start".to_string(),
///     kind: HistoryKind::Fired,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(entry.to, "Running");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The state being transitioned from
    pub from: String,
    /// The state being transitioned to
    pub to: String,
    /// The event that triggered (or, for forced transitions, accompanied) the transition
    pub event: String,
    pub kind: HistoryKind,
    /// When the transition completed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of completed transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl TransitionHistory {
    /// Create an empty history keeping at most `capacity` entries.
    ///
    /// ```rust
    /// use hsm_core::TransitionHistory;
    ///
    /// let history = TransitionHistory::with_capacity(8);
    /// assert!(history.entries().next().is_none());
    /// assert_eq!(history.capacity(), 8);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Names of the states traversed: the first entry's source, then the
    /// destination of every entry.
    ///
    /// ```rust
    /// use hsm_core::{Event, StateMachine};
    ///
    /// let machine = StateMachine::new("path");
    /// let one = machine.create_initial_state("One").unwrap();
    /// let two = machine.create_state("Two");
    /// let three = machine.create_state("Three");
    /// let next = Event::new("Next");
    ///
    /// one.transition_on(&next).to(&two).unwrap();
    /// two.transition_on(&next).to(&three).unwrap();
    /// next.fire().unwrap();
    /// next.fire().unwrap();
    ///
    /// assert_eq!(machine.history().path(), vec!["One", "Two", "Three"]);
    /// ```
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.entries.front() {
            path.push(first.from.as_str());
        }
        for entry in &self.entries {
            path.push(entry.to.as_str());
        }
        path
    }

    /// Time between the first and last recorded transition.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.entries.front(), self.entries.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }
}
