//! The action queue.
//!
//! An ordered multiset of pending actions plus a completed history. The
//! total order is (−priority, enqueue sequence): higher priority first,
//! earlier enqueue first within a tier. The pending list is kept in enqueue
//! order and the batch step extracts the whole top-priority tier, so the
//! ordering never depends on a sort's stability.
//!
//! The drain itself lives on [`Game`](crate::game::Game) (it needs event
//! dispatch), but its data contract is here: sub-queue histories are
//! appended into the parent's history before the batch's own entries, so
//! the main queue's history ends up as the full chronology of the game.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::action::{Action, ActionView};

/// How deep pre/post sub-queues may nest before the engine gives up.
pub const MAX_DEPTH: u32 = 20;

/// How an action left the queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    /// The action executed.
    Ran,
    /// The action was cancelled before running; no post event was emitted.
    Cancelled,
    /// Execution failed; no post event was emitted.
    Failed { message: String },
}

/// One entry of the completed history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The action as it was when it left the queue.
    pub action: ActionView,

    /// Whether it ran.
    pub status: ActionStatus,
}

impl HistoryEntry {
    /// Did this action execute?
    #[must_use]
    pub fn ran(&self) -> bool {
        matches!(self.status, ActionStatus::Ran)
    }
}

/// Priority-ordered queue of pending actions plus its history.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    pending: Vec<Action>,
    history: Vector<HistoryEntry>,
}

impl ActionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Is the queue empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append an action. Ids are assigned by the game in monotonically
    /// increasing order, so `pending` stays sorted by enqueue sequence.
    pub fn enqueue(&mut self, action: Action) {
        self.pending.push(action);
    }

    /// Remove and return every pending action tied for the highest
    /// priority, in enqueue order. Empty queue yields an empty batch.
    pub fn pop_batch(&mut self) -> Vec<Action> {
        let Some(top) = self.pending.iter().map(|a| a.priority).max() else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        let mut rest = Vec::with_capacity(self.pending.len());
        for action in self.pending.drain(..) {
            if action.priority == top {
                batch.push(action);
            } else {
                rest.push(action);
            }
        }
        self.pending = rest;
        batch
    }

    /// Peek at the pending actions, in enqueue order.
    #[must_use]
    pub fn pending(&self) -> &[Action] {
        &self.pending
    }

    /// The completed history, in execution order.
    #[must_use]
    pub fn history(&self) -> &Vector<HistoryEntry> {
        &self.history
    }

    /// Record one completed action.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
    }

    /// Append a drained sub-queue's history.
    pub fn absorb_history(&mut self, sub: Vector<HistoryEntry>) {
        self.history.append(sub);
    }

    /// Take the history out of a finished sub-queue.
    #[must_use]
    pub fn into_history(self) -> Vector<HistoryEntry> {
        self.history
    }
}
