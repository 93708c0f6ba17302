//! The vote tally.
//!
//! Tracks one standing vote per voter by observing post events of `Vote`
//! actions, and lynches the leader when its collection phase ends.
//!
//! ## Leader policy
//!
//! Plurality wins. Ties between actors go to the lowest actor id. A tally
//! with no votes has no leader. The no-lynch bucket (`VoteTarget::AgainstAll`)
//! wins only when it strictly exceeds every actor's count; an actor tied
//! with no-lynch is still lynched.

use serde::{Deserialize, Serialize};

use crate::actions::action::VoteTarget;
use crate::core::entity::ObjectId;

/// Vote bookkeeping for one phase.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tally {
    /// Base name of the phase this tally collects during (e.g. `"day"`).
    pub phase: String,

    /// Standing votes, one per voter, in first-vote order.
    votes: Vec<(ObjectId, VoteTarget)>,
}

impl Tally {
    /// Create a tally collecting during phases with the given base name.
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            votes: Vec::new(),
        }
    }

    /// Record a vote, replacing the voter's standing vote.
    pub fn record(&mut self, voter: ObjectId, target: VoteTarget) {
        if matches!(target, VoteTarget::Unvote) {
            self.votes.retain(|(v, _)| *v != voter);
            return;
        }
        if let Some(entry) = self.votes.iter_mut().find(|(v, _)| *v == voter) {
            entry.1 = target;
        } else {
            self.votes.push((voter, target));
        }
    }

    /// Forget all votes (phase boundary).
    pub fn reset(&mut self) {
        self.votes.clear();
    }

    /// Current standing votes.
    #[must_use]
    pub fn votes(&self) -> &[(ObjectId, VoteTarget)] {
        &self.votes
    }

    /// The current leader under the documented policy.
    #[must_use]
    pub fn leader(&self) -> Option<ObjectId> {
        let mut counts: Vec<(ObjectId, u32)> = Vec::new();
        let mut against_all = 0u32;

        for (_, target) in &self.votes {
            match target {
                VoteTarget::Actor(id) => {
                    if let Some(entry) = counts.iter_mut().find(|(a, _)| a == id) {
                        entry.1 += 1;
                    } else {
                        counts.push((*id, 1));
                    }
                }
                VoteTarget::AgainstAll => against_all += 1,
                VoteTarget::Unvote => {}
            }
        }

        let best = counts.iter().map(|&(_, n)| n).max()?;
        if against_all > best {
            return None;
        }
        counts
            .iter()
            .filter(|&&(_, n)| n == best)
            .map(|&(id, _)| id)
            .min()
    }
}
