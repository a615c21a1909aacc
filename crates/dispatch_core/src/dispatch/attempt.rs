use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{NearbyDriver, ParticipantId};

/// Identity of one run of the sequential-offer algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Searching,
    Proposing(ParticipantId),
    Matched(ParticipantId),
    Exhausted,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched(_) | Self::Exhausted)
    }
}

/// One dispatch attempt: the nearest-first candidate queue and where the attempt stands.
///
/// Candidates are consumed from the head and never revisited; an identity the store
/// returns twice is only considered once. The attempt ends exactly once.
#[derive(Debug)]
pub struct DispatchAttempt {
    id: AttemptId,
    rider: ParticipantId,
    candidates: VecDeque<NearbyDriver>,
    considered: HashSet<ParticipantId>,
    proposals_sent: usize,
    state: AttemptState,
}

impl DispatchAttempt {
    pub fn new(rider: ParticipantId) -> Self {
        Self {
            id: AttemptId::new(),
            rider,
            candidates: VecDeque::new(),
            considered: HashSet::new(),
            proposals_sent: 0,
            state: AttemptState::Searching,
        }
    }

    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn rider(&self) -> &ParticipantId {
        &self.rider
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn proposals_sent(&self) -> usize {
        self.proposals_sent
    }

    pub fn load_candidates(&mut self, candidates: Vec<NearbyDriver>) {
        debug_assert_eq!(self.state, AttemptState::Searching);
        self.candidates = candidates.into();
    }

    /// Move to the next unseen candidate, entering `Proposing`. `None` once the queue is
    /// empty or the attempt has ended.
    pub fn advance(&mut self) -> Option<NearbyDriver> {
        if self.state.is_terminal() {
            return None;
        }
        while let Some(candidate) = self.candidates.pop_front() {
            if self.considered.insert(candidate.driver.clone()) {
                self.state = AttemptState::Proposing(candidate.driver.clone());
                return Some(candidate);
            }
        }
        None
    }

    pub fn record_proposal(&mut self) {
        self.proposals_sent += 1;
    }

    /// `Proposing(driver)` → `Matched(driver)`. Returns false if the attempt is not
    /// currently proposing to `driver`.
    pub fn finish_matched(&mut self, driver: &ParticipantId) -> bool {
        match &self.state {
            AttemptState::Proposing(current) if current == driver => {
                self.state = AttemptState::Matched(driver.clone());
                true
            }
            _ => false,
        }
    }

    /// Any non-terminal state → `Exhausted`. Returns false if already terminal.
    pub fn exhaust(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.candidates.clear();
        self.state = AttemptState::Exhausted;
        true
    }
}
