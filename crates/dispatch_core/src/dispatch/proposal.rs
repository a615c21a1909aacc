//! Pending proposals: one-time response slots keyed by a correlation token.
//!
//! The coordinator opens a slot before sending `DRIVER_RIDE_PROPOSAL` and awaits it; the
//! driver's `PROPOSAL_RESPONSE` fills it through [`PendingProposals::respond`]. A slot is
//! consumed exactly once and removed when its waiter finishes, whatever the outcome.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::ProposalError;
use crate::types::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalToken(Uuid);

impl ProposalToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalOutcome {
    Accepted,
    Rejected,
    /// The slot was dropped without an answer, e.g. the driver disconnected.
    Withdrawn,
    TimedOut,
}

struct Slot {
    driver: ParticipantId,
    reply: oneshot::Sender<bool>,
}

#[derive(Default)]
pub struct PendingProposals {
    slots: DashMap<ProposalToken, Slot>,
}

impl PendingProposals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response slot addressed to `driver`.
    pub fn open(&self, driver: ParticipantId) -> PendingProposal<'_> {
        let token = ProposalToken::new();
        let (reply, answer) = oneshot::channel();
        self.slots.insert(token, Slot { driver, reply });
        PendingProposal {
            table: self,
            token,
            answer,
        }
    }

    /// Deliver `responder`'s answer to the proposal identified by `token`.
    pub fn respond(
        &self,
        token: ProposalToken,
        responder: &ParticipantId,
        accepted: bool,
    ) -> Result<(), ProposalError> {
        let Some((_, slot)) = self
            .slots
            .remove_if(&token, |_, slot| slot.driver == *responder)
        else {
            return Err(match self.slots.get(&token) {
                Some(slot) => ProposalError::NotAddressee {
                    token,
                    addressee: slot.driver.clone(),
                    responder: responder.clone(),
                },
                None => ProposalError::UnknownToken(token),
            });
        };
        // The waiter may have timed out between our removal and this send.
        slot.reply
            .send(accepted)
            .map_err(|_| ProposalError::UnknownToken(token))
    }

    /// Drop every slot addressed to `driver`; their waiters see `Withdrawn`.
    pub fn withdraw_for(&self, driver: &ParticipantId) -> usize {
        let tokens: Vec<ProposalToken> = self
            .slots
            .iter()
            .filter(|entry| entry.value().driver == *driver)
            .map(|entry| *entry.key())
            .collect();
        tokens
            .iter()
            .filter(|token| self.slots.remove(token).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Waiter side of an open slot. Dropping it removes the slot.
pub struct PendingProposal<'a> {
    table: &'a PendingProposals,
    token: ProposalToken,
    answer: oneshot::Receiver<bool>,
}

impl PendingProposal<'_> {
    pub fn token(&self) -> ProposalToken {
        self.token
    }

    /// Wait at most `timeout` for the driver's answer.
    pub async fn outcome(mut self, timeout: Duration) -> ProposalOutcome {
        match tokio::time::timeout(timeout, &mut self.answer).await {
            Ok(Ok(true)) => ProposalOutcome::Accepted,
            Ok(Ok(false)) => ProposalOutcome::Rejected,
            Ok(Err(_)) => ProposalOutcome::Withdrawn,
            Err(_) => ProposalOutcome::TimedOut,
        }
    }
}

impl Drop for PendingProposal<'_> {
    fn drop(&mut self) {
        self.table.slots.remove(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn answer_reaches_waiter_and_slot_is_consumed() {
        let table = PendingProposals::new();
        let driver = ParticipantId::from("driver-1");
        let pending = table.open(driver.clone());
        let token = pending.token();

        table.respond(token, &driver, true).expect("respond");
        assert_eq!(pending.outcome(WAIT).await, ProposalOutcome::Accepted);
        assert!(table.is_empty());
        assert_eq!(
            table.respond(token, &driver, true),
            Err(ProposalError::UnknownToken(token))
        );
    }

    #[tokio::test]
    async fn answer_from_another_participant_is_refused() {
        let table = PendingProposals::new();
        let pending = table.open("driver-1".into());
        let token = pending.token();

        let err = table
            .respond(token, &"driver-2".into(), true)
            .expect_err("not addressee");
        assert!(matches!(err, ProposalError::NotAddressee { .. }));

        table.respond(token, &"driver-1".into(), false).expect("respond");
        assert_eq!(pending.outcome(WAIT).await, ProposalOutcome::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_proposal_times_out_and_releases_slot() {
        let table = PendingProposals::new();
        let pending = table.open("driver-1".into());
        let token = pending.token();

        assert_eq!(pending.outcome(WAIT).await, ProposalOutcome::TimedOut);
        assert!(table.is_empty());
        assert!(table.respond(token, &"driver-1".into(), true).is_err());
    }

    #[tokio::test]
    async fn withdrawing_a_driver_wakes_its_waiters() {
        let table = PendingProposals::new();
        let first = table.open("driver-1".into());
        let other = table.open("driver-2".into());

        assert_eq!(table.withdraw_for(&"driver-1".into()), 1);
        assert_eq!(first.outcome(WAIT).await, ProposalOutcome::Withdrawn);
        assert_eq!(table.len(), 1);
        drop(other);
        assert!(table.is_empty());
    }
}
