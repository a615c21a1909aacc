//! Dispatch coordinator: the sequential-offer state machine.
//!
//! A search walks `SEARCHING → PROPOSING(driver) → {MATCHED | PROPOSING(next) | EXHAUSTED}`.
//! Candidates come nearest-first from the location store and are offered one at a time;
//! the next candidate is contacted only after the current one accepted, rejected, timed
//! out, or turned out unreachable. Every failure inside an attempt becomes a state
//! transition; the only user-visible failure is `DRIVER_NOT_FOUND`.

mod attempt;
mod proposal;
mod rides;

pub use attempt::{AttemptId, AttemptState, DispatchAttempt};
pub use proposal::{PendingProposal, PendingProposals, ProposalOutcome, ProposalToken};
pub use rides::ActiveRides;

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::DispatchConfig;
use crate::error::{ProposalError, StoreError};
use crate::events::{OutboundEvent, RiderPayload, SearchRequest};
use crate::geo::Coordinate;
use crate::location::DriverLocationStore;
use crate::registry::ConnectionRegistry;
use crate::types::{NearbyDriver, ParticipantId};

/// A rider's request for one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RideRequest {
    pub rider: ParticipantId,
    pub request: SearchRequest,
}

impl RideRequest {
    pub fn new(rider: ParticipantId, request: SearchRequest) -> Self {
        Self { rider, request }
    }

    pub fn pickup(&self) -> Coordinate {
        self.request.ride_start.coords
    }

    fn payload(&self) -> RiderPayload {
        RiderPayload {
            socket_id: self.rider.clone(),
            request: self.request.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The nearby query failed; reported to the rider like an empty result.
    StoreUnavailable,
    NoCandidates,
    /// Every candidate rejected, timed out, or was unreachable.
    AllDeclined,
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Matched {
        attempt_id: AttemptId,
        driver: NearbyDriver,
        proposals: usize,
        /// False when the rider was gone by the time the driver accepted.
        rider_notified: bool,
    },
    Exhausted {
        attempt_id: AttemptId,
        reason: ExhaustReason,
        proposals: usize,
        rider_notified: bool,
    },
}

impl DispatchOutcome {
    pub fn attempt_id(&self) -> AttemptId {
        match self {
            Self::Matched { attempt_id, .. } | Self::Exhausted { attempt_id, .. } => *attempt_id,
        }
    }

    pub fn proposals(&self) -> usize {
        match self {
            Self::Matched { proposals, .. } | Self::Exhausted { proposals, .. } => *proposals,
        }
    }

    pub fn matched_driver(&self) -> Option<&ParticipantId> {
        match self {
            Self::Matched { driver, .. } => Some(&driver.driver),
            Self::Exhausted { .. } => None,
        }
    }
}

pub struct Coordinator {
    store: Arc<dyn DriverLocationStore>,
    registry: Arc<ConnectionRegistry>,
    proposals: PendingProposals,
    rides: ActiveRides,
    config: DispatchConfig,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn DriverLocationStore>,
        registry: Arc<ConnectionRegistry>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            registry,
            proposals: PendingProposals::new(),
            rides: ActiveRides::new(),
            config,
        }
    }

    /// Run one dispatch attempt to completion.
    ///
    /// Suspends only while waiting for a candidate's answer; concurrent searches, position
    /// updates, and disconnects proceed meanwhile.
    pub async fn search(&self, request: RideRequest) -> DispatchOutcome {
        let attempt = DispatchAttempt::new(request.rider.clone());
        let span = info_span!("attempt", attempt_id = %attempt.id(), rider = %request.rider);
        self.run(attempt, request).instrument(span).await
    }

    async fn run(&self, mut attempt: DispatchAttempt, request: RideRequest) -> DispatchOutcome {
        let candidates = match self
            .store
            .find_nearby(request.pickup(), self.config.search_radius_m)
        {
            Ok(candidates) => candidates,
            Err(error @ StoreError::InvalidCoordinate { .. }) => {
                info!(%error, "pickup is not a valid coordinate");
                return self.exhaust(&mut attempt, ExhaustReason::NoCandidates);
            }
            Err(error) => {
                warn!(%error, "nearby-driver query failed; no candidates");
                return self.exhaust(&mut attempt, ExhaustReason::StoreUnavailable);
            }
        };
        let candidates: Vec<NearbyDriver> = if self.config.exclude_busy_drivers {
            candidates
                .into_iter()
                .filter(|candidate| !self.rides.is_busy(&candidate.driver))
                .collect()
        } else {
            candidates
        };
        if candidates.is_empty() {
            return self.exhaust(&mut attempt, ExhaustReason::NoCandidates);
        }
        debug!(candidates = candidates.len(), "candidates loaded");
        attempt.load_candidates(candidates);

        let payload = request.payload();
        while let Some(candidate) = attempt.advance() {
            let driver = &candidate.driver;
            if !self.registry.is_reachable(driver) {
                debug!(%driver, "candidate unreachable; skipping");
                continue;
            }

            let pending = self.proposals.open(driver.clone());
            let token = pending.token();
            let proposal = OutboundEvent::DriverRideProposal {
                token,
                rider: payload.clone(),
            };
            if !self.registry.send(driver, proposal) {
                debug!(%driver, "candidate dropped before proposal; skipping");
                continue;
            }
            attempt.record_proposal();
            debug!(%driver, %token, distance_m = candidate.distance_m, "proposal sent");

            match pending.outcome(self.config.proposal_timeout()).await {
                ProposalOutcome::Accepted => {
                    if let Some(outcome) = self.accept(&mut attempt, &candidate, token) {
                        return outcome;
                    }
                }
                ProposalOutcome::Rejected => debug!(%driver, "proposal rejected"),
                ProposalOutcome::Withdrawn => debug!(%driver, "proposal withdrawn"),
                ProposalOutcome::TimedOut => {
                    info!(%driver, %token, "proposal timed out");
                    self.registry
                        .send(driver, OutboundEvent::ProposalExpired { token });
                }
            }
        }

        self.exhaust(&mut attempt, ExhaustReason::AllDeclined)
    }

    /// Turn an acceptance into a match. `None` means the acceptance counts as a rejection;
    /// the driver is then told the offer behind `token` expired.
    fn accept(
        &self,
        attempt: &mut DispatchAttempt,
        candidate: &NearbyDriver,
        token: ProposalToken,
    ) -> Option<DispatchOutcome> {
        let driver = &candidate.driver;
        let rider = attempt.rider().clone();

        let rider_notified = if self.registry.is_reachable(&rider) {
            if self.config.exclude_busy_drivers && !self.rides.claim(driver, &rider) {
                info!(%driver, %token, "driver accepted but is already on a ride; moving on");
                self.registry
                    .send(driver, OutboundEvent::ProposalExpired { token });
                return None;
            }
            let notified = self
                .registry
                .send(&rider, OutboundEvent::DriverFound(candidate.clone()));
            if !notified && self.config.exclude_busy_drivers {
                self.rides.release(driver);
            }
            notified
        } else {
            false
        };

        if !rider_notified {
            info!(%driver, "driver accepted after rider left");
            self.registry
                .send(driver, OutboundEvent::PeerUnreachable { peer: rider });
        }

        attempt.finish_matched(driver);
        info!(%driver, proposals = attempt.proposals_sent(), rider_notified, "matched");
        Some(DispatchOutcome::Matched {
            attempt_id: attempt.id(),
            driver: candidate.clone(),
            proposals: attempt.proposals_sent(),
            rider_notified,
        })
    }

    fn exhaust(&self, attempt: &mut DispatchAttempt, reason: ExhaustReason) -> DispatchOutcome {
        attempt.exhaust();
        let rider_notified = self
            .registry
            .send(attempt.rider(), OutboundEvent::DriverNotFound);
        info!(?reason, proposals = attempt.proposals_sent(), rider_notified, "driver not found");
        DispatchOutcome::Exhausted {
            attempt_id: attempt.id(),
            reason,
            proposals: attempt.proposals_sent(),
            rider_notified,
        }
    }

    /// Route a driver's answer to the attempt waiting on it.
    pub fn respond(
        &self,
        token: ProposalToken,
        responder: &ParticipantId,
        accepted: bool,
    ) -> Result<(), ProposalError> {
        self.proposals.respond(token, responder, accepted)
    }

    /// Withdraw every open proposal to `driver`; the waiting attempts move on at once.
    pub fn withdraw_proposals(&self, driver: &ParticipantId) -> usize {
        self.proposals.withdraw_for(driver)
    }

    /// Return `driver` to the candidate pool. Returns the rider it was serving, if any.
    pub fn release_driver(&self, driver: &ParticipantId) -> Option<ParticipantId> {
        self.rides.release(driver)
    }

    /// End the ride between `a` and `b`, whichever of them is the driver. Returns the
    /// freed driver.
    pub fn finish_ride(&self, a: &ParticipantId, b: &ParticipantId) -> Option<ParticipantId> {
        if self.rides.release_ride(a, b) {
            Some(a.clone())
        } else if self.rides.release_ride(b, a) {
            Some(b.clone())
        } else {
            None
        }
    }

    pub fn is_busy(&self, driver: &ParticipantId) -> bool {
        self.rides.is_busy(driver)
    }

    pub fn pending_proposals(&self) -> usize {
        self.proposals.len()
    }
}
