use std::sync::{Arc, Mutex};
use std::time::Duration;

use dispatch_core::config::{DispatchConfig, LocationConfig};
use dispatch_core::dispatch::DispatchOutcome;
use dispatch_core::events::{InboundEvent, OutboundEvent, PositionReport};
use dispatch_core::geo::Coordinate;
use dispatch_core::location::{DriverLocationStore, InMemoryLocationStore};
use dispatch_core::registry::MpscChannel;
use dispatch_core::service::Handled;
use dispatch_core::test_helpers::{drain, offset_north, search_request, ORIGIN};
use dispatch_core::{DispatchService, ParticipantId};
use tokio::sync::mpsc;

pub const PROPOSAL_TIMEOUT: Duration = Duration::from_secs(15);

/// How a scripted driver answers proposals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Accept,
    Reject,
    /// Never answer.
    Ignore,
}

/// Every proposal any scripted driver received, in arrival order.
pub type ProposalLog = Arc<Mutex<Vec<ParticipantId>>>;

/// A connected driver whose client task answers proposals per its script.
pub struct ScriptedDriver {
    pub id: ParticipantId,
    events: Arc<Mutex<Vec<OutboundEvent>>>,
}

impl ScriptedDriver {
    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn proposals(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, OutboundEvent::DriverRideProposal { .. }))
            .count()
    }
}

/// A connected rider that collects what it is sent.
pub struct TestRider {
    pub id: ParticipantId,
    rx: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl TestRider {
    pub fn events(&mut self) -> Vec<OutboundEvent> {
        drain(&mut self.rx)
    }
}

pub struct Fleet {
    pub service: Arc<DispatchService>,
    pub store: Arc<InMemoryLocationStore>,
    pub log: ProposalLog,
}

impl Fleet {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default().with_proposal_timeout(PROPOSAL_TIMEOUT))
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        let store =
            Arc::new(InMemoryLocationStore::new(&LocationConfig::default()).expect("store"));
        let service =
            DispatchService::new(Arc::clone(&store) as Arc<dyn DriverLocationStore>, config);
        Self {
            service,
            store,
            log: Arc::default(),
        }
    }

    /// Connect a driver `meters_north` of [`ORIGIN`] that answers with `answer`.
    pub fn driver(&self, id: &str, meters_north: f64, answer: Answer) -> ScriptedDriver {
        let id = ParticipantId::from(id);
        let (channel, mut rx) = MpscChannel::pair();
        self.service.connect(id.clone(), Arc::new(channel));
        let report = PositionReport {
            socket_id: Some(id.clone()),
            coordinate: offset_north(ORIGIN, meters_north),
        };
        self.service.handle(&id, InboundEvent::UpdateDriverPos(report));

        let events: Arc<Mutex<Vec<OutboundEvent>>> = Arc::default();
        let service = Arc::clone(&self.service);
        let log = Arc::clone(&self.log);
        let task_events = Arc::clone(&events);
        let task_id = id.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                task_events.lock().expect("events lock").push(event.clone());
                let OutboundEvent::DriverRideProposal { token, .. } = event else {
                    continue;
                };
                log.lock().expect("log lock").push(task_id.clone());
                let accepted = match answer {
                    Answer::Accept => true,
                    Answer::Reject => false,
                    Answer::Ignore => continue,
                };
                service.handle(&task_id, InboundEvent::ProposalResponse { token, accepted });
            }
        });

        ScriptedDriver { id, events }
    }

    /// A driver with a stored position but no live channel.
    pub fn offline_driver(&self, id: &str, meters_north: f64) -> ParticipantId {
        let id = ParticipantId::from(id);
        self.store
            .upsert(&id, offset_north(ORIGIN, meters_north))
            .expect("upsert");
        id
    }

    pub fn rider(&self, id: &str) -> TestRider {
        let id = ParticipantId::from(id);
        let (channel, rx) = MpscChannel::pair();
        self.service.connect(id.clone(), Arc::new(channel));
        let mut rider = TestRider { id, rx };
        // Discard the CONNECTED greeting.
        rider.events();
        rider
    }

    /// Start a search from `rider` at `pickup` and wait for its outcome.
    pub async fn search_from(&self, rider: &ParticipantId, pickup: Coordinate) -> DispatchOutcome {
        match self
            .service
            .handle(rider, InboundEvent::SearchDriver(search_request(pickup)))
        {
            Handled::Search(task) => task.await.expect("search task"),
            other => panic!("search was not started: {other:?}"),
        }
    }

    pub async fn search(&self, rider: &ParticipantId) -> DispatchOutcome {
        self.search_from(rider, ORIGIN).await
    }

    pub fn proposal_order(&self) -> Vec<String> {
        self.log
            .lock()
            .expect("log lock")
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// Let spawned client tasks drain what has been sent to them.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
