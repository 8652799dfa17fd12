use async_trait::async_trait;
use roomlink_client::{
    EngineError, IceCandidate, MediaEngine, MediaSession, PeerId, SessionDescription,
    SessionEvent, SignalingState,
};
use roomlink_core::SdpKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Failures a test can arm on the engine. Each flag applies to every
/// session created afterwards.
#[derive(Debug, Default, Clone)]
pub struct FailurePlan {
    pub create_offer: bool,
    pub create_answer: bool,
    pub rollback: bool,
}

/// Everything a session did, readable after the fact.
#[derive(Debug)]
pub struct SessionRecord {
    pub state: SignalingState,
    pub has_remote: bool,
    pub applied_candidates: Vec<String>,
    pub remote_descriptions: Vec<SessionDescription>,
    pub rollbacks: usize,
    pub closed: bool,
    events: mpsc::Sender<SessionEvent>,
}

#[derive(Default)]
struct EngineState {
    sessions: HashMap<PeerId, Arc<Mutex<SessionRecord>>>,
    created: usize,
    failures: FailurePlan,
}

/// In-memory engine following JSEP signaling-state rules closely enough to
/// catch out-of-order calls.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, failures: FailurePlan) {
        lock(&self.state).failures = failures;
    }

    pub fn sessions_created(&self) -> usize {
        lock(&self.state).created
    }

    fn record(&self, peer: &PeerId) -> Option<Arc<Mutex<SessionRecord>>> {
        lock(&self.state).sessions.get(peer).cloned()
    }

    pub fn state_of(&self, peer: &PeerId) -> Option<SignalingState> {
        self.record(peer).map(|r| lock(&r).state)
    }

    pub fn applied_candidates(&self, peer: &PeerId) -> Vec<String> {
        self.record(peer)
            .map(|r| lock(&r).applied_candidates.clone())
            .unwrap_or_default()
    }

    pub fn remote_descriptions(&self, peer: &PeerId) -> Vec<SessionDescription> {
        self.record(peer)
            .map(|r| lock(&r).remote_descriptions.clone())
            .unwrap_or_default()
    }

    pub fn rollbacks(&self, peer: &PeerId) -> usize {
        self.record(peer).map(|r| lock(&r).rollbacks).unwrap_or(0)
    }

    pub fn is_closed(&self, peer: &PeerId) -> bool {
        self.record(peer).map(|r| lock(&r).closed).unwrap_or(false)
    }

    /// Raise a session event as if the media stack produced it.
    pub async fn raise(&self, peer: &PeerId, event: SessionEvent) {
        let events = self.record(peer).map(|r| lock(&r).events.clone());
        if let Some(events) = events {
            let _ = events.send(event).await;
        }
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn create_session(
        &self,
        peer: &PeerId,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn MediaSession>, EngineError> {
        let mut state = lock(&self.state);
        state.created += 1;

        let record = Arc::new(Mutex::new(SessionRecord {
            state: SignalingState::Stable,
            has_remote: false,
            applied_candidates: Vec::new(),
            remote_descriptions: Vec::new(),
            rollbacks: 0,
            closed: false,
            events,
        }));
        state.sessions.insert(peer.clone(), record.clone());

        Ok(Box::new(MockSession {
            peer: peer.clone(),
            record,
            failures: state.failures.clone(),
            counter: Mutex::new(0),
        }))
    }
}

pub struct MockSession {
    peer: PeerId,
    record: Arc<Mutex<SessionRecord>>,
    failures: FailurePlan,
    counter: Mutex<u32>,
}

impl MockSession {
    fn next_sdp(&self, kind: &str) -> String {
        let mut n = lock(&self.counter);
        *n += 1;
        format!("v=0\r\ns=mock-{}-{}-{}\r\n", kind, self.peer, n)
    }

    fn invalid(op: &'static str, state: SignalingState) -> EngineError {
        EngineError::InvalidState { op, state }
    }
}

#[async_trait]
impl MediaSession for MockSession {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        if self.failures.create_offer {
            return Err(EngineError::Other(anyhow::anyhow!("offer generation failed")));
        }
        let state = lock(&self.record).state;
        if state != SignalingState::Stable {
            return Err(Self::invalid("create_offer", state));
        }
        Ok(SessionDescription::offer(self.next_sdp("offer")))
    }

    async fn create_answer(&self) -> Result<SessionDescription, EngineError> {
        if self.failures.create_answer {
            return Err(EngineError::Other(anyhow::anyhow!("answer generation failed")));
        }
        let state = lock(&self.record).state;
        if state != SignalingState::HaveRemoteOffer {
            return Err(Self::invalid("create_answer", state));
        }
        Ok(SessionDescription::answer(self.next_sdp("answer")))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        let mut record = lock(&self.record);
        record.state = match (desc.kind, record.state) {
            (SdpKind::Offer, SignalingState::Stable) => SignalingState::HaveLocalOffer,
            (SdpKind::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
            (_, state) => return Err(Self::invalid("set_local_description", state)),
        };
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        let mut record = lock(&self.record);
        record.state = match (desc.kind, record.state) {
            (SdpKind::Offer, SignalingState::Stable) => SignalingState::HaveRemoteOffer,
            (SdpKind::Answer, SignalingState::HaveLocalOffer) => SignalingState::Stable,
            (_, state) => return Err(Self::invalid("set_remote_description", state)),
        };
        record.has_remote = true;
        record.remote_descriptions.push(desc);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        if self.failures.rollback {
            return Err(EngineError::Other(anyhow::anyhow!("rollback failed")));
        }
        let mut record = lock(&self.record);
        match record.state {
            SignalingState::HaveLocalOffer | SignalingState::HaveRemoteOffer => {
                record.state = SignalingState::Stable;
                record.rollbacks += 1;
                Ok(())
            }
            state => Err(Self::invalid("rollback", state)),
        }
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError> {
        let mut record = lock(&self.record);
        if !record.has_remote {
            return Err(Self::invalid("add_ice_candidate", record.state));
        }
        if candidate.candidate.contains("bad") {
            return Err(EngineError::InvalidDescription(candidate.candidate));
        }
        record.applied_candidates.push(candidate.candidate);
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        lock(&self.record).state
    }

    async fn close(&self) -> Result<(), EngineError> {
        let mut record = lock(&self.record);
        record.state = SignalingState::Closed;
        record.closed = true;
        Ok(())
    }
}
