
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use roomlink_client::{ClientConfig, MeshEvent, MeshHandle, Orchestrator, SignalMessage};

use crate::utils::{MockEngine, MockSignalingOutput};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A running orchestrator wired to mocks.
pub struct TestPeer {
    pub handle: MeshHandle,
    pub events: mpsc::UnboundedReceiver<MeshEvent>,
    pub engine: MockEngine,
    pub signaling: MockSignalingOutput,
    pub signal_rx: mpsc::UnboundedReceiver<SignalMessage>,
}

pub fn create_test_peer() -> TestPeer {
    let engine = MockEngine::new();
    let (signaling, signal_rx) = MockSignalingOutput::new();

    let (handle, events) = Orchestrator::spawn(
        Arc::new(engine.clone()),
        Arc::new(signaling.clone()),
        &ClientConfig::default(),
    );

    TestPeer {
        handle,
        events,
        engine,
        signaling,
        signal_rx,
    }
}

/// Deliver every targeted message `from` has sent so far to `to`, the way
/// the relay would, and wait until `to` has processed them.
pub async fn pump(from: &mut TestPeer, to: &MeshHandle) -> usize {
    let mut delivered = 0;
    while let Ok(msg) = from.signal_rx.try_recv() {
        if msg.target().is_some() {
            to.submit_signal(msg).await.expect("Receiver shut down");
            delivered += 1;
        }
    }
    to.snapshot().await.expect("Receiver shut down");
    delivered
}
