use crate::error::Result;
use async_trait::async_trait;
use roomlink_core::SignalMessage;

/// Outbound half of the relay connection.
///
/// The mesh hands every message it produces (join, offer, answer,
/// candidate, bye) to this trait; routing to the target peer is the relay's
/// job.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, msg: SignalMessage) -> Result<()>;
}
