use crate::model::description::SessionDescription;
use crate::model::ice::IceCandidate;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Messages exchanged with the relay, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    /// Identity assignment, sent by the relay once per connection.
    Init { id: PeerId },

    /// Outbound: request to enter `room`. Inbound: `id` entered the room.
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<PeerId>,
    },

    /// Alternate membership notification carrying only the newcomer.
    NewPeer { id: PeerId },

    Offer {
        offer: SessionDescription,
        target: PeerId,
        sender: PeerId,
    },

    Answer {
        answer: SessionDescription,
        target: PeerId,
        sender: PeerId,
    },

    Candidate {
        candidate: IceCandidate,
        target: PeerId,
        sender: PeerId,
    },

    Bye {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<PeerId>,
    },

    /// Any kind this version does not know about.
    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Init { .. } => "init",
            SignalMessage::Join { .. } => "join",
            SignalMessage::NewPeer { .. } => "new-peer",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
            SignalMessage::Bye { .. } => "bye",
            SignalMessage::Unknown => "unknown",
        }
    }

    pub fn target(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { target, .. }
            | SignalMessage::Answer { target, .. }
            | SignalMessage::Candidate { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn sender(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { sender, .. }
            | SignalMessage::Answer { sender, .. }
            | SignalMessage::Candidate { sender, .. } => Some(sender),
            SignalMessage::Bye { sender } => sender.as_ref(),
            _ => None,
        }
    }

    /// Overwrite the sender field, if the kind carries one.
    pub fn stamp_sender(&mut self, id: &PeerId) {
        match self {
            SignalMessage::Offer { sender, .. }
            | SignalMessage::Answer { sender, .. }
            | SignalMessage::Candidate { sender, .. } => *sender = id.clone(),
            SignalMessage::Bye { sender } => *sender = Some(id.clone()),
            _ => {}
        }
    }
}
