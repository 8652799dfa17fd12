use crate::model::SignalMessage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed signaling message: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode(msg: &SignalMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn decode(text: &str) -> Result<SignalMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}
