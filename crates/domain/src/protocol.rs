use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{events::LiveEvent, models::Comment};

pub const NEW_COMMENT: &str = "new_comment";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("live message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("'{0}' message carries no payload")]
    MissingPayload(String),
    #[error("'{kind}' payload is not a comment: {source}")]
    BadPayload {
        kind: String,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decodes one text frame of the form `{"type": ..., "data": ...}`.
pub fn parse_live_message(raw: &str) -> Result<LiveEvent, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.kind != NEW_COMMENT {
        return Ok(LiveEvent::Other(envelope.kind));
    }

    if envelope.data.is_null() {
        return Err(ProtocolError::MissingPayload(envelope.kind));
    }

    let comment = serde_json::from_value::<Comment>(envelope.data).map_err(|source| {
        ProtocolError::BadPayload {
            kind: envelope.kind,
            source,
        }
    })?;
    Ok(LiveEvent::NewComment(comment))
}
