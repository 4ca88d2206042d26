//! JSON wire contract of the realtime endpoint.
//!
//! Every frame is a JSON object with an `event` discriminator.
//!
//! | direction | event         | payload                         |
//! |-----------|---------------|---------------------------------|
//! | out       | `connect`     | `timestamp`                     |
//! | out       | `message`     | `text`, `memberData`            |
//! | out       | `getMessages` | -                               |
//! | in        | `info`        | `totalClients`                  |
//! | in        | `getMessages` | `list` of messages              |
//! | in        | `message`     | one message                     |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sender identity summary attached to chat messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberData {
    #[serde(alias = "_id")]
    pub id: String,
    pub nickname: String,
    #[serde(rename = "avatarPath", default)]
    pub avatar_path: Option<String>,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
}

/// One chat message as carried by `message` and `getMessages` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(rename = "memberData", default, skip_serializing_if = "Option::is_none")]
    pub member_data: Option<MemberData>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Handshake sent right after the transport opens
    Connect { timestamp: String },
    /// Chat send
    Message {
        text: String,
        #[serde(rename = "memberData")]
        member_data: MemberData,
    },
    /// History request
    GetMessages,
}

/// Frames sent by the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InboundEvent {
    /// Presence update
    Info {
        #[serde(rename = "totalClients")]
        total_clients: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(rename = "memberData", default, skip_serializing_if = "Option::is_none")]
        member_data: Option<MemberData>,
    },
    /// History snapshot, oldest first
    GetMessages {
        #[serde(default)]
        list: Vec<ChatMessage>,
    },
    /// A single new message
    Message(ChatMessage),
}

impl InboundEvent {
    /// Discriminator string as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info { .. } => "info",
            Self::GetMessages { .. } => "getMessages",
            Self::Message(_) => "message",
        }
    }
}

impl OutboundEvent {
    /// Discriminator string as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Message { .. } => "message",
            Self::GetMessages => "getMessages",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame has no string 'event' field")]
    MissingDiscriminator,

    #[error("unknown event '{0}'")]
    UnknownEvent(String),
}

const INBOUND_EVENTS: [&str; 3] = ["info", "getMessages", "message"];
const OUTBOUND_EVENTS: [&str; 3] = ["connect", "message", "getMessages"];

/// Parse an endpoint frame.
///
/// Unknown discriminators are reported as [`ProtocolError::UnknownEvent`] so the
/// caller can log and ignore them separately from malformed input.
pub fn parse_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    parse_tagged(text, &INBOUND_EVENTS)
}

/// Parse a client frame (used by the endpoint).
pub fn parse_outbound(text: &str) -> Result<OutboundEvent, ProtocolError> {
    parse_tagged(text, &OUTBOUND_EVENTS)
}

fn parse_tagged<T>(text: &str, known: &[&str]) -> Result<T, ProtocolError>
where
    T: serde::de::DeserializeOwned,
{
    let value: serde_json::Value = serde_json::from_str(text)?;
    let event = value
        .get("event")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingDiscriminator)?;
    if !known.contains(&event) {
        return Err(ProtocolError::UnknownEvent(event.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}
