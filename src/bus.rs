//! Channel-agnostic types handed to and from the internal message bus.

use async_trait::async_trait;

use crate::activity::{Address, OutboundPayload};
use crate::error::DispatchError;

/// Identity record for a chat user, keyed by the channel's stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotUser {
    pub id: String,
    pub name: Option<String>,
    pub tenant_id: Option<String>,
    /// Stable cross-system identity (directory object id).
    pub object_id: Option<String>,
}

/// One unit delivered to the message bus. Constructed once per
/// activity by a channel strategy; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedEvent {
    /// A user-visible chat message.
    TextMessage {
        user: BotUser,
        text: String,
        reply_to_id: Option<String>,
    },
    /// A non-message event still worth notifying the bus about.
    Event { user: BotUser },
}

impl ReceivedEvent {
    pub fn user(&self) -> &BotUser {
        match self {
            ReceivedEvent::TextMessage { user, .. } => user,
            ReceivedEvent::Event { user } => user,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ReceivedEvent::TextMessage { text, .. } => Some(text),
            ReceivedEvent::Event { .. } => None,
        }
    }
}

/// Reply context for the outbound path: which channel the response
/// goes back through, where, and the inbound text that triggered it
/// (card synthesis matches on it).
#[derive(Debug, Clone)]
pub struct ReplyEnvelope {
    /// Channel name, resolves the strategy for the reply.
    pub source: String,
    pub address: Address,
    pub inbound_text: Option<String>,
}

/// A response message handed to the send path: either plain text or a
/// payload the bus already built.
#[derive(Debug, Clone)]
pub enum OutgoingMessage {
    Text(String),
    Payload(Box<OutboundPayload>),
}

impl From<&str> for OutgoingMessage {
    fn from(s: &str) -> Self {
        OutgoingMessage::Text(s.to_string())
    }
}

impl From<String> for OutgoingMessage {
    fn from(s: String) -> Self {
        OutgoingMessage::Text(s)
    }
}

impl From<OutboundPayload> for OutgoingMessage {
    fn from(p: OutboundPayload) -> Self {
        OutgoingMessage::Payload(Box::new(p))
    }
}

/// The internal message-bus consumer. Translated events are owned by
/// the bus once `deliver` returns.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn deliver(&self, event: ReceivedEvent) -> Result<(), DispatchError>;
}
