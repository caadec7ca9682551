//! Baseline text-only strategy.
//!
//! For channels that carry plain text and no verifiable identity:
//! no roster, no cards, no mention entities.

use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::{Activity, ActivityType, OutboundPayload};
use crate::bus::{BotUser, OutgoingMessage, ReceivedEvent, ReplyEnvelope};
use crate::channels::ChannelStrategy;
use crate::directory::UserDirectory;
use crate::error::DispatchError;

pub struct TextStrategy {
    directory: Arc<UserDirectory>,
}

impl TextStrategy {
    pub fn new(directory: Arc<UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ChannelStrategy for TextStrategy {
    async fn to_receivable(
        &self,
        activity: Activity,
    ) -> Result<Option<ReceivedEvent>, DispatchError> {
        let user = self.directory.upsert_user(BotUser {
            id: activity.address.user.id.clone(),
            name: activity.address.user.name.clone(),
            tenant_id: None,
            object_id: None,
        });

        match activity.kind {
            ActivityType::Message | ActivityType::Invoke => match activity.text {
                Some(text) if !text.is_empty() => Ok(Some(ReceivedEvent::TextMessage {
                    user,
                    text,
                    reply_to_id: activity.id,
                })),
                _ => Ok(None),
            },
            ActivityType::ConversationUpdate => Ok(Some(ReceivedEvent::Event { user })),
            ActivityType::Typing | ActivityType::Other => Ok(None),
        }
    }

    fn to_sendable(
        &self,
        envelope: &ReplyEnvelope,
        message: &OutgoingMessage,
    ) -> Vec<OutboundPayload> {
        match message {
            OutgoingMessage::Payload(prebuilt) => vec![(**prebuilt).clone()],
            OutgoingMessage::Text(text) => {
                let mut payload = OutboundPayload::message(envelope.address.clone());
                payload.text = Some(text.trim().to_string());
                vec![payload]
            }
        }
    }

    fn supports_auth(&self) -> bool {
        false
    }
}
