//! Teams channel strategy.
//!
//! Inbound translation needs the conversation roster, so this variant
//! suspends on one connector round trip before it can finish. The
//! trailing-newline trim and the `<`-escape rule are rendering quirks
//! of this channel and deliberately live here, not in the core.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::activity::{Activity, ActivityType, OutboundPayload};
use crate::bus::{BotUser, OutgoingMessage, ReceivedEvent, ReplyEnvelope};
use crate::cards::{CardSynthesizer, TRIGGER_WORD};
use crate::channels::ChannelStrategy;
use crate::connector::Connector;
use crate::directory::UserDirectory;
use crate::error::DispatchError;
use crate::mentions;

/// Line-break markup the channel renders.
const LINE_BREAK: &str = "<br/>";

pub struct TeamsStrategy {
    bot_name: String,
    tenant_allowlist: Vec<String>,
    directory: Arc<UserDirectory>,
    connector: Arc<dyn Connector>,
    synthesizer: CardSynthesizer,
}

impl TeamsStrategy {
    pub fn new(
        bot_name: String,
        tenant_allowlist: Vec<String>,
        directory: Arc<UserDirectory>,
        connector: Arc<dyn Connector>,
        synthesizer: CardSynthesizer,
    ) -> Self {
        Self {
            bot_name,
            tenant_allowlist,
            directory,
            connector,
            synthesizer,
        }
    }

    fn tenant_allowed(&self, activity: &Activity) -> bool {
        if self.tenant_allowlist.is_empty() {
            return true;
        }
        activity
            .tenant_id()
            .is_some_and(|t| self.tenant_allowlist.iter().any(|allowed| allowed == t))
    }

    fn upsert_sender(&self, activity: &Activity) -> BotUser {
        self.directory.upsert_user(BotUser {
            id: activity.address.user.id.clone(),
            name: activity.address.user.name.clone(),
            tenant_id: activity.tenant_id().map(str::to_string),
            object_id: activity.address.user.aad_object_id.clone(),
        })
    }

    /// Reassemble the command text of a card submission.
    ///
    /// Fragments are keyed `"<prefix> - query{i}"` (literal command
    /// parts) and `"<prefix> - input{i}"` (form inputs), concatenated
    /// in index order until neither key exists. The authored trigger
    /// word is rewritten to the configured invocation name.
    fn reassemble_submission(&self, value: &serde_json::Value) -> Option<String> {
        let prefix = value.get("queryPrefix").and_then(|p| p.as_str())?;
        let mut text = String::new();
        for i in 0.. {
            let query = value
                .get(format!("{prefix} - query{i}"))
                .and_then(|v| v.as_str());
            let input = value
                .get(format!("{prefix} - input{i}"))
                .and_then(|v| v.as_str());
            if query.is_none() && input.is_none() {
                break;
            }
            if let Some(q) = query {
                text.push_str(q);
            }
            if let Some(inp) = input {
                text.push_str(inp);
            }
        }
        if text.is_empty() {
            return None;
        }
        Some(text.replacen(TRIGGER_WORD, &self.bot_name, 1))
    }

    async fn translate_text(&self, activity: &Activity) -> Result<Option<String>, DispatchError> {
        if let Some(value) = &activity.value {
            return Ok(self.reassemble_submission(value));
        }

        let Some(raw) = activity.text.as_deref() else {
            return Ok(None);
        };

        // The roster lookup is the one suspension point of inbound
        // translation; a failed fetch fails this activity.
        let service_url = activity.address.service_url.as_deref().unwrap_or_default();
        let roster = self
            .connector
            .fetch_roster(service_url, &activity.address.conversation.id)
            .await
            .map_err(|source| DispatchError::RosterFetch {
                conversation: activity.address.conversation.id.clone(),
                source,
            })?;

        let mut text = mentions::rewrite_inbound(
            raw,
            &activity.entities,
            &roster,
            &activity.address.bot.id,
            &self.bot_name,
        );

        if !activity.address.conversation.is_group && !text.starts_with(&self.bot_name) {
            text = format!("{} {text}", self.bot_name);
        }
        if let Some(stripped) = text.strip_suffix('\n') {
            text.truncate(stripped.len());
        }
        Ok(Some(text))
    }
}

#[async_trait]
impl ChannelStrategy for TeamsStrategy {
    async fn to_receivable(
        &self,
        activity: Activity,
    ) -> Result<Option<ReceivedEvent>, DispatchError> {
        if !self.tenant_allowed(&activity) {
            debug!(tenant = ?activity.tenant_id(), "activity from filtered tenant");
            return Ok(None);
        }

        let user = self.upsert_sender(&activity);

        match activity.kind {
            ActivityType::Message | ActivityType::Invoke => {
                let Some(text) = self.translate_text(&activity).await? else {
                    return Ok(None);
                };
                Ok(Some(ReceivedEvent::TextMessage {
                    user,
                    text,
                    reply_to_id: activity.id,
                }))
            }
            // Roster changes and similar events name the user; the bus
            // may care. Everything else has nothing to represent.
            ActivityType::ConversationUpdate => Ok(Some(ReceivedEvent::Event { user })),
            ActivityType::Typing | ActivityType::Other => Ok(None),
        }
    }

    fn to_sendable(
        &self,
        envelope: &ReplyEnvelope,
        message: &OutgoingMessage,
    ) -> Vec<OutboundPayload> {
        let text = match message {
            OutgoingMessage::Payload(prebuilt) => return vec![(**prebuilt).clone()],
            OutgoingMessage::Text(text) => text.trim(),
        };

        let mut payload = OutboundPayload::message(envelope.address.clone());
        let card = self.synthesizer.synthesize(
            text,
            envelope.inbound_text.as_deref(),
            &self.directory,
        );

        if !card.attachments.is_empty() {
            payload.attachments = card.attachments;
            return vec![payload];
        }

        let rewritten = mentions::rewrite_outbound(card.text.as_deref().unwrap_or(text), &self.directory);
        let mut text = rewritten.text;
        if text.starts_with(&self.bot_name) {
            text = escape_less_than(&text);
        }
        payload.text = Some(text.replace('\n', LINE_BREAK));
        payload.entities = rewritten.entities;
        vec![payload]
    }

    fn supports_auth(&self) -> bool {
        true
    }
}

/// Escape `<` to its entity form, leaving mention placeholders alone.
fn escape_less_than(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("<at>") || tail.starts_with("</at>") {
            out.push('<');
        } else {
            out.push_str("&lt;");
        }
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}
