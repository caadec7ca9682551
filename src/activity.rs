//! Wire-format types for connector activities.
//!
//! These mirror the connector's JSON shapes (camelCase on the wire).
//! Inbound activities are deserialized from webhook posts; outbound
//! payloads are serialized back through the connector transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of an inbound activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    Message,
    Invoke,
    Typing,
    ConversationUpdate,
    #[serde(other)]
    Other,
}

/// One unit of inbound channel communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    /// Channel name used to resolve the strategy (e.g. "msteams").
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Structured payload, e.g. an adaptive-card form submission.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Routing and reply metadata.
    pub address: Address,
    /// Channel-specific metadata (carries `tenant.id` on Teams).
    #[serde(default)]
    pub source_event: Option<serde_json::Value>,
    /// Ordered annotations over `text`, e.g. mention entities.
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Activity {
    /// Channel name this activity arrived on.
    pub fn source_name(&self) -> &str {
        self.source
            .as_deref()
            .or(self.address.channel_id.as_deref())
            .unwrap_or("")
    }

    /// Tenant id from the channel metadata, when present.
    pub fn tenant_id(&self) -> Option<&str> {
        self.source_event
            .as_ref()
            .and_then(|ev| ev.get("tenant"))
            .and_then(|t| t.get("id"))
            .and_then(|id| id.as_str())
    }
}

/// Routing metadata shared by an activity and its replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub bot: ChannelAccount,
    pub user: ChannelAccount,
    pub conversation: Conversation,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Base URL replies and roster lookups go to.
    #[serde(default)]
    pub service_url: Option<String>,
}

/// A bot or user identity on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Stable directory object id, when the channel provides one.
    #[serde(default)]
    pub aad_object_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Group conversations don't get the bot-name prefix treatment.
    #[serde(default)]
    pub is_group: bool,
}

/// An annotation over a span of activity text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub mentioned: Option<ChannelAccount>,
    /// The literal text span the annotation covers.
    #[serde(default)]
    pub text: Option<String>,
}

impl Entity {
    /// Build a mention entity covering `span` and pointing at `id`.
    pub fn mention(id: impl Into<String>, name: impl Into<String>, span: impl Into<String>) -> Self {
        Self {
            kind: "mention".to_string(),
            mentioned: Some(ChannelAccount {
                id: id.into(),
                name: Some(name.into()),
                aad_object_id: None,
            }),
            text: Some(span.into()),
        }
    }

    pub fn is_mention(&self) -> bool {
        self.kind == "mention"
    }
}

// ── Outbound ────────────────────────────────────────────────────────

/// Kind of an outbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadKind {
    Typing,
    Message,
}

/// One unit sent to the connector transport. A content payload is
/// always preceded by a typing payload sharing the same address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl OutboundPayload {
    /// A typing indicator for `address`.
    pub fn typing(address: Address) -> Self {
        Self {
            kind: PayloadKind::Typing,
            address,
            text: None,
            attachments: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// An empty message payload for `address`.
    pub fn message(address: Address) -> Self {
        Self {
            kind: PayloadKind::Message,
            address,
            text: None,
            attachments: Vec::new(),
            entities: Vec::new(),
        }
    }
}

/// A rich attachment on an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl Attachment {
    pub fn adaptive_card(content: serde_json::Value) -> Self {
        Self {
            content_type: "application/vnd.microsoft.card.adaptive".to_string(),
            content_url: None,
            content: Some(content),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            content_type: "image/png".to_string(),
            content_url: Some(url.into()),
            content: None,
        }
    }
}

/// Webhook body: the connector posts either one activity or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActivityBatch {
    One(Box<Activity>),
    Many(Vec<Activity>),
}

impl ActivityBatch {
    pub fn into_vec(self) -> Vec<Activity> {
        match self {
            ActivityBatch::One(a) => vec![*a],
            ActivityBatch::Many(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_activity() -> serde_json::Value {
        serde_json::json!({
            "type": "message",
            "source": "msteams",
            "text": "hello",
            "address": {
                "bot": {"id": "b1", "name": "bridge"},
                "user": {"id": "u1", "name": "Alice", "aadObjectId": "obj1"},
                "conversation": {"id": "c1", "isGroup": true},
                "channelId": "msteams",
                "serviceUrl": "https://smba.example.test"
            },
            "sourceEvent": {"tenant": {"id": "t1"}},
            "entities": [
                {"type": "mention", "mentioned": {"id": "b1", "name": "bridge"}, "text": "<at>bridge</at>"}
            ]
        })
    }

    #[test]
    fn deserializes_wire_shape() {
        let activity: Activity = serde_json::from_value(wire_activity()).unwrap();
        assert_eq!(activity.kind, ActivityType::Message);
        assert_eq!(activity.source_name(), "msteams");
        assert_eq!(activity.tenant_id(), Some("t1"));
        assert!(activity.address.conversation.is_group);
        assert!(activity.entities[0].is_mention());
    }

    #[test]
    fn unknown_activity_type_maps_to_other() {
        let mut value = wire_activity();
        value["type"] = serde_json::json!("messageReaction");
        let activity: Activity = serde_json::from_value(value).unwrap();
        assert_eq!(activity.kind, ActivityType::Other);
    }

    #[test]
    fn batch_accepts_single_and_array() {
        let one: ActivityBatch = serde_json::from_value(wire_activity()).unwrap();
        assert_eq!(one.into_vec().len(), 1);

        let many: ActivityBatch =
            serde_json::from_value(serde_json::json!([wire_activity(), wire_activity()])).unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn typing_payload_serializes_without_text() {
        let activity: Activity = serde_json::from_value(wire_activity()).unwrap();
        let typing = OutboundPayload::typing(activity.address);
        let value = serde_json::to_value(&typing).unwrap();
        assert_eq!(value["type"], "typing");
        assert!(value.get("text").is_none());
        assert!(value.get("attachments").is_none());
    }
}
