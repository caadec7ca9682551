//! Rich-card synthesis for outbound responses.
//!
//! Five rules, checked in order, first match wins; each of the first
//! four replaces the text with a single attachment. Card content is
//! adaptive-card JSON.

use std::sync::Arc;

use regex::Regex;
use serde_json::json;

use crate::activity::Attachment;
use crate::directory::UserDirectory;

/// Literal trigger word card templates are authored with; submissions
/// rewrite it to the configured invocation name.
pub const TRIGGER_WORD: &str = "bot";

/// Outbound text that produces the admin-list card.
pub const LIST_ADMINS_TEXT: &str = "list admins";

/// Outbound text that produces the easter-egg card.
pub const EASTER_EGG_TEXT: &str = "easter-egg";

const EASTER_EGG_IMAGE: &str = "https://octodex.github.com/images/original.png";

const ADAPTIVE_CARD_VERSION: &str = "1.4";

/// A configured card template: when the triggering inbound text
/// matches, the response is rendered as a form card instead of text.
///
/// The form round-trips through the submission path: literal command
/// fragments are keyed `"<name> - query{i}"`, free inputs
/// `"<name> - input{i}"`, and the submission carries `queryPrefix` so
/// the strategy can reassemble them in order.
pub struct CardTemplate {
    /// Template name, used as the fragment key prefix.
    pub name: String,
    /// Matches against the triggering inbound text.
    pub trigger: Regex,
    pub title: String,
    /// Literal command fragments, in order.
    pub query_parts: Vec<String>,
    /// Placeholders for the free-input fields interleaved between them.
    pub input_parts: Vec<String>,
    /// Follow-up commands offered as buttons on the card.
    pub follow_ups: Vec<FollowUp>,
}

/// A follow-up action button: submits a complete command.
pub struct FollowUp {
    pub title: String,
    pub command: String,
}

/// Source of configured card templates.
pub trait CardCatalog: Send + Sync {
    fn lookup(&self, inbound_text: &str) -> Option<&CardTemplate>;
}

/// In-memory catalog; first matching template wins.
#[derive(Default)]
pub struct StaticCatalog {
    templates: Vec<CardTemplate>,
}

impl StaticCatalog {
    pub fn new(templates: Vec<CardTemplate>) -> Self {
        Self { templates }
    }
}

impl CardCatalog for StaticCatalog {
    fn lookup(&self, inbound_text: &str) -> Option<&CardTemplate> {
        self.templates.iter().find(|t| t.trigger.is_match(inbound_text))
    }
}

/// Result of card synthesis: text or attachments, never both.
#[derive(Debug, Default)]
pub struct CardResult {
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Builds card attachments from outbound text.
pub struct CardSynthesizer {
    catalog: Arc<dyn CardCatalog>,
    image_url: Regex,
}

impl CardSynthesizer {
    pub fn new(catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            catalog,
            image_url: Regex::new(r"(?i)^https?://\S+\.(jpe?g|png|gif)(\?\S*)?$")
                .expect("image url pattern"),
        }
    }

    /// Apply the synthesis rules to one outbound response.
    pub fn synthesize(
        &self,
        outbound_text: &str,
        triggering_inbound: Option<&str>,
        directory: &UserDirectory,
    ) -> CardResult {
        if let Some(template) = triggering_inbound.and_then(|t| self.catalog.lookup(t)) {
            return CardResult {
                text: None,
                attachments: vec![Attachment::adaptive_card(template_card(template))],
            };
        }

        if outbound_text == LIST_ADMINS_TEXT {
            return CardResult {
                text: None,
                attachments: vec![Attachment::adaptive_card(admin_list_card(directory))],
            };
        }

        if outbound_text == EASTER_EGG_TEXT {
            return CardResult {
                text: None,
                attachments: vec![Attachment::adaptive_card(easter_egg_card())],
            };
        }

        if let Some(first) = outbound_text.split_whitespace().next() {
            if self.image_url.is_match(first) {
                return CardResult {
                    text: None,
                    attachments: vec![image_attachment(first)],
                };
            }
        }

        CardResult {
            text: Some(outbound_text.to_string()),
            attachments: Vec::new(),
        }
    }
}

fn template_card(template: &CardTemplate) -> serde_json::Value {
    let mut body = vec![json!({
        "type": "TextBlock",
        "text": template.title,
        "weight": "bolder",
        "wrap": true,
    })];
    for (i, placeholder) in template.input_parts.iter().enumerate() {
        body.push(json!({
            "type": "Input.Text",
            "id": format!("{} - input{i}", template.name),
            "placeholder": placeholder,
        }));
    }

    let mut submit_data = json!({ "queryPrefix": template.name });
    for (i, fragment) in template.query_parts.iter().enumerate() {
        submit_data[format!("{} - query{i}", template.name)] = json!(fragment);
    }
    let mut actions = vec![json!({
        "type": "Action.Submit",
        "title": "Submit",
        "data": submit_data,
    })];
    for follow_up in &template.follow_ups {
        let mut data = json!({ "queryPrefix": follow_up.title });
        data[format!("{} - query0", follow_up.title)] = json!(follow_up.command);
        actions.push(json!({
            "type": "Action.Submit",
            "title": follow_up.title,
            "data": data,
        }));
    }

    json!({
        "type": "AdaptiveCard",
        "version": ADAPTIVE_CARD_VERSION,
        "body": body,
        "actions": actions,
    })
}

fn admin_list_card(directory: &UserDirectory) -> serde_json::Value {
    let listing = directory
        .admin_object_ids()
        .join("\n")
        .replace('<', "&lt;");
    json!({
        "type": "AdaptiveCard",
        "version": ADAPTIVE_CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "Authorized admins",
                "weight": "bolder",
            },
            {
                "type": "TextBlock",
                "text": listing,
                "wrap": true,
            },
        ],
    })
}

fn easter_egg_card() -> serde_json::Value {
    let mut data = json!({ "queryPrefix": EASTER_EGG_TEXT });
    data[format!("{EASTER_EGG_TEXT} - query0")] = json!(format!("{TRIGGER_WORD} {EASTER_EGG_TEXT}"));
    json!({
        "type": "AdaptiveCard",
        "version": ADAPTIVE_CARD_VERSION,
        "body": [
            {
                "type": "Image",
                "url": EASTER_EGG_IMAGE,
            },
        ],
        "actions": [
            {
                "type": "Action.Submit",
                "title": "Again!",
                "data": data,
            },
        ],
    })
}

fn image_attachment(url: &str) -> Attachment {
    let bare = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    let content_type = if bare.ends_with(".gif") {
        "image/gif"
    } else if bare.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    Attachment {
        content_type: content_type.to_string(),
        content_url: Some(url.to_string()),
        content: None,
    }
}
