//! Bidirectional mention rewriting.
//!
//! Inbound: structured mention entities (and inline `<@id|display>`
//! tokens) are resolved against the conversation roster and replaced
//! in the text. Outbound: inline tokens become mention entities plus a
//! normalized `<at>…</at>` placeholder. Parsing is pure over the text;
//! strategies own when and whether to call it.

use std::sync::LazyLock;

use regex::Regex;

use crate::activity::Entity;
use crate::connector::RosterMember;
use crate::directory::UserDirectory;

/// Inline mention token: `<@id>` or `<@id|display>`.
static MENTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([^|>]+)(?:\|([^>]+))?>").expect("mention token pattern"));

/// Rewrite inbound mentions in `text`.
///
/// Each mention resolves to, in order: the bot's name when it targets
/// the bot itself, the roster member's object id, or the mention's own
/// display name. Every replacement consumes one occurrence of the
/// entity's literal span.
pub fn rewrite_inbound(
    text: &str,
    entities: &[Entity],
    roster: &[RosterMember],
    bot_id: &str,
    bot_name: &str,
) -> String {
    let mut out = text.to_string();

    for entity in entities.iter().filter(|e| e.is_mention()) {
        let (Some(mentioned), Some(span)) = (&entity.mentioned, &entity.text) else {
            continue;
        };
        let display = mentioned
            .name
            .clone()
            .unwrap_or_else(|| mentioned.id.clone());
        let replacement = resolve_inbound(&mentioned.id, &display, roster, bot_id, bot_name);
        out = out.replacen(span.as_str(), &replacement, 1);
    }

    // Inline tokens carry their own id; a token left in the text means
    // the sender round-tripped an unresolved outbound mention.
    loop {
        let Some(caps) = MENTION_TOKEN.captures(&out) else {
            break;
        };
        let range = caps.get(0).expect("match").range();
        let id = caps.get(1).expect("id group").as_str().to_string();
        let display = caps
            .get(2)
            .map_or_else(|| id.clone(), |d| d.as_str().to_string());
        let replacement = resolve_inbound(&id, &display, roster, bot_id, bot_name);
        out.replace_range(range, &replacement);
    }

    out
}

fn resolve_inbound(
    id: &str,
    display: &str,
    roster: &[RosterMember],
    bot_id: &str,
    bot_name: &str,
) -> String {
    if id == bot_id {
        return bot_name.to_string();
    }
    roster
        .iter()
        .find(|m| m.id == id)
        .and_then(|m| m.object_id.clone())
        .unwrap_or_else(|| display.to_string())
}

/// Result of outbound mention rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRewrite {
    pub text: String,
    pub entities: Vec<Entity>,
}

/// Rewrite inline `<@id|display>` tokens for sending.
///
/// Ids resolve against the user directory by id or display name. An
/// unresolved id is kept as both id and display name, so the token
/// survives a later inbound pass losslessly once the roster knows it.
pub fn rewrite_outbound(text: &str, directory: &UserDirectory) -> OutboundRewrite {
    let mut entities = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in MENTION_TOKEN.captures_iter(text) {
        let whole = caps.get(0).expect("match");
        let key = caps.get(1).expect("id").as_str();
        let display_token = caps.get(2).map(|d| d.as_str());

        let (id, name) = match directory.resolve(key) {
            Some(user) => {
                let name = user.name.unwrap_or_else(|| key.to_string());
                (user.id, name)
            }
            None => (key.to_string(), key.to_string()),
        };
        let display = display_token.unwrap_or(&name);
        let span = format!("<at>{display}</at>");

        out.push_str(&text[last..whole.start()]);
        out.push_str(&span);
        last = whole.end();

        entities.push(Entity::mention(id, name, span));
    }
    out.push_str(&text[last..]);

    OutboundRewrite { text: out, entities }
}
