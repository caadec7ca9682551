//! Per-activity authorization gate.
//!
//! Denials are not dropped: the dispatcher substitutes a fixed internal
//! command text so the bot answers with a visible error message.

use std::sync::Arc;

use tracing::debug;

use crate::activity::Activity;
use crate::directory::UserDirectory;

/// Internal command substituted when the channel can't carry identity.
pub const UNSUPPORTED_AUTH_COMMAND: &str = "return source authorization not supported error";

/// Internal command substituted when the caller isn't authorized.
pub const UNAUTHORIZED_USER_COMMAND: &str = "return unauthorized user error";

/// Outcome of the gate for one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Authorization is on but the channel carries no usable identity.
    DenyUnsupported,
    /// The caller's identity is missing or not in any authorized set.
    DenyUnauthenticated,
}

impl Decision {
    /// The internal command text for a denial, invocation-name
    /// prefixed so the bot picks it up. `None` for `Allow`.
    pub fn denial_command(&self, bot_name: &str) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::DenyUnsupported => Some(format!("{bot_name} {UNSUPPORTED_AUTH_COMMAND}")),
            Decision::DenyUnauthenticated => Some(format!("{bot_name} {UNAUTHORIZED_USER_COMMAND}")),
        }
    }
}

/// The authorization gate. Holds the process-wide enable flag and a
/// handle to the authorized-identity store.
pub struct AuthGate {
    enabled: bool,
    directory: Arc<UserDirectory>,
}

impl AuthGate {
    pub fn new(enabled: bool, directory: Arc<UserDirectory>) -> Self {
        Self { enabled, directory }
    }

    /// Decide whether `activity` may enter the message bus.
    pub fn authorize(&self, activity: &Activity, channel_supports_auth: bool) -> Decision {
        if !self.enabled {
            return Decision::Allow;
        }
        if !channel_supports_auth {
            return Decision::DenyUnsupported;
        }
        let Some(object_id) = activity.address.user.aad_object_id.as_deref() else {
            debug!(user = %activity.address.user.id, "activity carries no object id");
            return Decision::DenyUnauthenticated;
        };
        if self.directory.is_authorized(object_id) {
            Decision::Allow
        } else {
            Decision::DenyUnauthenticated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityType, Address, ChannelAccount, Conversation};

    fn activity(object_id: Option<&str>) -> Activity {
        Activity {
            kind: ActivityType::Message,
            source: Some("msteams".into()),
            id: None,
            text: Some("hi".into()),
            value: None,
            address: Address {
                bot: ChannelAccount {
                    id: "b1".into(),
                    name: None,
                    aad_object_id: None,
                },
                user: ChannelAccount {
                    id: "u1".into(),
                    name: Some("Alice".into()),
                    aad_object_id: object_id.map(str::to_string),
                },
                conversation: Conversation {
                    id: "c1".into(),
                    is_group: false,
                },
                channel_id: Some("msteams".into()),
                service_url: None,
            },
            source_event: None,
            entities: Vec::new(),
            reply_to_id: None,
            timestamp: None,
        }
    }

    fn gate(enabled: bool, authorized: &[&str]) -> AuthGate {
        let dir = Arc::new(UserDirectory::new());
        for id in authorized {
            dir.authorize("t1", id);
        }
        AuthGate::new(enabled, dir)
    }

    #[test]
    fn disabled_gate_allows_everything() {
        let gate = gate(false, &[]);
        assert_eq!(gate.authorize(&activity(None), false), Decision::Allow);
        assert_eq!(gate.authorize(&activity(None), true), Decision::Allow);
    }

    #[test]
    fn unsupported_channel_is_distinct_denial() {
        let gate = gate(true, &["obj1"]);
        assert_eq!(
            gate.authorize(&activity(Some("obj1")), false),
            Decision::DenyUnsupported
        );
    }

    #[test]
    fn missing_or_unknown_identity_is_unauthenticated() {
        let gate = gate(true, &["obj1"]);
        assert_eq!(
            gate.authorize(&activity(None), true),
            Decision::DenyUnauthenticated
        );
        assert_eq!(
            gate.authorize(&activity(Some("stranger")), true),
            Decision::DenyUnauthenticated
        );
    }

    #[test]
    fn authorized_identity_passes() {
        let gate = gate(true, &["obj1"]);
        assert_eq!(gate.authorize(&activity(Some("obj1")), true), Decision::Allow);
    }

    #[test]
    fn denial_commands_carry_bot_name() {
        assert_eq!(
            Decision::DenyUnsupported.denial_command("hubot").unwrap(),
            format!("hubot {UNSUPPORTED_AUTH_COMMAND}")
        );
        assert_eq!(
            Decision::DenyUnauthenticated.denial_command("hubot").unwrap(),
            format!("hubot {UNAUTHORIZED_USER_COMMAND}")
        );
        assert!(Decision::Allow.denial_command("hubot").is_none());
    }
}
