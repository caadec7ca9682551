//! Per-channel activity translation strategies.
//!
//! Each supported channel implements [`ChannelStrategy`]; the dispatch
//! core resolves one by the activity's `source` name and never needs
//! to know channel specifics.

pub mod teams;
pub mod text;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::{Activity, OutboundPayload};
use crate::bus::{OutgoingMessage, ReceivedEvent, ReplyEnvelope};
use crate::error::DispatchError;

pub use teams::TeamsStrategy;
pub use text::TextStrategy;

/// Per-channel translation and authorization support.
#[async_trait]
pub trait ChannelStrategy: Send + Sync {
    /// Translate an inbound activity into a bus event.
    ///
    /// `Ok(None)` means "drop the activity", not an error. Always
    /// async: some variants suspend on an out-of-band lookup before
    /// they can finish translating.
    async fn to_receivable(
        &self,
        activity: Activity,
    ) -> Result<Option<ReceivedEvent>, DispatchError>;

    /// Translate one outbound response into its content payloads. The
    /// dispatcher pairs them with a typing indicator.
    fn to_sendable(
        &self,
        envelope: &ReplyEnvelope,
        message: &OutgoingMessage,
    ) -> Vec<OutboundPayload>;

    /// Whether activities on this channel carry a verifiable identity.
    fn supports_auth(&self) -> bool;
}

/// Named strategy registry. Resolution failure is a configuration
/// error surfaced at dispatch time, not a silent drop.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn ChannelStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn ChannelStrategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    pub fn resolve(&self, source: &str) -> Result<Arc<dyn ChannelStrategy>, DispatchError> {
        self.strategies
            .get(source)
            .cloned()
            .ok_or_else(|| DispatchError::UnsupportedChannel {
                channel: source.to_string(),
            })
    }
}
