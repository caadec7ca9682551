//! Dispatch core.
//!
//! Inbound: resolve the strategy, run the gate, translate, deliver.
//! Each activity moves through received → authorized|denied →
//! translated|dropped → delivered, in strict sequence. Outbound: one
//! typing-paired connector batch per response message.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::activity::{Activity, ActivityType, OutboundPayload};
use crate::auth::AuthGate;
use crate::bus::{MessageBus, OutgoingMessage, ReplyEnvelope};
use crate::channels::StrategyRegistry;
use crate::connector::Connector;
use crate::error::{Error, Result};

pub struct Dispatcher {
    registry: StrategyRegistry,
    gate: AuthGate,
    bus: Arc<dyn MessageBus>,
    connector: Arc<dyn Connector>,
    bot_name: String,
}

impl Dispatcher {
    pub fn new(
        registry: StrategyRegistry,
        gate: AuthGate,
        bus: Arc<dyn MessageBus>,
        connector: Arc<dyn Connector>,
        bot_name: String,
    ) -> Self {
        Self {
            registry,
            gate,
            bus,
            connector,
            bot_name,
        }
    }

    /// Handle a webhook batch. Activities are independent: a failure
    /// is logged and does not stop the rest, but the first error is
    /// still reported to the transport layer.
    pub async fn handle_batch(&self, activities: Vec<Activity>) -> Result<()> {
        let mut first_error = None;
        for activity in activities {
            if let Err(e) = self.handle_activity(activity).await {
                error!(error = %e, "failed to dispatch activity");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run one inbound activity through the pipeline.
    pub async fn handle_activity(&self, mut activity: Activity) -> Result<()> {
        debug!(
            source = activity.source_name(),
            kind = ?activity.kind,
            "activity received"
        );

        // Invoke sub-protocol: the structured value carries the real
        // message text and is discarded once extracted.
        if activity.kind == ActivityType::Invoke {
            if let Some(value) = activity.value.take() {
                if let Some(text) = value.get("hubotMessage").and_then(|t| t.as_str()) {
                    activity.text = Some(text.to_string());
                }
            }
        }

        let source = activity.source_name().to_string();
        let strategy = self.registry.resolve(&source)?;

        let decision = self.gate.authorize(&activity, strategy.supports_auth());
        if let Some(command) = decision.denial_command(&self.bot_name) {
            info!(?decision, user = %activity.address.user.id, "activity denied");
            // Denials stay observable: the substituted command makes
            // the bot answer with the denial message.
            activity.text = Some(command);
            activity.value = None;
        }

        match strategy.to_receivable(activity).await? {
            Some(event) => {
                self.bus.deliver(event).await?;
                debug!(source = %source, "activity delivered");
            }
            None => debug!(source = %source, "activity dropped"),
        }
        Ok(())
    }

    /// Send response messages back through the originating channel.
    ///
    /// Each message becomes its own connector batch: typing indicator
    /// first, then the content payloads. Ordering holds within a
    /// message but not across messages. Transport failure is fatal for
    /// the delivery attempt and escalates to the caller.
    pub async fn send(
        &self,
        envelope: &ReplyEnvelope,
        messages: Vec<OutgoingMessage>,
    ) -> Result<()> {
        let strategy = self.registry.resolve(&envelope.source)?;

        for message in messages {
            let payloads = strategy.to_sendable(envelope, &message);
            if payloads.is_empty() {
                continue;
            }
            let mut batch = vec![OutboundPayload::typing(envelope.address.clone())];
            batch.extend(payloads);
            self.connector
                .send(&envelope.address, &batch)
                .await
                .map_err(Error::Transport)?;
        }
        Ok(())
    }
}
