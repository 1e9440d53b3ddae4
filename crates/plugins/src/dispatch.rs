use std::sync::Arc;

use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::identity::IdentityCache;
use bubbles_slack::payload::{EventKind, Payload};
use bubbles_slack::socket::EventSink;
use bubbles_slack::transport::ChatTransport;
use bubbles_slack::utils::Utilities;
use tracing::{debug, info};

use crate::registry::{PluginRegistry, ProcessOutcome};

/// Binds the registry to the transport: builds a Utilities facade per event
/// and routes by event kind. Mention, reaction-removed, and hello events are
/// acknowledged upstream and dropped here.
pub struct EventRouter {
    registry: Arc<PluginRegistry>,
    transport: Arc<dyn ChatTransport>,
    identity: Arc<IdentityCache>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<PluginRegistry>,
        transport: Arc<dyn ChatTransport>,
        identity: Arc<IdentityCache>,
    ) -> Self {
        Self { registry, transport, identity }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub async fn route(&self, payload: Payload) -> ProcessOutcome {
        let kind = payload.kind;
        let utils = Utilities::new(payload, self.transport.clone(), self.identity.clone());

        match kind {
            EventKind::Message => {
                let outcome = self.registry.process(utils.payload(), &utils).await;
                if let ProcessOutcome::Handled { plugin } = outcome {
                    info!(
                        event_name = "dispatch.plugin_fired",
                        plugin,
                        channel = utils.channel(),
                        "command plugin handled message"
                    );
                }
                outcome
            }
            EventKind::ReactionAdded => {
                info!(
                    event_name = "dispatch.reaction_received",
                    reaction = utils.reaction().unwrap_or("unknown"),
                    channel = utils.channel(),
                    "reaction added"
                );
                self.registry.handle_reaction(utils.payload(), &utils).await
            }
            EventKind::Mention | EventKind::ReactionRemoved | EventKind::Hello => {
                debug!(kind = ?kind, "dropping unhandled event kind");
                ProcessOutcome::Ignored
            }
        }
    }
}

#[async_trait]
impl EventSink for EventRouter {
    async fn handle_event(&self, payload: Payload) -> Result<(), BotError> {
        self.route(payload).await;
        Ok(())
    }
}
