use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use bubbles_core::BotError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::payload::Payload;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SocketError {
    #[error("socket failed to connect: {0}")]
    Connect(String),
    #[error("socket read failed: {0}")]
    Receive(String),
    #[error("socket ack failed: {0}")]
    Acknowledge(String),
    #[error("socket disconnect failed: {0}")]
    Disconnect(String),
}

/// One delivery from the event stream. Every envelope must be acknowledged
/// before its payload is handled, regardless of what handling does with it.
#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub envelope_id: String,
    pub payload: Payload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), SocketError>;
    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SocketError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), SocketError>;
    async fn disconnect(&self) -> Result<(), SocketError>;
}

/// Where acknowledged payloads go. The runner treats sink failures as
/// per-event problems, never as a reason to drop the connection.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle_event(&self, payload: Payload) -> Result<(), BotError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), SocketError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SocketError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), SocketError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SocketError> {
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    sink: Arc<dyn EventSink>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        sink: Arc<dyn EventSink>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, sink, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(socket_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %socket_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SocketError> {
        info!(attempt, "opening socket mode connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_kind = ?envelope.payload.kind,
                channel_id = %envelope.payload.channel_id,
                "received slack envelope"
            );

            // Ack first: handling must never delay or suppress the ack.
            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            if let Err(error) = self.sink.handle_event(envelope.payload).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "event handling failed; continuing socket loop"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bubbles_core::BotError;
    use tokio::sync::Mutex;

    use super::{
        EventEnvelope, EventSink, ReconnectPolicy, SocketError, SocketModeRunner, SocketTransport,
    };
    use crate::payload::Payload;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), SocketError>>,
        envelopes: VecDeque<Result<Option<EventEnvelope>, SocketError>>,
        disconnect_results: VecDeque<Result<(), SocketError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), SocketError>>,
            envelopes: Vec<Result<Option<EventEnvelope>, SocketError>>,
            disconnect_results: Vec<Result<(), SocketError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    disconnect_results: disconnect_results.into(),
                    connect_attempts: 0,
                    acknowledgements: Vec::new(),
                    disconnect_calls: 0,
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), SocketError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SocketError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), SocketError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), SocketError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            state.disconnect_results.pop_front().unwrap_or(Ok(()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        handled: Mutex<Vec<Payload>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn handle_event(&self, payload: Payload) -> Result<(), BotError> {
            self.handled.lock().await.push(payload);
            if self.fail {
                Err(BotError::Internal("sink exploded".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    fn envelope(id: &str) -> EventEnvelope {
        EventEnvelope {
            envelope_id: id.to_owned(),
            payload: Payload::message("C1", "U1", "hello", "1730000000.1000"),
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(SocketError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(envelope("env-1"))), Ok(None)],
            vec![Ok(())],
        ));
        let sink = Arc::new(RecordingSink::default());

        let runner = SocketModeRunner::new(
            transport.clone(),
            sink.clone(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
        assert_eq!(sink.handled.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(SocketError::Connect("fail-1".to_owned())),
                Err(SocketError::Connect("fail-2".to_owned())),
                Err(SocketError::Connect("fail-3".to_owned())),
            ],
            vec![],
            vec![],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            Arc::new(RecordingSink::default()),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn acknowledges_even_when_handling_fails() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(envelope("env-7"))), Ok(Some(envelope("env-8"))), Ok(None)],
            vec![Ok(())],
        ));
        let sink = Arc::new(RecordingSink { handled: Mutex::new(Vec::new()), fail: true });

        let runner =
            SocketModeRunner::new(transport.clone(), sink.clone(), ReconnectPolicy::default());

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.acknowledgements().await, vec!["env-7", "env-8"]);
        assert_eq!(sink.handled.lock().await.len(), 2);
    }
}
