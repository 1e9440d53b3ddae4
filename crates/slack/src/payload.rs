use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    ReactionAdded,
    ReactionRemoved,
    Mention,
    Hello,
}

/// Immutable snapshot of one inbound chat event.
///
/// Built on receipt and dropped after handling; plugins receive it by
/// reference and never mutate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub kind: EventKind,
    pub channel_id: String,
    pub sender_id: String,
    pub message_ts: Option<String>,
    pub text: Option<String>,
    /// Emoji name for reaction events.
    pub reaction: Option<String>,
    /// Author of the message a reaction targets.
    pub item_user: Option<String>,
    /// Timestamp of the message a reaction targets.
    pub item_ts: Option<String>,
    /// Parent timestamp when the event happened inside a thread.
    pub thread_ts: Option<String>,
    /// The raw event map as delivered by the transport.
    pub raw: Value,
}

impl Payload {
    pub fn message(
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        ts: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Message,
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            message_ts: Some(ts.into()),
            text: Some(text.into()),
            reaction: None,
            item_user: None,
            item_ts: None,
            thread_ts: None,
            raw: Value::Null,
        }
    }

    pub fn reaction_added(
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        reaction: impl Into<String>,
        item_ts: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::ReactionAdded,
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            message_ts: None,
            text: None,
            reaction: Some(reaction.into()),
            item_user: None,
            item_ts: Some(item_ts.into()),
            thread_ts: None,
            raw: Value::Null,
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// True when the payload carries non-whitespace text. Payloads without
    /// usable text are non-events for the command dispatcher.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}
