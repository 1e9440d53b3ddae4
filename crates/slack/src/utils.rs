use std::sync::Arc;

use bubbles_core::BotError;

use crate::blocks::Block;
use crate::identity::IdentityCache;
use crate::payload::Payload;
use crate::transport::{ChatTransport, FileUpload, MessageHandle};

/// Per-event facade handed to plugins and listeners.
///
/// Bound to exactly one [`Payload`]; lives as long as the event is being
/// handled. Transport failures surface as [`BotError::TransportUnavailable`],
/// never swallowed here.
pub struct Utilities {
    payload: Payload,
    transport: Arc<dyn ChatTransport>,
    identity: Arc<IdentityCache>,
}

impl Utilities {
    pub fn new(
        payload: Payload,
        transport: Arc<dyn ChatTransport>,
        identity: Arc<IdentityCache>,
    ) -> Self {
        Self { payload, transport, identity }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn channel(&self) -> &str {
        &self.payload.channel_id
    }

    pub fn sender_id(&self) -> &str {
        &self.payload.sender_id
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.payload.message_ts.as_deref()
    }

    pub fn reaction(&self) -> Option<&str> {
        self.payload.reaction.as_deref()
    }

    pub async fn bot_user_id(&self) -> Result<String, BotError> {
        Ok(self.identity.identity().await?.user_id.clone())
    }

    pub async fn bot_username(&self) -> Result<String, BotError> {
        Ok(self.identity.identity().await?.username.clone())
    }

    pub async fn sender_username(&self) -> Result<Option<String>, BotError> {
        Ok(self.identity.username_for(&self.payload.sender_id).await?)
    }

    /// Display name of the user a reaction targets, when known.
    pub async fn receiver_username(&self) -> Result<Option<String>, BotError> {
        match self.payload.item_user.as_deref() {
            Some(user_id) => Ok(self.identity.username_for(user_id).await?),
            None => Ok(None),
        }
    }

    /// Post into the triggering channel, threaded under the parent when the
    /// source message was itself in a thread.
    pub async fn respond(&self, text: &str) -> Result<MessageHandle, BotError> {
        let handle = self
            .transport
            .post_message(&self.payload.channel_id, text, None, self.payload.thread_ts.as_deref())
            .await?;
        Ok(handle)
    }

    /// Post into the triggering channel unconditionally, at top level.
    pub async fn say(&self, text: &str) -> Result<MessageHandle, BotError> {
        let handle =
            self.transport.post_message(&self.payload.channel_id, text, None, None).await?;
        Ok(handle)
    }

    pub async fn say_with_blocks(
        &self,
        text: &str,
        blocks: &[Block],
    ) -> Result<MessageHandle, BotError> {
        let handle = self
            .transport
            .post_message(&self.payload.channel_id, text, Some(blocks), None)
            .await?;
        Ok(handle)
    }

    /// Replace the content of a previously-posted message.
    pub async fn update_message(
        &self,
        handle: &MessageHandle,
        text: &str,
        blocks: &[Block],
    ) -> Result<(), BotError> {
        self.transport.update_message(handle, text, Some(blocks)).await?;
        Ok(())
    }

    /// Add a reaction emoji. With no handle, the triggering message is used.
    pub async fn reaction_add(
        &self,
        handle: Option<&MessageHandle>,
        name: &str,
    ) -> Result<(), BotError> {
        let target = match handle {
            Some(handle) => handle.clone(),
            None => MessageHandle {
                channel: self.payload.channel_id.clone(),
                ts: self
                    .payload
                    .message_ts
                    .clone()
                    .or_else(|| self.payload.item_ts.clone())
                    .ok_or_else(|| {
                        BotError::BadInput(
                            "no target message for the reaction (event carries no timestamp)"
                                .to_owned(),
                        )
                    })?,
            },
        };
        self.transport.add_reaction(&target, name).await?;
        Ok(())
    }

    /// Attach a file (by local path) or a text blob to the triggering
    /// channel. Exactly one of `file` and `content` must be provided.
    pub async fn upload_file(&self, upload: FileUpload) -> Result<(), BotError> {
        match (&upload.file, &upload.content) {
            (Some(_), Some(_)) => {
                return Err(BotError::BadInput(
                    "provide either `file` or `content` for an upload, not both".to_owned(),
                ))
            }
            (None, None) => {
                return Err(BotError::BadInput(
                    "an upload needs either `file` or `content`".to_owned(),
                ))
            }
            _ => {}
        }
        self.transport.upload_file(&self.payload.channel_id, &upload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bubbles_core::BotError;

    use super::Utilities;
    use crate::identity::IdentityCache;
    use crate::payload::Payload;
    use crate::testing::RecordingTransport;
    use crate::transport::FileUpload;

    fn utilities_for(payload: Payload, transport: Arc<RecordingTransport>) -> Utilities {
        let identity = Arc::new(IdentityCache::new(transport.clone(), "bubbles"));
        Utilities::new(payload, transport, identity)
    }

    #[tokio::test]
    async fn respond_threads_under_the_parent_when_source_was_threaded() {
        let transport = Arc::new(RecordingTransport::new());
        let payload = Payload::message("C1", "U1", "!ping", "5.0").in_thread("4.0");
        let utils = utilities_for(payload, transport.clone());

        utils.respond("PONG!").await.expect("respond");

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].thread_ts.as_deref(), Some("4.0"));
        assert_eq!(posts[0].text, "PONG!");
    }

    #[tokio::test]
    async fn respond_posts_at_top_level_without_a_thread_parent() {
        let transport = Arc::new(RecordingTransport::new());
        let utils = utilities_for(Payload::message("C1", "U1", "!ping", "5.0"), transport.clone());

        utils.respond("PONG!").await.expect("respond");
        assert_eq!(transport.posts()[0].thread_ts, None);
    }

    #[tokio::test]
    async fn say_always_posts_at_top_level_and_returns_a_handle() {
        let transport = Arc::new(RecordingTransport::new());
        let payload = Payload::message("C1", "U1", "!deploy", "5.0").in_thread("4.0");
        let utils = utilities_for(payload, transport.clone());

        let handle = utils.say("starting").await.expect("say");
        assert_eq!(handle.channel, "C1");
        assert_eq!(transport.posts()[0].thread_ts, None);

        utils.reaction_add(Some(&handle), "rocket").await.expect("react");
        assert_eq!(transport.reactions()[0].handle, handle);
        assert_eq!(transport.reactions()[0].name, "rocket");
    }

    #[tokio::test]
    async fn reaction_add_defaults_to_the_triggering_message() {
        let transport = Arc::new(RecordingTransport::new());
        let utils = utilities_for(Payload::message("C1", "U1", "!ping", "5.0"), transport.clone());

        utils.reaction_add(None, "eyes").await.expect("react");
        assert_eq!(transport.reactions()[0].handle.ts, "5.0");
    }

    #[tokio::test]
    async fn upload_requires_exactly_one_source() {
        let transport = Arc::new(RecordingTransport::new());
        let utils = utilities_for(Payload::message("C1", "U1", "!plot", "5.0"), transport.clone());

        let both = FileUpload {
            file: Some("plot.png".into()),
            content: Some("data".to_owned()),
            ..FileUpload::default()
        };
        assert!(matches!(utils.upload_file(both).await, Err(BotError::BadInput(_))));

        let neither = FileUpload::default();
        assert!(matches!(utils.upload_file(neither).await, Err(BotError::BadInput(_))));

        let content_only = FileUpload {
            content: Some("x,y\n1,2".to_owned()),
            filetype: Some("csv".to_owned()),
            title: Some("stats".to_owned()),
            ..FileUpload::default()
        };
        utils.upload_file(content_only).await.expect("upload");
        assert_eq!(transport.uploads().len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_surface_as_errors() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_posts(true);
        let utils = utilities_for(Payload::message("C1", "U1", "!ping", "5.0"), transport);

        assert!(matches!(
            utils.respond("PONG!").await,
            Err(BotError::TransportUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn identity_accessors_use_the_cached_directory() {
        let transport = Arc::new(RecordingTransport::with_bot_user("UBOT", "bubbles"));
        transport.add_user("U1", "volunteer");
        let utils = utilities_for(Payload::message("C1", "U1", "hello", "5.0"), transport);

        assert_eq!(utils.bot_user_id().await.expect("id"), "UBOT");
        assert_eq!(utils.bot_username().await.expect("name"), "bubbles");
        assert_eq!(utils.sender_username().await.expect("sender").as_deref(), Some("volunteer"));
    }
}
