//! Test support: an in-memory transport that records every outbound call.
//!
//! Lives outside `#[cfg(test)]` so downstream crates (plugins, jobs, cli)
//! can drive their own tests against the same fake.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::blocks::Block;
use crate::transport::{
    ChannelInfo, ChatMessage, ChatTransport, FileUpload, HistoryQuery, MessageHandle,
    TransportError, UserInfo,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub text: String,
    pub blocks: Option<Vec<Block>>,
    pub thread_ts: Option<String>,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatedMessage {
    pub handle: MessageHandle,
    pub text: String,
    pub blocks: Option<Vec<Block>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedReaction {
    pub handle: MessageHandle,
    pub name: String,
}

#[derive(Default)]
struct RecordingState {
    posts: Vec<PostedMessage>,
    updates: Vec<UpdatedMessage>,
    reactions: Vec<RecordedReaction>,
    uploads: Vec<(String, FileUpload)>,
    history: Vec<ChatMessage>,
    users: Vec<UserInfo>,
    channels: Vec<ChannelInfo>,
    fail_posts: bool,
}

/// In-memory [`ChatTransport`] that records outbound traffic and serves
/// scripted directory/history data.
#[derive(Default)]
pub struct RecordingTransport {
    state: Mutex<RecordingState>,
    ts_counter: AtomicU64,
    bot_user_id: Mutex<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        *transport.bot_user_id.lock().expect("lock") = "UBOT".to_owned();
        transport
    }

    pub fn with_bot_user(user_id: &str, username: &str) -> Self {
        let transport = Self::new();
        *transport.bot_user_id.lock().expect("lock") = user_id.to_owned();
        transport.state.lock().expect("lock").users.push(UserInfo {
            id: user_id.to_owned(),
            name: username.to_owned(),
        });
        transport
    }

    pub fn add_user(&self, id: &str, name: &str) {
        self.state
            .lock()
            .expect("lock")
            .users
            .push(UserInfo { id: id.to_owned(), name: name.to_owned() });
    }

    pub fn add_channel(&self, id: &str, name: &str) {
        self.state
            .lock()
            .expect("lock")
            .channels
            .push(ChannelInfo { id: id.to_owned(), name: name.to_owned() });
    }

    pub fn script_history(&self, messages: Vec<ChatMessage>) {
        self.state.lock().expect("lock").history = messages;
    }

    pub fn fail_posts(&self, fail: bool) {
        self.state.lock().expect("lock").fail_posts = fail;
    }

    pub fn posts(&self) -> Vec<PostedMessage> {
        self.state.lock().expect("lock").posts.clone()
    }

    pub fn updates(&self) -> Vec<UpdatedMessage> {
        self.state.lock().expect("lock").updates.clone()
    }

    pub fn reactions(&self) -> Vec<RecordedReaction> {
        self.state.lock().expect("lock").reactions.clone()
    }

    pub fn uploads(&self) -> Vec<(String, FileUpload)> {
        self.state.lock().expect("lock").uploads.clone()
    }

    fn next_ts(&self) -> String {
        let counter = self.ts_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("1700000000.{counter:06}")
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> Result<MessageHandle, TransportError> {
        let ts = self.next_ts();
        let mut state = self.state.lock().expect("lock");
        if state.fail_posts {
            return Err(TransportError::call("post_message", "scripted failure"));
        }
        state.posts.push(PostedMessage {
            channel: channel.to_owned(),
            text: text.to_owned(),
            blocks: blocks.map(<[Block]>::to_vec),
            thread_ts: thread_ts.map(str::to_owned),
            ts: ts.clone(),
        });
        Ok(MessageHandle { channel: channel.to_owned(), ts })
    }

    async fn update_message(
        &self,
        handle: &MessageHandle,
        text: &str,
        blocks: Option<&[Block]>,
    ) -> Result<(), TransportError> {
        self.state.lock().expect("lock").updates.push(UpdatedMessage {
            handle: handle.clone(),
            text: text.to_owned(),
            blocks: blocks.map(<[Block]>::to_vec),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        handle: &MessageHandle,
        name: &str,
    ) -> Result<(), TransportError> {
        self.state
            .lock()
            .expect("lock")
            .reactions
            .push(RecordedReaction { handle: handle.clone(), name: name.to_owned() });
        Ok(())
    }

    async fn upload_file(
        &self,
        channel: &str,
        upload: &FileUpload,
    ) -> Result<(), TransportError> {
        self.state.lock().expect("lock").uploads.push((channel.to_owned(), upload.clone()));
        Ok(())
    }

    async fn conversations_history(
        &self,
        _query: &HistoryQuery,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        Ok(self.state.lock().expect("lock").history.clone())
    }

    async fn auth_identity(&self) -> Result<String, TransportError> {
        Ok(self.bot_user_id.lock().expect("lock").clone())
    }

    async fn users_list(&self) -> Result<Vec<UserInfo>, TransportError> {
        Ok(self.state.lock().expect("lock").users.clone())
    }

    async fn channels_list(&self) -> Result<Vec<ChannelInfo>, TransportError> {
        Ok(self.state.lock().expect("lock").channels.clone())
    }
}
