use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::Block;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("chat transport call `{method}` failed: {detail}")]
    Call { method: &'static str, detail: String },
    #[error("chat transport authentication failed: {0}")]
    Auth(String),
}

impl TransportError {
    pub fn call(method: &'static str, detail: impl Into<String>) -> Self {
        Self::Call { method, detail: detail.into() }
    }
}

impl From<TransportError> for bubbles_core::BotError {
    fn from(value: TransportError) -> Self {
        Self::TransportUnavailable(value.to_string())
    }
}

/// Address of a posted message, usable for edits and reactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageHandle {
    pub channel: String,
    pub ts: String,
}

/// One item from `conversations_history`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub user: Option<String>,
    pub text: String,
    pub ts: String,
    pub reply_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

/// Arguments for a file upload. Exactly one of `file` and `content` must be
/// set; the facade validates this before the transport is called.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileUpload {
    pub file: Option<PathBuf>,
    pub content: Option<String>,
    pub filetype: Option<String>,
    pub title: Option<String>,
    pub initial_comment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub channel: String,
    pub oldest: Option<String>,
    pub latest: Option<String>,
    pub limit: Option<u16>,
}

/// Outbound chat client contract.
///
/// Real deployments implement this over the workspace web API; tests and
/// credential-less startup use [`NoopTransport`] or the recording fake in
/// [`crate::testing`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> Result<MessageHandle, TransportError>;

    async fn update_message(
        &self,
        handle: &MessageHandle,
        text: &str,
        blocks: Option<&[Block]>,
    ) -> Result<(), TransportError>;

    async fn add_reaction(&self, handle: &MessageHandle, name: &str)
        -> Result<(), TransportError>;

    async fn upload_file(&self, channel: &str, upload: &FileUpload)
        -> Result<(), TransportError>;

    async fn conversations_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<ChatMessage>, TransportError>;

    /// Returns the authenticated bot user id.
    async fn auth_identity(&self) -> Result<String, TransportError>;

    async fn users_list(&self) -> Result<Vec<UserInfo>, TransportError>;

    async fn channels_list(&self) -> Result<Vec<ChannelInfo>, TransportError>;
}

/// Stub transport used when no workspace credentials are configured.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn post_message(
        &self,
        channel: &str,
        _text: &str,
        _blocks: Option<&[Block]>,
        _thread_ts: Option<&str>,
    ) -> Result<MessageHandle, TransportError> {
        Ok(MessageHandle { channel: channel.to_owned(), ts: "0000000000.000000".to_owned() })
    }

    async fn update_message(
        &self,
        _handle: &MessageHandle,
        _text: &str,
        _blocks: Option<&[Block]>,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn add_reaction(
        &self,
        _handle: &MessageHandle,
        _name: &str,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn upload_file(
        &self,
        _channel: &str,
        _upload: &FileUpload,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn conversations_history(
        &self,
        _query: &HistoryQuery,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        Ok(Vec::new())
    }

    async fn auth_identity(&self) -> Result<String, TransportError> {
        Ok("UNOOP".to_owned())
    }

    async fn users_list(&self) -> Result<Vec<UserInfo>, TransportError> {
        Ok(Vec::new())
    }

    async fn channels_list(&self) -> Result<Vec<ChannelInfo>, TransportError> {
        Ok(Vec::new())
    }
}
