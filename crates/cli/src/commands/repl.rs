use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bubbles_plugins::EventRouter;
use bubbles_slack::blocks::Block;
use bubbles_slack::payload::Payload;
use bubbles_slack::transport::{
    ChannelInfo, ChatMessage, ChatTransport, FileUpload, HistoryQuery, MessageHandle,
    TransportError, UserInfo,
};
use tokio::io::AsyncBufReadExt;

use crate::commands::run::LOCAL_BOT_USER_ID;

const CONSOLE_USER_ID: &str = "UCONSOLE";

/// Chat transport for the interactive shell. Outbound traffic is printed to
/// stdout instead of being sent anywhere; timestamps are a local counter so
/// handles stay usable for updates and reactions within the session.
pub struct ConsoleTransport {
    clock: AtomicU64,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self { clock: AtomicU64::new(1) }
    }

    fn next_ts(&self) -> String {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        format!("{tick}.000000")
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        _blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> Result<MessageHandle, TransportError> {
        match thread_ts {
            Some(parent) => println!("[#{channel}] bot (in thread {parent}): {text}"),
            None => println!("[#{channel}] bot: {text}"),
        }
        Ok(MessageHandle { channel: channel.to_owned(), ts: self.next_ts() })
    }

    async fn update_message(
        &self,
        handle: &MessageHandle,
        text: &str,
        _blocks: Option<&[Block]>,
    ) -> Result<(), TransportError> {
        println!("[#{}] bot (edit of {}): {text}", handle.channel, handle.ts);
        Ok(())
    }

    async fn add_reaction(
        &self,
        handle: &MessageHandle,
        name: &str,
    ) -> Result<(), TransportError> {
        println!("[#{}] bot reacted :{name}: to {}", handle.channel, handle.ts);
        Ok(())
    }

    async fn upload_file(
        &self,
        channel: &str,
        upload: &FileUpload,
    ) -> Result<(), TransportError> {
        let label = upload.title.as_deref().unwrap_or("attachment");
        println!("[#{channel}] bot uploaded `{label}`");
        Ok(())
    }

    async fn conversations_history(
        &self,
        _query: &HistoryQuery,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        Ok(Vec::new())
    }

    async fn auth_identity(&self) -> Result<String, TransportError> {
        Ok(LOCAL_BOT_USER_ID.to_owned())
    }

    async fn users_list(&self) -> Result<Vec<UserInfo>, TransportError> {
        Ok(vec![UserInfo { id: CONSOLE_USER_ID.to_owned(), name: "console".to_owned() }])
    }

    async fn channels_list(&self) -> Result<Vec<ChannelInfo>, TransportError> {
        Ok(Vec::new())
    }
}

/// Reads lines from stdin and feeds them through the event router as if they
/// arrived from the workspace. `exit` or `quit` ends the session, and a line
/// of the form `+:emoji:` reacts to the previous typed message.
pub async fn run_console(router: Arc<EventRouter>, prefix: &str, channel: &str) -> Result<()> {
    println!("bubbles interactive shell. Type `{prefix}help` for commands, `exit` to leave.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut tick: u64 = 1;
    let mut last_message_ts: Option<String> = None;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some(reaction) = parse_reaction(line) {
            match &last_message_ts {
                Some(ts) => {
                    let payload =
                        Payload::reaction_added(channel, CONSOLE_USER_ID, reaction, ts.clone());
                    router.route(payload).await;
                }
                None => println!("(no previous message to react to)"),
            }
            continue;
        }

        let ts = format!("{tick}.100000");
        tick += 1;
        let payload = Payload::message(channel, CONSOLE_USER_ID, line, ts.clone());
        last_message_ts = Some(ts);
        router.route(payload).await;
    }

    Ok(())
}

fn parse_reaction(line: &str) -> Option<&str> {
    let body = line.strip_prefix("+:")?.strip_suffix(':')?;
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}
