use std::sync::Arc;

use bubbles_core::BotError;

use crate::blocks::{MessageBuilder, MessageTemplate};
use crate::transport::{ChatTransport, MessageHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    InProgress,
    Success,
    Failure,
}

/// Emoji shown next to a step in each status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusGlyphs {
    pub in_progress: String,
    pub success: String,
    pub failure: String,
}

impl Default for StatusGlyphs {
    fn default() -> Self {
        Self {
            in_progress: ":spinner:".to_owned(),
            success: ":heavy_check_mark:".to_owned(),
            failure: ":x:".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusStep {
    pub text: String,
    pub status: StepStatus,
    pub glyphs: StatusGlyphs,
}

impl StatusStep {
    fn render_line(&self) -> String {
        let glyph = match self.status {
            StepStatus::InProgress => &self.glyphs.in_progress,
            StepStatus::Success => &self.glyphs.success,
            StepStatus::Failure => &self.glyphs.failure,
        };
        format!("{glyph} {}", self.text)
    }
}

/// A posted message that is edited in place as labeled steps advance.
///
/// Every update replaces the full block list, so the visible message is
/// always a complete rendering of the current step sequence. The end-section
/// is transient: it appears only when supplied to the latest update call.
pub struct LongRunningMessage {
    transport: Arc<dyn ChatTransport>,
    channel: String,
    title: String,
    start_body: String,
    error_body: String,
    glyphs: StatusGlyphs,
    steps: Vec<StatusStep>,
    handle: Option<MessageHandle>,
    failed: bool,
}

impl LongRunningMessage {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        channel: impl Into<String>,
        title: impl Into<String>,
        start_body: impl Into<String>,
        error_body: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            channel: channel.into(),
            title: title.into(),
            start_body: start_body.into(),
            error_body: error_body.into(),
            glyphs: StatusGlyphs::default(),
            steps: Vec::new(),
            handle: None,
            failed: false,
        }
    }

    pub fn with_glyphs(mut self, glyphs: StatusGlyphs) -> Self {
        self.glyphs = glyphs;
        self
    }

    pub fn steps(&self) -> &[StatusStep] {
        &self.steps
    }

    /// Posts the initial message: title, start-body, divider, no steps yet.
    pub async fn start(&mut self) -> Result<(), BotError> {
        let message = self.render(None);
        let handle = self
            .transport
            .post_message(&self.channel, &message.fallback_text, Some(&message.blocks), None)
            .await?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Appends a step in the in-progress state and re-renders.
    pub async fn add_step(&mut self, text: impl Into<String>) -> Result<(), BotError> {
        self.steps.push(StatusStep {
            text: text.into(),
            status: StepStatus::InProgress,
            glyphs: self.glyphs.clone(),
        });
        self.push_update(None).await
    }

    /// Transitions the most-recently-added step to success. Idempotent.
    pub async fn step_succeeded(&mut self, end_text: Option<&str>) -> Result<(), BotError> {
        if let Some(step) = self.steps.last_mut() {
            step.status = StepStatus::Success;
        }
        self.push_update(end_text).await
    }

    /// Transitions the most recent step to failure. With `error` set, the
    /// body swaps from the start-body to the error-body.
    pub async fn step_failed(
        &mut self,
        end_text: Option<&str>,
        error: bool,
    ) -> Result<(), BotError> {
        if let Some(step) = self.steps.last_mut() {
            step.status = StepStatus::Failure;
        }
        if error {
            self.failed = true;
        }
        self.push_update(end_text).await
    }

    /// Bulk-transitions every step to success and re-renders.
    pub async fn set_all_success(&mut self) -> Result<(), BotError> {
        for step in &mut self.steps {
            step.status = StepStatus::Success;
        }
        self.push_update(None).await
    }

    /// Full rendering of the current state. Layout: header, body, divider,
    /// one section per step in insertion order, then the transient
    /// end-section when given.
    pub fn render(&self, end_text: Option<&str>) -> MessageTemplate {
        let body = if self.failed { &self.error_body } else { &self.start_body };
        let mut builder = MessageBuilder::new(format!("{}: {body}", self.title))
            .header("progress.title.v1", &self.title)
            .section("progress.body.v1", |section| {
                section.mrkdwn(body);
            })
            .divider("progress.divider.v1");

        for (position, step) in self.steps.iter().enumerate() {
            let line = step.render_line();
            builder = builder
                .section(format!("progress.step.{}.v1", position + 1), |section| {
                    section.mrkdwn(line);
                });
        }

        if let Some(end_text) = end_text {
            builder = builder
                .divider("progress.end_divider.v1")
                .context("progress.end.v1", |context| {
                    context.mrkdwn(end_text);
                });
        }

        builder.build()
    }

    async fn push_update(&self, end_text: Option<&str>) -> Result<(), BotError> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            BotError::Internal("long-running message was not started before an update".to_owned())
        })?;
        let message = self.render(end_text);
        self.transport
            .update_message(handle, &message.fallback_text, Some(&message.blocks))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bubbles_core::BotError;

    use super::{LongRunningMessage, StepStatus};
    use crate::blocks::{Block, TextObject};
    use crate::testing::RecordingTransport;

    fn message_under_test(transport: Arc<RecordingTransport>) -> LongRunningMessage {
        LongRunningMessage::new(transport, "C1", "Deploy", "Beginning…", "Failed…")
    }

    fn section_text(block: &Block) -> Option<&str> {
        match block {
            Block::Section { text, .. } => Some(text.text()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn deploy_walkthrough_renders_failure_body_steps_and_footer() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport.clone());

        progress.start().await.expect("start");
        progress.add_step("A").await.expect("add A");
        progress.step_succeeded(None).await.expect("A ok");
        progress.add_step("B").await.expect("add B");
        progress.step_failed(Some("rolled back"), true).await.expect("B failed");

        let updates = transport.updates();
        assert_eq!(updates.len(), 4);
        let blocks = updates.last().unwrap().blocks.as_ref().expect("blocks");

        assert!(matches!(
            &blocks[0],
            Block::Header { text: TextObject::Plain { text }, .. } if text == "Deploy"
        ));
        assert_eq!(section_text(&blocks[1]), Some("Failed…"));
        assert!(matches!(&blocks[2], Block::Divider { .. }));
        assert_eq!(section_text(&blocks[3]), Some(":heavy_check_mark: A"));
        assert_eq!(section_text(&blocks[4]), Some(":x: B"));
        assert!(matches!(&blocks[5], Block::Divider { .. }));
        assert!(matches!(
            &blocks[6],
            Block::Context { elements, .. }
                if matches!(&elements[0], TextObject::Mrkdwn { text } if text == "rolled back")
        ));
        assert_eq!(blocks.len(), 7);
    }

    #[tokio::test]
    async fn initial_post_has_no_steps_and_no_end_section() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport.clone());
        progress.start().await.expect("start");

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        let blocks = posts[0].blocks.as_ref().expect("blocks");
        // header, start-body, divider and nothing else yet
        assert_eq!(blocks.len(), 3);
        assert_eq!(section_text(&blocks[1]), Some("Beginning…"));
    }

    #[tokio::test]
    async fn end_section_is_transient_across_updates() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport.clone());
        progress.start().await.expect("start");
        progress.add_step("fetch").await.expect("add");
        progress.step_succeeded(Some("all done")).await.expect("succeed");
        progress.add_step("verify").await.expect("add");

        let updates = transport.updates();
        let with_end = updates[1].blocks.as_ref().expect("blocks");
        assert!(with_end.iter().any(|block| matches!(block, Block::Context { .. })));
        let without_end = updates[2].blocks.as_ref().expect("blocks");
        assert!(!without_end.iter().any(|block| matches!(block, Block::Context { .. })));
    }

    #[tokio::test]
    async fn success_and_failure_transitions_are_idempotent() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport.clone());
        progress.start().await.expect("start");
        progress.add_step("only step").await.expect("add");
        progress.step_succeeded(None).await.expect("first");
        progress.step_succeeded(None).await.expect("second");

        assert_eq!(progress.steps().len(), 1);
        assert_eq!(progress.steps()[0].status, StepStatus::Success);
    }

    #[tokio::test]
    async fn set_all_success_transitions_every_step() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport.clone());
        progress.start().await.expect("start");
        progress.add_step("one").await.expect("add");
        progress.add_step("two").await.expect("add");
        progress.set_all_success().await.expect("bulk");

        assert!(progress.steps().iter().all(|step| step.status == StepStatus::Success));
        let blocks = transport.updates().last().unwrap().blocks.clone().expect("blocks");
        assert_eq!(section_text(&blocks[3]), Some(":heavy_check_mark: one"));
        assert_eq!(section_text(&blocks[4]), Some(":heavy_check_mark: two"));
    }

    #[tokio::test]
    async fn updating_before_start_is_an_internal_error() {
        let transport = Arc::new(RecordingTransport::new());
        let mut progress = message_under_test(transport);
        assert!(matches!(progress.add_step("A").await, Err(BotError::Internal(_))));
    }
}
