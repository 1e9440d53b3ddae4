use std::time::Duration;

use async_trait::async_trait;
use bubbles_core::BotError;

/// A named unit of background work on a first-delay-then-interval schedule.
///
/// Invocations of one job are serialized on its worker; different jobs run
/// concurrently. A returned error is logged by the event loop and the
/// schedule continues.
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// Wait before the first invocation.
    fn initial_delay(&self) -> Duration;

    /// Wait between the start of consecutive invocations.
    fn interval(&self) -> Duration;

    async fn job(&self) -> Result<(), BotError>;
}
