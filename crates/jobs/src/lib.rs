//! Periodic background jobs and the worker supervisor that runs them.

pub mod event_loop;
pub mod job;
pub mod modmail;
pub mod rule_monitor;
pub mod welcome;

pub use event_loop::EventLoop;
pub use job::PeriodicJob;
pub use modmail::ModmailJob;
pub use rule_monitor::RuleMonitorJob;
pub use welcome::WelcomePingJob;
