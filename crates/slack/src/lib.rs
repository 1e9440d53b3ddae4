//! Slack-facing layer for Bubbles.
//!
//! This crate owns everything between a raw chat event and a plugin:
//! - **Transport** (`transport`) - the outbound client contract plus a no-op stub
//! - **Payload** (`payload`) - immutable snapshot of one inbound event
//! - **Utilities** (`utils`) - per-event facade: respond, say, react, upload
//! - **Block Kit** (`blocks`) - typed message block builders
//! - **Progress** (`progress`) - a posted message edited in place as steps advance
//! - **Socket Mode** (`socket`) - envelope pump with reconnection logic
//!
//! The HTTP layer of the transport itself is an external collaborator; real
//! deployments plug in a client satisfying [`transport::ChatTransport`].

pub mod blocks;
pub mod identity;
pub mod payload;
pub mod progress;
pub mod socket;
pub mod testing;
pub mod transport;
pub mod utils;
