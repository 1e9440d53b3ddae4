//! Backing-service clients: reddit, blossom, etsy, github, postgres.
//!
//! Each service is a trait with a real HTTP/database client and a no-op
//! stub. The [`factory::build_services`] entry point picks between them once
//! at startup from configuration; nothing downstream branches on the choice.

pub mod blossom;
pub mod error;
pub mod etsy;
pub mod factory;
pub mod github;
pub mod postgres;
pub mod reddit;

pub use error::ServiceError;
pub use factory::{build_services, ServiceSet};
pub use reddit::{ModmailConversation, RedditClient, StubRedditClient};
