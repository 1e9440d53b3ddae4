use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::transport::{ChatTransport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub username: String,
}

/// Guarded cache for the bot's own identity and the workspace user
/// directory. The first access populates each cell; later readers observe
/// the settled value. Bootstrap may prefill the identity so event handling
/// never waits on an auth round trip.
pub struct IdentityCache {
    transport: Arc<dyn ChatTransport>,
    configured_username: String,
    identity: OnceCell<BotIdentity>,
    users: OnceCell<HashMap<String, String>>,
}

impl IdentityCache {
    pub fn new(transport: Arc<dyn ChatTransport>, configured_username: impl Into<String>) -> Self {
        Self {
            transport,
            configured_username: configured_username.into(),
            identity: OnceCell::new(),
            users: OnceCell::new(),
        }
    }

    pub fn prefilled(
        transport: Arc<dyn ChatTransport>,
        identity: BotIdentity,
    ) -> Self {
        let cache = Self::new(transport, identity.username.clone());
        // A fresh cell cannot already be set.
        let _ = cache.identity.set(identity);
        cache
    }

    pub async fn identity(&self) -> Result<&BotIdentity, TransportError> {
        self.identity
            .get_or_try_init(|| async {
                let user_id = self.transport.auth_identity().await?;
                let username = match self.lookup(&user_id).await? {
                    Some(name) => name,
                    None => self.configured_username.clone(),
                };
                Ok(BotIdentity { user_id, username })
            })
            .await
    }

    /// Display name for a workspace user id, from the cached directory.
    pub async fn username_for(&self, user_id: &str) -> Result<Option<String>, TransportError> {
        Ok(self.lookup(user_id).await?)
    }

    async fn lookup(&self, user_id: &str) -> Result<Option<String>, TransportError> {
        let users = self
            .users
            .get_or_try_init(|| async {
                let listed = self.transport.users_list().await?;
                Ok::<_, TransportError>(
                    listed.into_iter().map(|user| (user.id, user.name)).collect(),
                )
            })
            .await?;
        Ok(users.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{BotIdentity, IdentityCache};
    use crate::blocks::Block;
    use crate::transport::{
        ChatMessage, ChannelInfo, ChatTransport, FileUpload, HistoryQuery, MessageHandle,
        TransportError, UserInfo,
    };

    #[derive(Default)]
    struct CountingTransport {
        auth_calls: AtomicUsize,
        users_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for CountingTransport {
        async fn post_message(
            &self,
            channel: &str,
            _text: &str,
            _blocks: Option<&[Block]>,
            _thread_ts: Option<&str>,
        ) -> Result<MessageHandle, TransportError> {
            Ok(MessageHandle { channel: channel.to_owned(), ts: "1.0".to_owned() })
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
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            Ok("U123".to_owned())
        }

        async fn users_list(&self) -> Result<Vec<UserInfo>, TransportError> {
            self.users_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![UserInfo { id: "U123".to_owned(), name: "bubbles".to_owned() }])
        }

        async fn channels_list(&self) -> Result<Vec<ChannelInfo>, TransportError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn identity_is_fetched_once_and_memoized() {
        let transport = Arc::new(CountingTransport::default());
        let cache = IdentityCache::new(transport.clone(), "fallback-name");

        let first = cache.identity().await.expect("identity").clone();
        let second = cache.identity().await.expect("identity").clone();
        assert_eq!(first, second);
        assert_eq!(first.user_id, "U123");
        assert_eq!(first.username, "bubbles");
        assert_eq!(transport.auth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.users_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prefilled_identity_never_hits_the_transport() {
        let transport = Arc::new(CountingTransport::default());
        let cache = IdentityCache::prefilled(
            transport.clone(),
            BotIdentity { user_id: "U999".to_owned(), username: "bubbles".to_owned() },
        );

        let identity = cache.identity().await.expect("identity");
        assert_eq!(identity.user_id, "U999");
        assert_eq!(transport.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn user_directory_is_cached_across_lookups() {
        let transport = Arc::new(CountingTransport::default());
        let cache = IdentityCache::new(transport.clone(), "bubbles");

        assert_eq!(cache.username_for("U123").await.expect("lookup").as_deref(), Some("bubbles"));
        assert_eq!(cache.username_for("UNKNOWN").await.expect("lookup"), None);
        assert_eq!(transport.users_calls.load(Ordering::SeqCst), 1);
    }
}
