use crate::domain::credentials::Credentials;
use crate::domain::ports::CredentialStore;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// A thread-safe in-memory credential store.
///
/// The current value lives in a `watch` channel, so every subscriber sees the
/// latest credentials. Nothing survives a restart; useful for tests and
/// throw-away sessions.
#[derive(Clone)]
pub struct InMemoryCredentialStore {
    state: Arc<watch::Sender<Option<Credentials>>>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    /// Creates an empty store (logged out).
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates a store that starts logged in.
    pub fn with_credentials(token: &str, display_name: &str) -> Self {
        let store = Self::new();
        store.state.send_replace(Credentials::new(token, display_name));
        store
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self) -> Result<Option<Credentials>> {
        Ok(self.state.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.state.subscribe()
    }

    async fn set(&self, token: &str, display_name: &str) -> Result<()> {
        self.state.send_replace(Credentials::new(token, display_name));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.state.send_replace(None);
        Ok(())
    }
}
