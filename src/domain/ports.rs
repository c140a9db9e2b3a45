use super::credentials::Credentials;
use super::payment::{CreateIntentRequest, CreatedIntent, PaymentIntent};
use crate::error::{ConnectionTokenError, Result, TerminalError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Persists the logged-in user's token and display name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<Credentials>>;
    /// Live view of the stored credentials; starts with the current value.
    fn subscribe(&self) -> watch::Receiver<Option<Credentials>>;
    async fn set(&self, token: &str, display_name: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;

    async fn current_token(&self) -> Result<Option<String>> {
        Ok(self.get().await?.map(|c| c.token().to_string()))
    }

    async fn current_user_name(&self) -> Result<Option<String>> {
        Ok(self.get().await?.map(|c| c.display_name().to_string()))
    }
}

/// Login result returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub display_name: String,
}

/// The club backend's REST API.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Session>;
    async fn create_connection_token(&self) -> Result<String>;
    async fn create_payment_intent(&self, request: &CreateIntentRequest) -> Result<CreatedIntent>;
    async fn get_receipt(&self, intent_id: &str) -> Result<String>;
}

/// Card-present terminal operations, each resolving exactly once.
#[async_trait]
pub trait TerminalDriver: Send + Sync {
    async fn retrieve(&self, client_secret: &str) -> std::result::Result<PaymentIntent, TerminalError>;
    async fn collect(&self, intent: PaymentIntent) -> std::result::Result<PaymentIntent, TerminalError>;
    async fn process(&self, intent: PaymentIntent) -> std::result::Result<PaymentIntent, TerminalError>;
}

/// Supplies the terminal session with fresh connection tokens on demand.
#[async_trait]
pub trait ConnectionTokenProvider: Send + Sync {
    async fn fetch_connection_token(&self) -> std::result::Result<String, ConnectionTokenError>;
}

pub type CredentialStoreArc = Arc<dyn CredentialStore>;
pub type BackendClientArc = Arc<dyn BackendClient>;
pub type TerminalDriverArc = Arc<dyn TerminalDriver>;
pub type ConnectionTokenProviderArc = Arc<dyn ConnectionTokenProvider>;
