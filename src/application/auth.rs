use crate::domain::credentials::Credentials;
use crate::domain::payment::LoginStatus;
use crate::domain::ports::{BackendClientArc, CredentialStoreArc};
use crate::error::{PosError, Result};
use tokio::sync::watch;
use tracing::{info, warn};

const LOGIN_FAILED: &str = "login failed";

/// Login and logout commands for the till, with a status feed for the form.
pub struct AuthService {
    credentials: CredentialStoreArc,
    backend: BackendClientArc,
    status: watch::Sender<LoginStatus>,
}

impl AuthService {
    pub fn new(credentials: CredentialStoreArc, backend: BackendClientArc) -> Self {
        let (status, _) = watch::channel(LoginStatus::Idle);
        Self {
            credentials,
            backend,
            status,
        }
    }

    pub fn login_status(&self) -> watch::Receiver<LoginStatus> {
        self.status.subscribe()
    }

    pub fn credentials(&self) -> watch::Receiver<Option<Credentials>> {
        self.credentials.subscribe()
    }

    /// Authenticates against the backend and stores the session.
    ///
    /// On failure the login status carries the error message and the stored
    /// credentials are left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        self.status.send_replace(LoginStatus::Loading);
        match self.authenticate(username, password).await {
            Ok(credentials) => {
                info!(user = %credentials.display_name(), "logged in");
                self.status.send_replace(LoginStatus::Idle);
                Ok(credentials)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    LOGIN_FAILED.to_string()
                } else {
                    message
                };
                self.status.send_replace(LoginStatus::Error(message));
                Err(e)
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Credentials> {
        let username = username.trim();
        if username.is_empty() {
            return Err(PosError::Authentication("username is required".to_string()));
        }
        if password.trim().is_empty() {
            return Err(PosError::Authentication("password is required".to_string()));
        }

        let session = self.backend.login(username, password).await?;
        let credentials = Credentials::new(session.token, session.display_name).ok_or_else(|| {
            PosError::Authentication("backend returned an incomplete session".to_string())
        })?;
        self.credentials
            .set(credentials.token(), credentials.display_name())
            .await?;
        Ok(credentials)
    }

    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear().await?;
        self.status.send_replace(LoginStatus::Idle);
        info!("logged out");
        Ok(())
    }
}
