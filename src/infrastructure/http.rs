use crate::domain::payment::{CreateIntentRequest, CreatedIntent};
use crate::domain::ports::{BackendClient, CredentialStoreArc, Session};
use crate::error::{PosError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionTokenResponse {
    secret: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptResponse {
    receipt_url: Option<String>,
}

/// Error body returned by the backend for every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// REST client for the club backend.
///
/// The bearer token is read from the credential store on every request, so a
/// login or logout takes effect on the next call.
#[derive(Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: CredentialStoreArc,
}

impl HttpBackendClient {
    pub fn new(base_url: Url, credentials: CredentialStoreArc, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PosError::Config(format!("invalid endpoint {path}: {e}")))
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.credentials.current_token().await? {
            Some(token) if !token.trim().is_empty() => request.bearer_auth(token),
            _ => request,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!(url = %response.url(), status = %response.status(), "backend response");
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(PosError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let url = self.endpoint("/auth/login")?;
        tracing::debug!(%url, username, "login request");
        let request = self
            .client
            .post(url)
            .json(&LoginRequest { username, password });

        let response: LoginResponse = self.send(request).await.map_err(|e| match e {
            PosError::Authentication(message) => PosError::Authentication(message),
            other => PosError::Authentication(other.to_string()),
        })?;
        Ok(Session {
            token: response.token,
            display_name: response.display_name,
        })
    }

    async fn create_connection_token(&self) -> Result<String> {
        let url = self.endpoint("/terminal/connection_token")?;
        tracing::debug!(%url, "connection token request");
        let request = self.authorized(self.client.post(url)).await?;
        let response: ConnectionTokenResponse = self.send(request).await?;
        Ok(response.secret)
    }

    async fn create_payment_intent(&self, request: &CreateIntentRequest) -> Result<CreatedIntent> {
        let url = self.endpoint("/pos/create_intent")?;
        tracing::debug!(
            %url,
            amount_cents = request.amount_cents,
            item = %request.item,
            kassierer = %request.kassierer,
            device = %request.device,
            "create intent request"
        );
        let builder = self.authorized(self.client.post(url).json(request)).await?;
        self.send(builder).await
    }

    async fn get_receipt(&self, intent_id: &str) -> Result<String> {
        let mut url = self.endpoint("/pos/receipt/")?;
        url.path_segments_mut()
            .map_err(|_| PosError::Config(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push(intent_id);
        tracing::debug!(%url, "receipt request");

        let request = self.authorized(self.client.get(url)).await?;
        let response: ReceiptResponse = self.send(request).await?;
        response
            .receipt_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PosError::Backend {
                status: 200,
                message: "receipt not available".to_string(),
            })
    }
}
