use serde::{Deserialize, Serialize};

pub const CURRENCY_EUR: &str = "eur";

/// A charge tracked by both the backend and the terminal.
///
/// `amount_cents` is `None` until the terminal has reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: Option<u32>,
    pub currency: String,
    pub status: IntentStatus,
}

/// Lifecycle of an intent as seen by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntentStatus {
    #[default]
    RequiresPaymentMethod,
    RequiresConfirmation,
    Succeeded,
}

/// Request body for `POST /pos/create_intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateIntentRequest {
    pub amount_cents: u32,
    pub currency: String,
    pub item: String,
    pub kassierer: String,
    pub device: String,
}

/// Response body for `POST /pos/create_intent`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: u32,
}

/// Outcome of the receipt lookup attached to a successful payment.
///
/// At most one of `url` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiptResult {
    pub url: Option<String>,
    pub error: Option<String>,
}

impl ReceiptResult {
    pub fn found(url: String) -> Self {
        Self {
            url: Some(url),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            url: None,
            error: Some(error),
        }
    }
}

/// The phase of the payment currently shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Idle,
    CreatingIntent,
    WaitingForTap,
    Processing,
    FetchingReceipt,
    Success {
        amount_cents: u32,
        intent_id: String,
        receipt_url: Option<String>,
        receipt_error: Option<String>,
    },
    Error(String),
}

impl PaymentStatus {
    /// `Success` and `Error` end a payment attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error(_))
    }
}

/// State of the login form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoginStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}
