#![allow(dead_code)]

use async_trait::async_trait;
use clubpay::application::orchestrator::PaymentOrchestrator;
use clubpay::domain::operator::OperatorPolicy;
use clubpay::domain::payment::{CreateIntentRequest, CreatedIntent, IntentStatus, PaymentIntent};
use clubpay::domain::ports::{BackendClient, Session, TerminalDriver};
use clubpay::error::{PosError, Result, TerminalError, TerminalErrorCode};
use clubpay::infrastructure::in_memory::InMemoryCredentialStore;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const DEVICE: &str = "till-1";

/// Backend double that records every call.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<&'static str>>,
    pub intents: Mutex<Vec<CreateIntentRequest>>,
    pub fail_create: Option<String>,
    pub fail_receipt: Option<String>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_intent(&self) -> Option<CreateIntentRequest> {
        self.intents.lock().unwrap().last().cloned()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<Session> {
        self.record("login");
        if password == "secret" {
            Ok(Session {
                token: format!("tok-{username}"),
                display_name: username.to_string(),
            })
        } else {
            Err(PosError::Authentication("invalid username or password".to_string()))
        }
    }

    async fn create_connection_token(&self) -> Result<String> {
        self.record("create_connection_token");
        Ok("pst_test".to_string())
    }

    async fn create_payment_intent(&self, request: &CreateIntentRequest) -> Result<CreatedIntent> {
        self.record("create_payment_intent");
        self.intents.lock().unwrap().push(request.clone());
        if let Some(message) = &self.fail_create {
            return Err(PosError::Backend {
                status: 403,
                message: message.clone(),
            });
        }
        let n = self.intents.lock().unwrap().len();
        Ok(CreatedIntent {
            id: format!("pi_{n}"),
            client_secret: format!("pi_{n}_secret_test"),
            amount_cents: request.amount_cents,
        })
    }

    async fn get_receipt(&self, intent_id: &str) -> Result<String> {
        self.record("get_receipt");
        match &self.fail_receipt {
            Some(message) => Err(PosError::Backend {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(format!("https://receipts.example/{intent_id}")),
        }
    }
}

/// Terminal double with scripted failures and an optional hold on collect.
#[derive(Default)]
pub struct ScriptedTerminal {
    pub calls: Mutex<Vec<&'static str>>,
    pub fail_at: Option<(&'static str, TerminalError)>,
    pub retrieved_amount: Option<u32>,
    pub processed_amount: Option<u32>,
    /// When set, `collect` waits for a notification before returning.
    pub hold_collect: Option<Arc<Notify>>,
    /// When set, `collect` panics like a crashing reader driver.
    pub panic_on_collect: bool,
}

impl ScriptedTerminal {
    pub fn failing_at(step: &'static str, code: TerminalErrorCode, message: &str) -> Self {
        Self {
            fail_at: Some((step, TerminalError::new(code, message))),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn step(&self, name: &'static str) -> std::result::Result<(), TerminalError> {
        self.calls.lock().unwrap().push(name);
        match &self.fail_at {
            Some((step, error)) if *step == name => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TerminalDriver for ScriptedTerminal {
    async fn retrieve(&self, client_secret: &str) -> std::result::Result<PaymentIntent, TerminalError> {
        self.step("retrieve")?;
        let id = client_secret
            .split_once("_secret_")
            .map(|(id, _)| id.to_string())
            .unwrap_or_default();
        Ok(PaymentIntent {
            id,
            client_secret: client_secret.to_string(),
            amount_cents: self.retrieved_amount,
            currency: "eur".to_string(),
            status: IntentStatus::RequiresPaymentMethod,
        })
    }

    async fn collect(&self, mut intent: PaymentIntent) -> std::result::Result<PaymentIntent, TerminalError> {
        if let Some(gate) = &self.hold_collect {
            gate.notified().await;
        }
        self.step("collect")?;
        if self.panic_on_collect {
            panic!("reader driver crashed");
        }
        intent.status = IntentStatus::RequiresConfirmation;
        Ok(intent)
    }

    async fn process(&self, mut intent: PaymentIntent) -> std::result::Result<PaymentIntent, TerminalError> {
        self.step("process")?;
        intent.status = IntentStatus::Succeeded;
        if self.processed_amount.is_some() {
            intent.amount_cents = self.processed_amount;
        }
        Ok(intent)
    }
}

pub struct Harness {
    pub credentials: Arc<InMemoryCredentialStore>,
    pub backend: Arc<FakeBackend>,
    pub terminal: Arc<ScriptedTerminal>,
    pub orchestrator: PaymentOrchestrator,
}

pub fn harness(backend: FakeBackend, terminal: ScriptedTerminal, policy: OperatorPolicy) -> Harness {
    let credentials = Arc::new(InMemoryCredentialStore::with_credentials("tok-anna", "Anna"));
    harness_with(credentials, backend, terminal, policy)
}

pub fn harness_with(
    credentials: Arc<InMemoryCredentialStore>,
    backend: FakeBackend,
    terminal: ScriptedTerminal,
    policy: OperatorPolicy,
) -> Harness {
    let backend = Arc::new(backend);
    let terminal = Arc::new(terminal);
    let orchestrator = PaymentOrchestrator::new(
        credentials.clone(),
        backend.clone(),
        terminal.clone(),
        policy,
        DEVICE,
    );
    Harness {
        credentials,
        backend,
        terminal,
        orchestrator,
    }
}
