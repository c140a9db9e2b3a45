use crate::domain::amount::Cents;
use crate::domain::operator::OperatorPolicy;
use crate::domain::payment::{CURRENCY_EUR, CreateIntentRequest, PaymentStatus, ReceiptResult};
use crate::domain::ports::{BackendClientArc, CredentialStoreArc, TerminalDriverArc};
use crate::error::{PosError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const UNKNOWN_ERROR: &str = "unknown error";
const RECEIPT_UNAVAILABLE: &str = "receipt could not be loaded";
const PAYMENT_CANCELLED: &str = "payment cancelled";

/// Drives one card payment at a time from intent creation to receipt.
///
/// Every accepted `start` runs on its own tokio task and ends with exactly one
/// `Success` or `Error` on the status feed. Dropping the orchestrator aborts a
/// payment that is still running.
pub struct PaymentOrchestrator {
    flow: Arc<PaymentFlow>,
    status: Arc<watch::Sender<PaymentStatus>>,
    in_flight: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct PaymentFlow {
    credentials: CredentialStoreArc,
    backend: BackendClientArc,
    terminal: TerminalDriverArc,
    policy: OperatorPolicy,
    device: String,
}

/// Holds the single in-flight slot; releasing it ends the attempt.
///
/// [`InFlightGuard::finish`] publishes the outcome and frees the slot under the
/// feed's lock, so a subscriber woken by a terminal status can start again
/// straight away. A guard dropped without finishing (task aborted or
/// panicked) moves the feed to `Error` instead.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
    status: Arc<watch::Sender<PaymentStatus>>,
    finished: bool,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>, status: &Arc<watch::Sender<PaymentStatus>>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: flag.clone(),
                status: status.clone(),
                finished: false,
            })
    }

    fn finish(mut self, outcome: PaymentStatus) {
        self.release(outcome);
        self.finished = true;
    }

    fn release(&self, outcome: PaymentStatus) {
        self.status.send_modify(|current| {
            *current = outcome;
            self.flag.store(false, Ordering::Release);
        });
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.status.borrow().is_terminal() {
            self.flag.store(false, Ordering::Release);
            return;
        }
        let message = if std::thread::panicking() {
            warn!("payment task panicked");
            UNKNOWN_ERROR
        } else {
            warn!("payment aborted before completion");
            PAYMENT_CANCELLED
        };
        self.release(PaymentStatus::Error(message.to_string()));
    }
}

impl PaymentOrchestrator {
    /// Wires the orchestrator to its collaborators.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Source of the logged-in user's name.
    /// * `backend` - Creates intents and looks up receipts.
    /// * `terminal` - Collects and processes the card payment.
    /// * `policy` - How the cashier name is determined for this deployment.
    /// * `device` - Readable name of this till, sent with every intent.
    pub fn new(
        credentials: CredentialStoreArc,
        backend: BackendClientArc,
        terminal: TerminalDriverArc,
        policy: OperatorPolicy,
        device: impl Into<String>,
    ) -> Self {
        let (status, _) = watch::channel(PaymentStatus::Idle);
        Self {
            flow: Arc::new(PaymentFlow {
                credentials,
                backend,
                terminal,
                policy,
                device: device.into(),
            }),
            status: Arc::new(status),
            in_flight: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PaymentStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status.borrow().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Starts a payment in the background.
    ///
    /// `operator` is only consulted under [`OperatorPolicy::FixedList`].
    /// Returns [`PosError::PaymentInFlight`] without touching the running
    /// payment when one is already in progress.
    pub fn start(&self, amount: Cents, item_label: &str, operator: Option<&str>) -> Result<()> {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        let guard =
            InFlightGuard::acquire(&self.in_flight, &self.status).ok_or(PosError::PaymentInFlight)?;

        self.status.send_replace(PaymentStatus::Idle);
        let flow = self.flow.clone();
        let status = self.status.clone();
        let item = item_label.to_string();
        let operator = operator.map(str::to_string);
        *task = Some(tokio::spawn(async move {
            let outcome = flow.execute(amount, &item, operator.as_deref(), &status).await;
            guard.finish(outcome);
        }));
        Ok(())
    }

    /// Starts a payment and waits for its final status.
    pub async fn run(
        &self,
        amount: Cents,
        item_label: &str,
        operator: Option<&str>,
    ) -> Result<PaymentStatus> {
        self.start(amount, item_label, operator)?;
        Ok(self.wait().await)
    }

    /// Waits for the running payment, if any, and returns the current status.
    pub async fn wait(&self) -> PaymentStatus {
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && e.is_panic()
        {
            warn!(error = %e, "payment task panicked");
        }
        self.status()
    }

    /// Aborts the running payment.
    ///
    /// Returns `true` when a payment was actually cut short; its status becomes
    /// `Error("payment cancelled")`.
    pub async fn cancel(&self) -> bool {
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(handle) = handle else {
            return false;
        };
        handle.abort();
        match handle.await {
            Err(e) if e.is_cancelled() => {
                info!("payment cancelled");
                true
            }
            _ => false,
        }
    }
}

impl Drop for PaymentOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl PaymentFlow {
    #[tracing::instrument(skip(self, amount, status), fields(amount = amount.value()))]
    async fn execute(
        &self,
        amount: Cents,
        item: &str,
        operator: Option<&str>,
        status: &watch::Sender<PaymentStatus>,
    ) -> PaymentStatus {
        match self.attempt(amount, item, operator, status).await {
            Ok(success) => success,
            Err(e) => {
                warn!(error = %e, "payment failed");
                PaymentStatus::Error(describe(&e, UNKNOWN_ERROR))
            }
        }
    }

    async fn attempt(
        &self,
        amount: Cents,
        item: &str,
        operator: Option<&str>,
        status: &watch::Sender<PaymentStatus>,
    ) -> Result<PaymentStatus> {
        let kassierer = self.resolve_operator(operator).await?;

        advance(status, PaymentStatus::CreatingIntent);
        let request = CreateIntentRequest {
            amount_cents: amount.value(),
            currency: CURRENCY_EUR.to_string(),
            item: item.to_string(),
            kassierer,
            device: self.device.clone(),
        };
        let created = self.backend.create_payment_intent(&request).await?;
        let intent = self.terminal.retrieve(&created.client_secret).await?;
        info!(intent_id = %intent.id, "payment intent created");
        let retrieved_amount = intent.amount_cents;

        advance(status, PaymentStatus::WaitingForTap);
        let collected = self.terminal.collect(intent).await?;

        advance(status, PaymentStatus::Processing);
        let processed = self.terminal.process(collected).await?;
        info!(intent_id = %processed.id, "payment processed");

        advance(status, PaymentStatus::FetchingReceipt);
        let receipt = self.fetch_receipt(&processed.id).await;

        Ok(PaymentStatus::Success {
            amount_cents: processed
                .amount_cents
                .or(retrieved_amount)
                .unwrap_or(amount.value()),
            intent_id: processed.id,
            receipt_url: receipt.url,
            receipt_error: receipt.error,
        })
    }

    async fn resolve_operator(&self, selected: Option<&str>) -> Result<String> {
        match &self.policy {
            OperatorPolicy::AuthenticatedUser => match self.credentials.current_user_name().await? {
                Some(name) if !name.trim().is_empty() => Ok(name),
                _ => Err(PosError::NotAuthenticated),
            },
            policy => policy.select(selected, &self.device),
        }
    }

    async fn fetch_receipt(&self, intent_id: &str) -> ReceiptResult {
        match self.backend.get_receipt(intent_id).await {
            Ok(url) => ReceiptResult::found(url),
            Err(e) => {
                warn!(error = %e, intent_id, "receipt lookup failed");
                ReceiptResult::failed(describe(&e, RECEIPT_UNAVAILABLE))
            }
        }
    }
}

fn advance(status: &watch::Sender<PaymentStatus>, next: PaymentStatus) {
    info!(status = ?next, "payment status");
    status.send_replace(next);
}

fn describe(error: &PosError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
