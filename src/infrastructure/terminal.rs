use crate::domain::payment::{IntentStatus, PaymentIntent};
use crate::domain::ports::{
    BackendClientArc, ConnectionTokenProvider, ConnectionTokenProviderArc, TerminalDriver,
};
use crate::error::{ConnectionTokenError, TerminalError, TerminalErrorCode};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{OnceCell, oneshot};
use tracing::{debug, info};

type IntentResult = Result<PaymentIntent, TerminalError>;

/// Fetches a fresh connection token from the backend on every request.
///
/// Holds no state besides the client, so concurrent calls are independent.
pub struct BackendConnectionTokenProvider {
    backend: BackendClientArc,
}

impl BackendConnectionTokenProvider {
    pub fn new(backend: BackendClientArc) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ConnectionTokenProvider for BackendConnectionTokenProvider {
    async fn fetch_connection_token(&self) -> Result<String, ConnectionTokenError> {
        self.backend
            .create_connection_token()
            .await
            .map_err(|e| ConnectionTokenError {
                source: Box::new(e),
            })
    }
}

/// One-shot completion handed to a callback-style terminal SDK.
///
/// Both methods consume the callback, so it resolves at most once. Dropping it
/// unresolved fails the awaiting call; resolving it after the caller went away
/// is a no-op.
pub struct IntentCallback {
    tx: oneshot::Sender<IntentResult>,
}

impl IntentCallback {
    fn channel() -> (Self, oneshot::Receiver<IntentResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn on_success(self, intent: PaymentIntent) {
        if self.tx.send(Ok(intent)).is_err() {
            debug!("terminal result arrived after the caller stopped waiting");
        }
    }

    pub fn on_failure(self, error: TerminalError) {
        if self.tx.send(Err(error)).is_err() {
            debug!("terminal failure arrived after the caller stopped waiting");
        }
    }
}

/// The callback surface of a vendor terminal SDK.
pub trait TerminalSdk: Send + Sync {
    fn retrieve_payment_intent(&self, client_secret: &str, callback: IntentCallback);
    fn collect_payment_method(&self, intent: PaymentIntent, callback: IntentCallback);
    fn process_payment(&self, intent: PaymentIntent, callback: IntentCallback);
}

/// Exposes a callback-style [`TerminalSdk`] as an awaitable [`TerminalDriver`].
pub struct CallbackTerminal<S> {
    sdk: S,
}

impl<S: TerminalSdk> CallbackTerminal<S> {
    pub fn new(sdk: S) -> Self {
        Self { sdk }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }
}

async fn settle(rx: oneshot::Receiver<IntentResult>) -> IntentResult {
    rx.await.unwrap_or_else(|_| {
        Err(TerminalError::new(
            TerminalErrorCode::Unexpected,
            "terminal dropped the request without a result",
        ))
    })
}

#[async_trait]
impl<S: TerminalSdk> TerminalDriver for CallbackTerminal<S> {
    async fn retrieve(&self, client_secret: &str) -> IntentResult {
        let (callback, rx) = IntentCallback::channel();
        self.sdk.retrieve_payment_intent(client_secret, callback);
        settle(rx).await
    }

    async fn collect(&self, intent: PaymentIntent) -> IntentResult {
        let (callback, rx) = IntentCallback::channel();
        self.sdk.collect_payment_method(intent, callback);
        settle(rx).await
    }

    async fn process(&self, intent: PaymentIntent) -> IntentResult {
        let (callback, rx) = IntentCallback::channel();
        self.sdk.process_payment(intent, callback);
        settle(rx).await
    }
}

/// An in-process card reader for running the till without hardware.
///
/// The reader opens its session with a connection token on first use, waits
/// `tap_delay` for the simulated card, and can be told to decline the next
/// card.
#[derive(Clone)]
pub struct SimulatedReader {
    tokens: ConnectionTokenProviderArc,
    session: Arc<OnceCell<String>>,
    decline_next: Arc<AtomicBool>,
    tap_delay: Duration,
    location: Option<String>,
}

impl SimulatedReader {
    pub fn new(tokens: ConnectionTokenProviderArc, location: Option<String>) -> Self {
        Self {
            tokens,
            session: Arc::new(OnceCell::new()),
            decline_next: Arc::new(AtomicBool::new(false)),
            tap_delay: Duration::from_millis(200),
            location,
        }
    }

    pub fn with_tap_delay(mut self, tap_delay: Duration) -> Self {
        self.tap_delay = tap_delay;
        self
    }

    /// Makes the next collected card fail as declined.
    pub fn decline_next_card(&self) {
        self.decline_next.store(true, Ordering::Release);
    }

    async fn connect(&self) -> Result<(), TerminalError> {
        self.session
            .get_or_try_init(|| async {
                let token = self.tokens.fetch_connection_token().await.map_err(|e| {
                    TerminalError::new(TerminalErrorCode::ConnectionToken, format!("{e}: {}", e.source))
                })?;
                info!(location = ?self.location, "simulated reader connected");
                Ok::<_, TerminalError>(token)
            })
            .await
            .map(|_| ())
    }
}

/// Splits the intent id off a client secret of the form `<id>_secret_<rest>`.
fn intent_id_from_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

impl TerminalSdk for SimulatedReader {
    fn retrieve_payment_intent(&self, client_secret: &str, callback: IntentCallback) {
        let reader = self.clone();
        let client_secret = client_secret.to_string();
        tokio::spawn(async move {
            if let Err(e) = reader.connect().await {
                return callback.on_failure(e);
            }
            match intent_id_from_secret(&client_secret) {
                Some(id) => callback.on_success(PaymentIntent {
                    id: id.to_string(),
                    client_secret: client_secret.clone(),
                    amount_cents: None,
                    currency: crate::domain::payment::CURRENCY_EUR.to_string(),
                    status: IntentStatus::RequiresPaymentMethod,
                }),
                None => callback.on_failure(TerminalError::new(
                    TerminalErrorCode::Unexpected,
                    "invalid client secret",
                )),
            }
        });
    }

    fn collect_payment_method(&self, mut intent: PaymentIntent, callback: IntentCallback) {
        let reader = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(reader.tap_delay).await;
            if reader.decline_next.swap(false, Ordering::AcqRel) {
                return callback.on_failure(TerminalError::new(
                    TerminalErrorCode::Declined,
                    "card declined",
                ));
            }
            intent.status = IntentStatus::RequiresConfirmation;
            callback.on_success(intent);
        });
    }

    fn process_payment(&self, mut intent: PaymentIntent, callback: IntentCallback) {
        tokio::spawn(async move {
            if intent.status != IntentStatus::RequiresConfirmation {
                return callback.on_failure(TerminalError::new(
                    TerminalErrorCode::Unexpected,
                    "payment method has not been collected",
                ));
            }
            intent.status = IntentStatus::Succeeded;
            callback.on_success(intent);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PosError;
    use std::sync::atomic::AtomicUsize;

    struct CountingTokens {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ConnectionTokenProvider for CountingTokens {
        async fn fetch_connection_token(&self) -> Result<String, ConnectionTokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ConnectionTokenError {
                    source: Box::new(PosError::Backend {
                        status: 500,
                        message: "stripe unavailable".to_string(),
                    }),
                })
            } else {
                Ok(format!("pst_{n}"))
            }
        }
    }

    fn reader(fail: bool) -> (Arc<CountingTokens>, CallbackTerminal<SimulatedReader>) {
        let tokens = Arc::new(CountingTokens {
            calls: AtomicUsize::new(0),
            fail,
        });
        let reader = SimulatedReader::new(tokens.clone(), None).with_tap_delay(Duration::ZERO);
        (tokens, CallbackTerminal::new(reader))
    }

    #[test]
    fn test_intent_id_from_secret() {
        assert_eq!(intent_id_from_secret("pi_123_secret_abc"), Some("pi_123"));
        assert_eq!(intent_id_from_secret("_secret_abc"), None);
        assert_eq!(intent_id_from_secret("garbage"), None);
    }

    #[tokio::test]
    async fn test_full_cycle_connects_once() {
        let (tokens, terminal) = reader(false);

        for secret in ["pi_1_secret_a", "pi_2_secret_b"] {
            let intent = terminal.retrieve(secret).await.unwrap();
            let collected = terminal.collect(intent).await.unwrap();
            let processed = terminal.process(collected).await.unwrap();
            assert_eq!(processed.status, IntentStatus::Succeeded);
        }
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_declined_card() {
        let (_, terminal) = reader(false);
        let intent = terminal.retrieve("pi_1_secret_a").await.unwrap();

        terminal.sdk().decline_next_card();
        let err = terminal.collect(intent.clone()).await.unwrap_err();
        assert_eq!(err.code, TerminalErrorCode::Declined);

        // only the next card is declined
        assert!(terminal.collect(intent).await.is_ok());
    }

    #[tokio::test]
    async fn test_process_requires_collection() {
        let (_, terminal) = reader(false);
        let intent = terminal.retrieve("pi_1_secret_a").await.unwrap();
        assert!(terminal.process(intent).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_token_failure_surfaces_on_retrieve() {
        let (_, terminal) = reader(true);
        let err = terminal.retrieve("pi_1_secret_a").await.unwrap_err();
        assert_eq!(err.code, TerminalErrorCode::ConnectionToken);
        assert!(err.message.contains("stripe unavailable"));
    }

    struct SilentSdk;

    impl TerminalSdk for SilentSdk {
        fn retrieve_payment_intent(&self, _client_secret: &str, callback: IntentCallback) {
            drop(callback);
        }
        fn collect_payment_method(&self, _intent: PaymentIntent, callback: IntentCallback) {
            drop(callback);
        }
        fn process_payment(&self, _intent: PaymentIntent, callback: IntentCallback) {
            drop(callback);
        }
    }

    #[tokio::test]
    async fn test_dropped_callback_fails_the_call() {
        let terminal = CallbackTerminal::new(SilentSdk);
        let err = terminal.retrieve("pi_1_secret_a").await.unwrap_err();
        assert_eq!(err.code, TerminalErrorCode::Unexpected);
    }

    #[test]
    fn test_late_callback_is_ignored() {
        let (callback, rx) = IntentCallback::channel();
        drop(rx);
        callback.on_failure(TerminalError::new(TerminalErrorCode::Canceled, "too late"));
    }
}
