use clap::{Parser, Subcommand};
use clubpay::application::auth::AuthService;
use clubpay::application::orchestrator::PaymentOrchestrator;
use clubpay::config::Config;
use clubpay::domain::amount::Cents;
use clubpay::domain::operator::OperatorPolicy;
use clubpay::domain::payment::PaymentStatus;
use clubpay::domain::ports::{BackendClientArc, CredentialStore, CredentialStoreArc};
use clubpay::infrastructure::file_store::FileCredentialStore;
use clubpay::infrastructure::http::HttpBackendClient;
use clubpay::infrastructure::terminal::{
    BackendConnectionTokenProvider, CallbackTerminal, SimulatedReader,
};
use clubpay::interfaces::console::{self, FREE_AMOUNT_LABEL};
use miette::{IntoDiagnostic, Result, miette};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the logged-in session
    #[arg(long, env = "CLUBPAY_CREDENTIALS", default_value = ".clubpay/auth.json")]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in against the backend and store the session
    Login {
        #[arg(long)]
        user: String,
        #[arg(long, env = "CLUBPAY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// List the cashier names selectable on this till
    Operators,
    /// Take a card payment
    Pay {
        /// Fixed-price item (cola, wasser)
        #[arg(long, conflicts_with = "amount", required_unless_present = "amount")]
        item: Option<String>,
        /// Free amount in euros, e.g. 2,50
        #[arg(long)]
        amount: Option<Cents>,
        /// Cashier name when the till uses a fixed operator list
        #[arg(long)]
        operator: Option<String>,
        /// Make the simulated reader decline the card
        #[arg(long)]
        simulate_decline: bool,
    },
    /// Check a free amount and print it in cents
    ParseAmount { amount: Cents },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::debug!(path = %p.display(), "loaded environment variables from .env file"),
        Err(e) => tracing::debug!("no .env file loaded: {e}"),
    };

    let cli = Cli::parse();

    match cli.command {
        Command::ParseAmount { amount } => println!("{}", amount.value()),
        Command::Whoami => {
            let store = FileCredentialStore::open(&cli.credentials).into_diagnostic()?;
            match store.current_user_name().await.into_diagnostic()? {
                Some(name) => println!("{name}"),
                None => return Err(miette!("not logged in")),
            }
        }
        Command::Logout => {
            let store = FileCredentialStore::open(&cli.credentials).into_diagnostic()?;
            store.clear().await.into_diagnostic()?;
            println!("Logged out");
        }
        Command::Login { user, password } => {
            let store: CredentialStoreArc =
                Arc::new(FileCredentialStore::open(&cli.credentials).into_diagnostic()?);
            let config = Config::from_env().into_diagnostic()?;
            let auth = AuthService::new(store.clone(), backend(&config, store)?);
            match auth.login(&user, &password).await {
                Ok(credentials) => println!("Logged in as {}", credentials.display_name()),
                Err(_) => {
                    let status = auth.login_status().borrow().clone();
                    return Err(miette!("{}", console::render_login_status(&status)));
                }
            }
        }
        Command::Operators => {
            let config = Config::from_env().into_diagnostic()?;
            match config.operator_policy() {
                OperatorPolicy::AuthenticatedUser => println!("(logged-in user)"),
                policy => {
                    for name in policy.choices(&config.device_name) {
                        println!("{name}");
                    }
                }
            }
        }
        Command::Pay {
            item,
            amount,
            operator,
            simulate_decline,
        } => {
            let (cents, label) = match (item, amount) {
                (Some(key), _) => {
                    let item = console::find_item(&key)
                        .ok_or_else(|| miette!("unknown item '{key}'"))?;
                    (Cents::new(item.amount_cents).into_diagnostic()?, item.label)
                }
                (None, Some(cents)) => (cents, FREE_AMOUNT_LABEL),
                (None, None) => return Err(miette!("either --item or --amount is required")),
            };

            let config = Config::from_env().into_diagnostic()?;
            let store: CredentialStoreArc =
                Arc::new(FileCredentialStore::open(&cli.credentials).into_diagnostic()?);
            let backend = backend(&config, store.clone())?;

            let tokens = Arc::new(BackendConnectionTokenProvider::new(backend.clone()));
            let reader = SimulatedReader::new(tokens, config.location_id.clone());
            if simulate_decline {
                reader.decline_next_card();
            }
            let orchestrator = PaymentOrchestrator::new(
                store,
                backend,
                Arc::new(CallbackTerminal::new(reader)),
                config.operator_policy(),
                config.device_name.clone(),
            );

            let status = pay(&orchestrator, cents, label, operator.as_deref()).await?;
            if let PaymentStatus::Error(message) = status {
                return Err(miette!("{message}"));
            }
        }
    }

    Ok(())
}

fn backend(config: &Config, store: CredentialStoreArc) -> Result<BackendClientArc> {
    let client = HttpBackendClient::new(config.backend_base_url.clone(), store, config.http_timeout)
        .into_diagnostic()?;
    Ok(Arc::new(client))
}

/// Runs one payment, printing each phase until it ends or Ctrl-C cancels it.
async fn pay(
    orchestrator: &PaymentOrchestrator,
    amount: Cents,
    label: &str,
    operator: Option<&str>,
) -> Result<PaymentStatus> {
    let mut feed = orchestrator.subscribe();
    orchestrator
        .start(amount, label, operator)
        .into_diagnostic()?;

    loop {
        let changed = tokio::select! {
            changed = feed.changed() => changed,
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel().await;
                break;
            }
        };
        if changed.is_err() {
            break;
        }

        let status = feed.borrow_and_update().clone();
        match &status {
            PaymentStatus::Idle | PaymentStatus::Error(_) => {}
            other => println!("{}", console::render_status(other)),
        }
        if status.is_terminal() {
            break;
        }
    }

    Ok(orchestrator.wait().await)
}
