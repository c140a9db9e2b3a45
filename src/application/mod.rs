//! Application layer orchestrating the till's use cases.
//!
//! `PaymentOrchestrator` sequences a card payment through the backend and the
//! terminal and publishes its progress on a `tokio::sync::watch` channel.
//! `AuthService` handles login and logout.

pub mod auth;
pub mod orchestrator;
