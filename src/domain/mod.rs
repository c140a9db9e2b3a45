//! Domain types and the ports the application layer is wired against.

pub mod amount;
pub mod credentials;
pub mod operator;
pub mod payment;
pub mod ports;
