//! Request validation

pub mod params;
pub mod transactions;

pub use params::{validate_private_params, validate_tx_params};
pub use transactions::TransactionValidator;
