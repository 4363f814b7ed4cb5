//! Conversions between requests, jobs and transactions

pub mod abi;
pub mod transaction;
pub mod tx_request;

pub use abi::{encode_deployment, encode_method_call};
pub use transaction::{decode_raw, merge_transaction};
pub use tx_request::{jobs_from_request, request_hash};
