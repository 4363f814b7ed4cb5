//! Transaction request use cases

mod contract;
mod query;
mod send;

pub use contract::{SendContractTxUseCase, SendDeployTxUseCase};
pub use query::{GetTxUseCase, SearchTransactionsUseCase};
pub use send::SendTxUseCase;
