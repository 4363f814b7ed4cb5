//! In-memory entities of the scheduler
//!
//! A TxRequest owns one Schedule, a Schedule owns an ordered list of Jobs and
//! every Job owns its transaction and its append-only Log history.

mod filters;
mod job;
mod schedule;
mod status;
mod transaction;
mod tx_request;

pub use filters::{
    all_tenants, tenant_allowed, JobFilters, ScheduleFilters, TxRequestFilters, DEFAULT_TENANT,
    WILDCARD_TENANT,
};
pub use job::{derive_status, InternalData, Job, JobType, Log, Priority, RetryPolicy};
pub use schedule::Schedule;
pub use status::JobStatus;
pub use transaction::EthTransaction;
pub use tx_request::{
    CallParams, DeployParams, GasParams, PrivacyProtocol, PrivateParams, RawParams,
    TransferParams, TxParams, TxRequest,
};

use uuid::Uuid;

/// Entry of the chain directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub uuid: Uuid,
    pub name: String,
    pub chain_id: String,
}

/// Entry of the contract directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    pub tag: String,
    pub bytecode: String,
    /// Constructor argument list, e.g. `(uint256,string)`
    pub constructor_signature: String,
}
