//! Background tracking of PENDING jobs
//!
//! The [`JobsListener`] periodically looks for PENDING jobs and hands them to
//! the [`SessionManager`], which keeps one retry session per job.

mod listener;
mod manager;
mod retry;

pub use listener::JobsListener;
pub use manager::SessionManager;
pub use retry::{escalate_gas_price, retry_tick, TickOutcome, RETRY_ORDER_LABEL};
