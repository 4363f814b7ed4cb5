//! Transactional data access
//!
//! Use cases open a [`StoreTx`] through [`DataStore::begin`] and thread the
//! `&mut dyn StoreTx` handle through every nested call. Only the outermost
//! owner commits or rolls back, through [`finish`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entities::{
    EthTransaction, Job, JobFilters, Log, Schedule, ScheduleFilters, TxRequest, TxRequestFilters,
};
use crate::error::SchedulerResult;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> SchedulerResult<Box<dyn StoreTx>>;

    async fn health_check(&self) -> SchedulerResult<()>;
}

/// One open database transaction. Every lookup honours the tenant list; the
/// wildcard tenant sees every record.
#[async_trait]
pub trait StoreTx: Send {
    async fn insert_schedule(&mut self, schedule: &Schedule) -> SchedulerResult<()>;

    /// Schedule with its jobs, ordered by creation time
    async fn find_schedule(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<Schedule>;

    async fn search_schedules(
        &mut self,
        filters: &ScheduleFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Schedule>>;

    /// Insert a request; its schedule must already be persisted
    async fn insert_tx_request(&mut self, request: &TxRequest) -> SchedulerResult<()>;

    async fn find_tx_request(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<TxRequest>;

    async fn find_tx_request_by_idempotency_key(
        &mut self,
        idempotency_key: &str,
        tenants: &[String],
    ) -> SchedulerResult<Option<TxRequest>>;

    async fn search_tx_requests(
        &mut self,
        filters: &TxRequestFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<TxRequest>>;

    /// Insert a job together with its transaction and initial logs
    async fn insert_job(&mut self, job: &Job) -> SchedulerResult<()>;

    async fn find_job(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<Job>;

    async fn search_jobs(
        &mut self,
        filters: &JobFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Job>>;

    /// Row lock held until the transaction ends
    async fn lock_job(&mut self, uuid: Uuid) -> SchedulerResult<()>;

    /// Persist labels, internal data and the next job link
    async fn update_job(&mut self, job: &Job) -> SchedulerResult<()>;

    async fn update_transaction(
        &mut self,
        job_uuid: Uuid,
        transaction: &EthTransaction,
    ) -> SchedulerResult<()>;

    /// Append a log and bump the job's `updated_at`
    async fn insert_log(&mut self, job_uuid: Uuid, log: &Log) -> SchedulerResult<()>;

    async fn commit(self: Box<Self>) -> SchedulerResult<()>;

    async fn rollback(self: Box<Self>) -> SchedulerResult<()>;
}

/// Commit on success, roll back on failure. The original error wins over a
/// rollback failure.
pub async fn finish<T>(tx: Box<dyn StoreTx>, result: SchedulerResult<T>) -> SchedulerResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed after {}: {}", e, rollback_err);
            }
            Err(e)
        }
    }
}
