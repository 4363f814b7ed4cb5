//! In-memory data store
//!
//! Writers are serialised on a single async mutex. A transaction works on a
//! private copy of the state which replaces the shared state on commit and is
//! dropped on rollback.

use super::{DataStore, StoreTx};
use crate::entities::{
    tenant_allowed, EthTransaction, Job, JobFilters, Log, Schedule, ScheduleFilters, TxRequest,
    TxRequestFilters,
};
use crate::error::{SchedulerError, SchedulerResult};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct State {
    schedules: HashMap<Uuid, Schedule>,
    requests: Vec<TxRequest>,
    jobs: Vec<Job>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn begin(&self) -> SchedulerResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn health_check(&self) -> SchedulerResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

impl MemoryTx {
    fn schedule_tenant(&self, schedule_uuid: Uuid) -> Option<&str> {
        self.working
            .schedules
            .get(&schedule_uuid)
            .map(|s| s.tenant_id.as_str())
    }

    fn schedule_with_jobs(&self, schedule: &Schedule) -> Schedule {
        let mut schedule = schedule.clone();
        schedule.jobs = self
            .working
            .jobs
            .iter()
            .filter(|j| j.schedule_uuid == schedule.uuid)
            .cloned()
            .collect();
        schedule.jobs.sort_by_key(|j| j.created_at);
        schedule
    }

    fn request_with_schedule(&self, request: &TxRequest) -> TxRequest {
        let mut request = request.clone();
        request.schedule = request
            .schedule
            .as_ref()
            .and_then(|s| self.working.schedules.get(&s.uuid))
            .map(|s| self.schedule_with_jobs(s));
        request
    }

    fn job_mut(&mut self, uuid: Uuid) -> SchedulerResult<&mut Job> {
        self.working
            .jobs
            .iter_mut()
            .find(|j| j.uuid == uuid)
            .ok_or_else(|| SchedulerError::not_found("job", uuid))
    }
}

fn job_matches(filters: &JobFilters, job: &Job) -> bool {
    if !filters.uuids.is_empty() && !filters.uuids.contains(&job.uuid) {
        return false;
    }
    if filters.chain_uuid.map_or(false, |c| c != job.chain_uuid) {
        return false;
    }
    if !filters.tx_hashes.is_empty() {
        match &job.transaction.hash {
            Some(hash) if filters.tx_hashes.contains(hash) => {}
            _ => return false,
        }
    }
    if filters.status.map_or(false, |s| s != job.status()) {
        return false;
    }
    if filters.updated_after.map_or(false, |t| job.updated_at <= t) {
        return false;
    }
    if let Some(parent) = filters.parent_job_uuid {
        if job.uuid != parent && job.internal_data.parent_job_uuid != Some(parent) {
            return false;
        }
    }
    if filters.only_parents && job.is_child() {
        return false;
    }
    true
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_schedule(&mut self, schedule: &Schedule) -> SchedulerResult<()> {
        if self.working.schedules.contains_key(&schedule.uuid) {
            return Err(SchedulerError::AlreadyExists(format!(
                "schedule {}",
                schedule.uuid
            )));
        }
        let mut stored = schedule.clone();
        stored.jobs.clear();
        self.working.schedules.insert(stored.uuid, stored);
        Ok(())
    }

    async fn find_schedule(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<Schedule> {
        self.working
            .schedules
            .get(&uuid)
            .filter(|s| tenant_allowed(tenants, &s.tenant_id))
            .map(|s| self.schedule_with_jobs(s))
            .ok_or_else(|| SchedulerError::not_found("schedule", uuid))
    }

    async fn search_schedules(
        &mut self,
        filters: &ScheduleFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Schedule>> {
        let mut schedules: Vec<Schedule> = self
            .working
            .schedules
            .values()
            .filter(|s| tenant_allowed(tenants, &s.tenant_id))
            .filter(|s| filters.chain_uuid.map_or(true, |c| c == s.chain_uuid))
            .map(|s| self.schedule_with_jobs(s))
            .collect();
        schedules.sort_by_key(|s| s.created_at);
        Ok(schedules)
    }

    async fn insert_tx_request(&mut self, request: &TxRequest) -> SchedulerResult<()> {
        let schedule = request.schedule.as_ref().ok_or_else(|| {
            SchedulerError::InvalidParameter("transaction request without schedule".into())
        })?;
        if !self.working.schedules.contains_key(&schedule.uuid) {
            return Err(SchedulerError::InvalidParameter(format!(
                "schedule {} does not exist",
                schedule.uuid
            )));
        }
        if self
            .working
            .requests
            .iter()
            .any(|r| r.idempotency_key == request.idempotency_key)
        {
            return Err(SchedulerError::AlreadyExists(format!(
                "idempotency key {}",
                request.idempotency_key
            )));
        }

        let mut stored = request.clone();
        if let Some(s) = stored.schedule.as_mut() {
            s.jobs.clear();
        }
        self.working.requests.push(stored);
        Ok(())
    }

    async fn find_tx_request(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<TxRequest> {
        self.working
            .requests
            .iter()
            .find(|r| r.uuid == uuid)
            .map(|r| self.request_with_schedule(r))
            .filter(|r| {
                r.schedule
                    .as_ref()
                    .map_or(false, |s| tenant_allowed(tenants, &s.tenant_id))
            })
            .ok_or_else(|| SchedulerError::not_found("transaction request", uuid))
    }

    async fn find_tx_request_by_idempotency_key(
        &mut self,
        idempotency_key: &str,
        tenants: &[String],
    ) -> SchedulerResult<Option<TxRequest>> {
        let request = self
            .working
            .requests
            .iter()
            .find(|r| r.idempotency_key == idempotency_key)
            .filter(|r| {
                r.schedule
                    .as_ref()
                    .and_then(|s| self.schedule_tenant(s.uuid))
                    .map_or(false, |t| tenant_allowed(tenants, t))
            })
            .map(|r| self.request_with_schedule(r));
        Ok(request)
    }

    async fn search_tx_requests(
        &mut self,
        filters: &TxRequestFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<TxRequest>> {
        let mut requests: Vec<TxRequest> = self
            .working
            .requests
            .iter()
            .filter(|r| {
                filters.idempotency_keys.is_empty()
                    || filters.idempotency_keys.contains(&r.idempotency_key)
            })
            .map(|r| self.request_with_schedule(r))
            .filter(|r| {
                let schedule = match &r.schedule {
                    Some(s) => s,
                    None => return false,
                };
                tenant_allowed(tenants, &schedule.tenant_id)
                    && filters.chain_uuid.map_or(true, |c| c == schedule.chain_uuid)
                    && (filters.tx_hashes.is_empty()
                        || schedule.jobs.iter().any(|j| {
                            j.transaction
                                .hash
                                .as_ref()
                                .map_or(false, |h| filters.tx_hashes.contains(h))
                        }))
                    && filters
                        .status
                        .map_or(true, |st| schedule.jobs.iter().any(|j| j.status() == st))
            })
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn insert_job(&mut self, job: &Job) -> SchedulerResult<()> {
        let tenant_id = self
            .schedule_tenant(job.schedule_uuid)
            .map(str::to_string)
            .ok_or_else(|| {
                SchedulerError::InvalidParameter(format!(
                    "schedule {} does not exist",
                    job.schedule_uuid
                ))
            })?;
        if self.working.jobs.iter().any(|j| j.uuid == job.uuid) {
            return Err(SchedulerError::AlreadyExists(format!("job {}", job.uuid)));
        }

        let mut stored = job.clone();
        stored.tenant_id = tenant_id;
        self.working.jobs.push(stored);
        Ok(())
    }

    async fn find_job(&mut self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<Job> {
        self.working
            .jobs
            .iter()
            .find(|j| j.uuid == uuid && tenant_allowed(tenants, &j.tenant_id))
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("job", uuid))
    }

    async fn search_jobs(
        &mut self,
        filters: &JobFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .working
            .jobs
            .iter()
            .filter(|j| tenant_allowed(tenants, &j.tenant_id) && job_matches(filters, j))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    async fn lock_job(&mut self, uuid: Uuid) -> SchedulerResult<()> {
        // the whole store is already held by this transaction
        self.job_mut(uuid).map(|_| ())
    }

    async fn update_job(&mut self, job: &Job) -> SchedulerResult<()> {
        let stored = self.job_mut(job.uuid)?;
        stored.labels = job.labels.clone();
        stored.internal_data = job.internal_data.clone();
        stored.next_job_uuid = job.next_job_uuid;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn update_transaction(
        &mut self,
        job_uuid: Uuid,
        transaction: &EthTransaction,
    ) -> SchedulerResult<()> {
        let stored = self.job_mut(job_uuid)?;
        let created_at = stored.transaction.created_at;
        stored.transaction = transaction.clone();
        stored.transaction.created_at = created_at;
        stored.transaction.updated_at = Some(Utc::now());
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_log(&mut self, job_uuid: Uuid, log: &Log) -> SchedulerResult<()> {
        let stored = self.job_mut(job_uuid)?;
        stored.logs.push(log.clone());
        stored.updated_at = std::cmp::max(Utc::now(), log.created_at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> SchedulerResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> SchedulerResult<()> {
        Ok(())
    }
}
