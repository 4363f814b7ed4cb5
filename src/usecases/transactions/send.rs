//! SendTx: idempotent entry point turning a request into started jobs

use super::query::GetTxUseCase;
use crate::entities::{Chain, EthTransaction, JobStatus, Schedule, TxRequest};
use crate::error::{ErrorKind, SchedulerError, SchedulerResult};
use crate::parsers::{jobs_from_request, request_hash};
use crate::store::{self, DataStore, StoreTx};
use crate::usecases::jobs::{CreateJobUseCase, StartJobUseCase};
use crate::validators::TransactionValidator;

use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "use-cases.send-tx";

#[derive(Clone)]
pub struct SendTxUseCase {
    store: Arc<dyn DataStore>,
    validator: TransactionValidator,
    create_job: CreateJobUseCase,
    start_job: StartJobUseCase,
    get_tx: GetTxUseCase,
}

impl SendTxUseCase {
    pub fn new(
        store: Arc<dyn DataStore>,
        validator: TransactionValidator,
        create_job: CreateJobUseCase,
        start_job: StartJobUseCase,
    ) -> Self {
        Self {
            get_tx: GetTxUseCase::new(store.clone()),
            store,
            validator,
            create_job,
            start_job,
        }
    }

    /// Submitting the same idempotency key with the same parameters returns
    /// the existing request; different parameters are rejected.
    pub async fn execute(&self, mut request: TxRequest, tenant_id: &str) -> SchedulerResult<TxRequest> {
        debug!(
            idempotency_key = %request.idempotency_key,
            chain = %request.chain_name,
            kind = request.params.kind(),
            "Sending transaction request"
        );
        let tenants = vec![tenant_id.to_string()];

        let chain = self
            .validator
            .validate_chain(&request.chain_name)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        request.request_hash =
            request_hash(&request.params, chain.uuid).map_err(|e| e.extend_component(COMPONENT))?;
        let transaction = self
            .validator
            .craft_transaction(&request.params)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        let request = match self
            .select_or_insert(request.clone(), &chain, transaction, &tenants)
            .await
        {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // lost the race on the idempotency key against a concurrent submission
                warn!(idempotency_key = %request.idempotency_key, "Request inserted concurrently");
                self.select(&request, &tenants).await?.ok_or(e)?
            }
            other => other?,
        };

        let first_job = request
            .schedule
            .as_ref()
            .and_then(|s| s.jobs.first())
            .ok_or_else(|| {
                SchedulerError::Data(format!("request {} has no job", request.uuid))
                    .extend_component(COMPONENT)
            })?;
        if first_job.status() == JobStatus::Created {
            self.start_job
                .execute(first_job.uuid, &tenants)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }

        let request = self
            .get_tx
            .execute(request.uuid, &tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        info!(request = %request.uuid, idempotency_key = %request.idempotency_key, "Transaction request sent");
        Ok(request)
    }

    async fn select_or_insert(
        &self,
        request: TxRequest,
        chain: &Chain,
        transaction: EthTransaction,
        tenants: &[String],
    ) -> SchedulerResult<TxRequest> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = self
            .select_or_insert_in_tx(tx.as_mut(), request, chain, transaction, tenants)
            .await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))
    }

    async fn select_or_insert_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        mut request: TxRequest,
        chain: &Chain,
        transaction: EthTransaction,
        tenants: &[String],
    ) -> SchedulerResult<TxRequest> {
        if let Some(existing) = tx
            .find_tx_request_by_idempotency_key(&request.idempotency_key, tenants)
            .await?
        {
            return same_request(existing, &request);
        }

        let tenant_id = tenants.first().cloned().unwrap_or_default();
        let schedule = Schedule::new(tenant_id, chain.uuid);
        tx.insert_schedule(&schedule).await?;
        request.schedule = Some(schedule.clone());
        tx.insert_tx_request(&request).await?;

        let mut jobs = Vec::new();
        for job in jobs_from_request(&request, &schedule, chain, transaction) {
            let job = self
                .create_job
                .execute_in_tx(tx, job, chain, tenants)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
            jobs.push(job);
        }

        if let Some(schedule) = request.schedule.as_mut() {
            schedule.jobs = jobs;
        }
        Ok(request)
    }

    async fn select(
        &self,
        request: &TxRequest,
        tenants: &[String],
    ) -> SchedulerResult<Option<TxRequest>> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = match tx
            .find_tx_request_by_idempotency_key(&request.idempotency_key, tenants)
            .await
        {
            Ok(Some(existing)) => same_request(existing, request).map(Some),
            other => other,
        };
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))
    }
}

fn same_request(existing: TxRequest, request: &TxRequest) -> SchedulerResult<TxRequest> {
    if existing.request_hash != request.request_hash {
        return Err(SchedulerError::AlreadyExists(format!(
            "a different request already uses idempotency key '{}'",
            request.idempotency_key
        )));
    }
    debug!(request = %existing.uuid, "Request already submitted");
    Ok(existing)
}
