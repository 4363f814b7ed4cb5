//! StartNextJob: feed a marking job from its private predecessor and start it

use super::start::StartJobUseCase;
use crate::entities::{Job, JobStatus, JobType};
use crate::error::{SchedulerError, SchedulerResult};
use crate::store::{self, DataStore, StoreTx};

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const COMPONENT: &str = "use-cases.start-next-job";

/// Gas floor required by Tessera for marking transactions
pub const TESSERA_MIN_GAS: u64 = 60_000;

/// Field of the predecessor copied into the data of the marking transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopiedField {
    Hash,
    EnclaveKey,
}

/// How a marking job is fed by its private predecessor
#[derive(Debug, Clone, Copy)]
struct ChainingRule {
    next: JobType,
    previous: JobType,
    previous_status: JobStatus,
    copy: CopiedField,
    min_gas: Option<u64>,
}

const CHAINING_RULES: &[ChainingRule] = &[
    ChainingRule {
        next: JobType::OrionMarkingTransaction,
        previous: JobType::OrionEeaTransaction,
        previous_status: JobStatus::Stored,
        copy: CopiedField::Hash,
        min_gas: None,
    },
    ChainingRule {
        next: JobType::TesseraMarkingTransaction,
        previous: JobType::TesseraPrivateTransaction,
        previous_status: JobStatus::Stored,
        copy: CopiedField::EnclaveKey,
        min_gas: Some(TESSERA_MIN_GAS),
    },
];

fn rule_for(next: JobType) -> Option<&'static ChainingRule> {
    CHAINING_RULES.iter().find(|rule| rule.next == next)
}

#[derive(Clone)]
pub struct StartNextJobUseCase {
    store: Arc<dyn DataStore>,
    start_job: StartJobUseCase,
}

impl StartNextJobUseCase {
    pub fn new(store: Arc<dyn DataStore>, start_job: StartJobUseCase) -> Self {
        Self { store, start_job }
    }

    pub async fn execute(&self, job_uuid: Uuid, tenants: &[String]) -> SchedulerResult<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = self.execute_in_tx(tx.as_mut(), job_uuid, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))
    }

    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        debug!(job = %job_uuid, "Starting next job");

        let previous = tx
            .find_job(job_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let next_uuid = previous.next_job_uuid.ok_or_else(|| {
            SchedulerError::Data(format!("job {} has no next job", job_uuid))
                .extend_component(COMPONENT)
        })?;
        let mut next = tx
            .find_job(next_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        if let Some(rule) = rule_for(next.job_type) {
            apply_rule(rule, &previous, &mut next).map_err(|e| e.extend_component(COMPONENT))?;
            tx.update_transaction(next.uuid, &next.transaction)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }

        self.start_job
            .execute_in_tx(tx, next.uuid, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        info!(job = %job_uuid, next_job = %next.uuid, "Next job started");
        Ok(())
    }
}

fn apply_rule(rule: &ChainingRule, previous: &Job, next: &mut Job) -> SchedulerResult<()> {
    if previous.job_type != rule.previous {
        return Err(SchedulerError::Data(format!(
            "{} must follow a {} job, found {}",
            rule.next, rule.previous, previous.job_type
        )));
    }
    if previous.status() != rule.previous_status {
        return Err(SchedulerError::Data(format!(
            "previous job {} is {}, expected {}",
            previous.uuid,
            previous.status(),
            rule.previous_status
        )));
    }

    let copied = match rule.copy {
        CopiedField::Hash => previous.transaction.hash.clone(),
        CopiedField::EnclaveKey => previous.transaction.enclave_key.clone(),
    };
    let copied = copied.filter(|v| !v.is_empty()).ok_or_else(|| {
        SchedulerError::Data(format!(
            "previous job {} has no {:?} to mark",
            previous.uuid, rule.copy
        ))
    })?;
    next.transaction.data = Some(copied);

    if let Some(min_gas) = rule.min_gas {
        let gas = next.transaction.gas_limit()?.unwrap_or_default();
        if gas < min_gas {
            next.transaction.gas = Some(min_gas.to_string());
        }
    }
    Ok(())
}
