//! CreateJob: attach a new job to an existing schedule

use crate::entities::{Chain, Job, JobStatus, Log};
use crate::error::{SchedulerError, SchedulerResult};
use crate::store::{self, DataStore, StoreTx};
use crate::validators::TransactionValidator;

use std::sync::Arc;
use tracing::{debug, error, info};

const COMPONENT: &str = "use-cases.create-job";

#[derive(Clone)]
pub struct CreateJobUseCase {
    store: Arc<dyn DataStore>,
    validator: TransactionValidator,
}

impl CreateJobUseCase {
    pub fn new(store: Arc<dyn DataStore>, validator: TransactionValidator) -> Self {
        Self { store, validator }
    }

    pub async fn execute(&self, job: Job, tenants: &[String]) -> SchedulerResult<Job> {
        debug!(schedule = %job.schedule_uuid, job_type = %job.job_type, "Creating job");

        let chain = self
            .validator
            .validate_chain_uuid(job.chain_uuid)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = self.execute_in_tx(tx.as_mut(), job, &chain, tenants).await;
        let job = store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        info!(job = %job.uuid, schedule = %job.schedule_uuid, "Job created");
        Ok(job)
    }

    /// Insert a job in an existing schedule. A child job is only accepted
    /// while its parent is PENDING.
    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        mut job: Job,
        chain: &Chain,
        tenants: &[String],
    ) -> SchedulerResult<Job> {
        let schedule = tx
            .find_schedule(job.schedule_uuid, tenants)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    SchedulerError::InvalidParameter(format!(
                        "schedule {} does not exist",
                        job.schedule_uuid
                    ))
                } else {
                    e
                }
            })?;

        if let Some(parent_uuid) = job.internal_data.parent_job_uuid.filter(|p| *p != job.uuid) {
            tx.lock_job(parent_uuid).await?;
            let parent = tx.find_job(parent_uuid, tenants).await?;
            if parent.status() != JobStatus::Pending {
                let message = format!(
                    "cannot create a child of job {} in status {}",
                    parent_uuid,
                    parent.status()
                );
                error!("{}", message);
                return Err(SchedulerError::InvalidState(message));
            }
        }

        job.tenant_id = schedule.tenant_id;
        job.chain_uuid = chain.uuid;
        job.internal_data.chain_id = Some(chain.chain_id.clone());
        if job.logs.is_empty() {
            job.logs.push(Log::new(JobStatus::Created, ""));
        }

        tx.insert_job(&job).await?;
        Ok(job)
    }
}
