//! StartJob and ResendJobTx: hand a job to the execution pipeline

use crate::broker::{Delivery, Producer, Topics, TxEnvelope};
use crate::entities::{Job, JobStatus, Log};
use crate::error::{SchedulerError, SchedulerResult};
use crate::metrics;
use crate::store::{self, DataStore, StoreTx};

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

const START_JOB_COMPONENT: &str = "use-cases.start-job";
const RESEND_JOB_COMPONENT: &str = "use-cases.resend-job-tx";

#[derive(Clone)]
pub struct StartJobUseCase {
    store: Arc<dyn DataStore>,
    producer: Arc<dyn Producer>,
    topics: Topics,
}

impl StartJobUseCase {
    pub fn new(store: Arc<dyn DataStore>, producer: Arc<dyn Producer>, topics: Topics) -> Self {
        Self {
            store,
            producer,
            topics,
        }
    }

    pub async fn execute(&self, job_uuid: Uuid, tenants: &[String]) -> SchedulerResult<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(START_JOB_COMPONENT))?;
        let result = self.execute_in_tx(tx.as_mut(), job_uuid, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(START_JOB_COMPONENT))
    }

    /// The STARTED log is written before the publish so that a failed publish
    /// is rolled back together with it by the transaction owner.
    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        debug!(job = %job_uuid, "Starting job");

        tx.lock_job(job_uuid)
            .await
            .map_err(|e| e.extend_component(START_JOB_COMPONENT))?;
        let job = tx
            .find_job(job_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(START_JOB_COMPONENT))?;
        let current = job.status();
        if !JobStatus::Started.can_transition_from(current) {
            let message = format!("job {} cannot be started from status {}", job_uuid, current);
            error!("{}", message);
            return Err(SchedulerError::InvalidState(message).extend_component(START_JOB_COMPONENT));
        }

        tx.insert_log(job.uuid, &Log::new(JobStatus::Started, ""))
            .await
            .map_err(|e| e.extend_component(START_JOB_COMPONENT))?;

        let topic = self.topics.for_job_type(job.job_type);
        let crafter_bound = topic == self.topics.crafter;
        let envelope = TxEnvelope::from_job(&job);
        let delivery = publish(
            self.producer.as_ref(),
            topic,
            &envelope.partition_key(crafter_bound),
            &envelope,
        )
        .await
        .map_err(|e| e.extend_component(START_JOB_COMPONENT))?;

        metrics::record_transition(current, JobStatus::Started, seconds_since_last_log(&job));
        info!(
            job = %job.uuid,
            job_type = %job.job_type,
            topic,
            partition = delivery.partition,
            offset = delivery.offset,
            "Job started"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct ResendJobTxUseCase {
    store: Arc<dyn DataStore>,
    producer: Arc<dyn Producer>,
    topics: Topics,
}

impl ResendJobTxUseCase {
    pub fn new(store: Arc<dyn DataStore>, producer: Arc<dyn Producer>, topics: Topics) -> Self {
        Self {
            store,
            producer,
            topics,
        }
    }

    /// Send the already crafted transaction of a PENDING job again
    pub async fn execute(&self, job_uuid: Uuid, tenants: &[String]) -> SchedulerResult<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))?;
        let result = self.execute_in_tx(tx.as_mut(), job_uuid, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))
    }

    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        debug!(job = %job_uuid, "Resending job transaction");

        tx.lock_job(job_uuid)
            .await
            .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))?;
        let mut job = tx
            .find_job(job_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))?;
        let current = job.status();
        if !JobStatus::Resending.can_transition_from(current) {
            let message = format!("job {} cannot be resent from status {}", job_uuid, current);
            error!("{}", message);
            return Err(SchedulerError::InvalidState(message).extend_component(RESEND_JOB_COMPONENT));
        }

        tx.insert_log(job.uuid, &Log::new(JobStatus::Resending, ""))
            .await
            .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))?;

        job.internal_data.parent_job_uuid = Some(job.uuid);
        let envelope = TxEnvelope::from_job(&job);
        let delivery = publish(
            self.producer.as_ref(),
            &self.topics.sender,
            &envelope.partition_key(false),
            &envelope,
        )
        .await
        .map_err(|e| e.extend_component(RESEND_JOB_COMPONENT))?;

        info!(
            job = %job.uuid,
            partition = delivery.partition,
            offset = delivery.offset,
            "Job transaction resent"
        );
        Ok(())
    }
}

async fn publish(
    producer: &dyn Producer,
    topic: &str,
    key: &str,
    envelope: &TxEnvelope,
) -> SchedulerResult<Delivery> {
    let payload = envelope.to_bytes()?;
    match producer.publish(topic, key, payload).await {
        Ok(delivery) => {
            metrics::record_published(topic);
            Ok(delivery)
        }
        Err(e) => {
            metrics::record_publish_failure(topic);
            error!(job = %envelope.job_uuid, topic, "Failed to publish envelope: {}", e);
            Err(e)
        }
    }
}

pub(crate) fn seconds_since_last_log(job: &Job) -> f64 {
    let since = job
        .logs
        .iter()
        .map(|l| l.created_at)
        .max()
        .unwrap_or(job.created_at);
    (Utc::now() - since).num_milliseconds() as f64 / 1000.0
}
