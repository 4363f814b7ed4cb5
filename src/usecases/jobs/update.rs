//! UpdateJob: the only path through which a job changes status

use super::children::UpdateChildrenUseCase;
use super::next::StartNextJobUseCase;
use super::query::GetJobUseCase;
use super::start::seconds_since_last_log;
use crate::entities::{EthTransaction, InternalData, Job, JobStatus, Log};
use crate::error::{SchedulerError, SchedulerResult};
use crate::metrics;
use crate::parsers::merge_transaction;
use crate::store::{self, DataStore, StoreTx};

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

const COMPONENT: &str = "use-cases.update-job";

/// Changes requested on a job. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    /// Partial transaction: only non-empty fields are applied
    pub transaction: Option<EthTransaction>,
    pub labels: Option<BTreeMap<String, String>>,
    pub internal_data: Option<InternalData>,
    pub status: Option<JobStatus>,
    pub message: String,
}

impl JobUpdate {
    pub fn status(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct UpdateJobUseCase {
    store: Arc<dyn DataStore>,
    update_children: UpdateChildrenUseCase,
    start_next_job: StartNextJobUseCase,
    get_job: GetJobUseCase,
}

impl UpdateJobUseCase {
    pub fn new(
        store: Arc<dyn DataStore>,
        update_children: UpdateChildrenUseCase,
        start_next_job: StartNextJobUseCase,
    ) -> Self {
        Self {
            get_job: GetJobUseCase::new(store.clone()),
            store,
            update_children,
            start_next_job,
        }
    }

    pub async fn execute(
        &self,
        job_uuid: Uuid,
        update: JobUpdate,
        tenants: &[String],
    ) -> SchedulerResult<Job> {
        debug!(job = %job_uuid, status = ?update.status, "Updating job");

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = self.execute_in_tx(tx.as_mut(), job_uuid, &update, tenants).await;
        let job = store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        let chained = matches!(update.status, Some(JobStatus::Mined | JobStatus::Stored));
        if chained && job.next_job_uuid.is_some() {
            self.start_next_job
                .execute(job.uuid, tenants)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }

        let job = self
            .get_job
            .execute(job_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        info!(job = %job.uuid, status = %job.status(), "Job updated");
        Ok(job)
    }

    /// Apply `update` inside an open transaction. Returns the job as it was
    /// before the update.
    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        update: &JobUpdate,
        tenants: &[String],
    ) -> SchedulerResult<Job> {
        if update.status == Some(JobStatus::Mined) {
            self.lock_group_root(tx, job_uuid, tenants)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }
        tx.lock_job(job_uuid)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let mut job = tx
            .find_job(job_uuid, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let current = job.status();

        if let Some(next) = update.status {
            if current.is_final() && next != JobStatus::Warning {
                let message = format!("job {} is already {}", job_uuid, current);
                error!("{}", message);
                return Err(SchedulerError::InvalidParameter(message).extend_component(COMPONENT));
            }
            if !next.can_transition_from(current) {
                let message = format!(
                    "job {} cannot go from {} to {}",
                    job_uuid, current, next
                );
                error!("{}", message);
                return Err(SchedulerError::InvalidState(message).extend_component(COMPONENT));
            }
        }

        if let Some(patch) = &update.transaction {
            let merged = merge_transaction(&job.transaction, patch);
            tx.update_transaction(job.uuid, &merged)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }

        if update.labels.is_some() || update.internal_data.is_some() {
            if let Some(labels) = &update.labels {
                job.labels = labels.clone();
            }
            if let Some(internal_data) = &update.internal_data {
                job.internal_data = internal_data.clone();
            }
            tx.update_job(&job)
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
        }

        if let Some(next) = update.status {
            tx.insert_log(job.uuid, &Log::new(next, update.message.clone()))
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;

            if next == JobStatus::Mined {
                self.update_children
                    .execute_in_tx(
                        tx,
                        job.uuid,
                        job.internal_data.parent_job_uuid,
                        JobStatus::NeverMined,
                        tenants,
                    )
                    .await
                    .map_err(|e| e.extend_component(COMPONENT))?;
            }

            if next.is_lifecycle() {
                metrics::record_transition(current, next, seconds_since_last_log(&job));
            }
        }

        Ok(job)
    }

    /// Rows are locked root first, then the job: the order UpdateChildren
    /// uses when the root itself is mined.
    async fn lock_group_root(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        let job = tx.find_job(job_uuid, tenants).await?;
        match job.internal_data.parent_job_uuid {
            Some(root) if root != job_uuid => {
                debug!(job = %job_uuid, root = %root, "Locking job group root");
                tx.lock_job(root).await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Topics;
    use crate::entities::{all_tenants, JobType};
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use crate::testutils::{
        fetch_job, seed_in_schedule, seed_job, transaction, RecordingProducer, CHAIN_UUID,
    };
    use crate::usecases::jobs::StartJobUseCase;

    fn usecase(store: &Arc<MemoryStore>, producer: &Arc<RecordingProducer>) -> UpdateJobUseCase {
        let start = StartJobUseCase::new(store.clone(), producer.clone(), Topics::default());
        UpdateJobUseCase::new(
            store.clone(),
            UpdateChildrenUseCase::new(store.clone()),
            StartNextJobUseCase::new(store.clone(), start),
        )
    }

    #[tokio::test]
    async fn follows_the_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let job = seed_job(&store, JobType::EthereumTransaction, &[JobStatus::Started]).await;
        let usecase = usecase(&store, &producer);

        let job = usecase
            .execute(job.uuid, JobUpdate::status(JobStatus::Pending, "sent"), &all_tenants())
            .await
            .unwrap();
        assert_eq!(job.status(), JobStatus::Pending);

        let job = usecase
            .execute(job.uuid, JobUpdate::status(JobStatus::Mined, ""), &all_tenants())
            .await
            .unwrap();
        assert_eq!(job.status(), JobStatus::Mined);
    }

    #[tokio::test]
    async fn disallowed_transition_leaves_history_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let job = seed_job(&store, JobType::EthereumTransaction, &[]).await;

        let err = usecase(&store, &producer)
            .execute(job.uuid, JobUpdate::status(JobStatus::Mined, ""), &all_tenants())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.components(), vec![COMPONENT]);
        assert_eq!(fetch_job(&store, job.uuid).await.logs, job.logs);
    }

    #[tokio::test]
    async fn final_jobs_reject_status_changes() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let usecase = usecase(&store, &producer);

        for terminal in [
            JobStatus::Mined,
            JobStatus::Stored,
            JobStatus::NeverMined,
            JobStatus::Failed,
        ] {
            let job = seed_job(
                &store,
                JobType::EthereumTransaction,
                &[JobStatus::Started, JobStatus::Pending, terminal],
            )
            .await;

            let err = usecase
                .execute(job.uuid, JobUpdate::status(JobStatus::Pending, ""), &all_tenants())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);

            let job = usecase
                .execute(
                    job.uuid,
                    JobUpdate::status(JobStatus::Warning, "late receipt"),
                    &all_tenants(),
                )
                .await
                .unwrap();
            assert_eq!(job.status(), terminal);
        }
    }

    #[tokio::test]
    async fn transaction_patch_is_partial() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let job = seed_job(&store, JobType::EthereumTransaction, &[JobStatus::Started]).await;

        let update = JobUpdate {
            transaction: Some(EthTransaction {
                hash: Some("0xabc".into()),
                ..Default::default()
            }),
            ..JobUpdate::status(JobStatus::Pending, "")
        };
        let updated = usecase(&store, &producer)
            .execute(job.uuid, update, &all_tenants())
            .await
            .unwrap();

        assert_eq!(updated.transaction.hash.as_deref(), Some("0xabc"));
        assert_eq!(updated.transaction.from, job.transaction.from);
        assert_eq!(updated.transaction.gas, job.transaction.gas);
        assert_eq!(updated.transaction.value, job.transaction.value);
    }

    #[tokio::test]
    async fn mined_job_wins_over_its_siblings() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let pending = [JobStatus::Started, JobStatus::Pending];
        let parent = seed_job(&store, JobType::EthereumTransaction, &pending).await;
        let mut child = Job::new(
            parent.schedule_uuid,
            CHAIN_UUID,
            JobType::EthereumTransaction,
            transaction(),
        );
        child.internal_data.parent_job_uuid = Some(parent.uuid);
        let child = seed_in_schedule(&store, child, &pending).await;

        let usecase = usecase(&store, &producer);
        usecase
            .execute(child.uuid, JobUpdate::status(JobStatus::Mined, ""), &all_tenants())
            .await
            .unwrap();

        assert_eq!(fetch_job(&store, parent.uuid).await.status(), JobStatus::NeverMined);

        let err = usecase
            .execute(parent.uuid, JobUpdate::status(JobStatus::Mined, ""), &all_tenants())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn stored_private_job_starts_its_marking_job() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let private = seed_job(
            &store,
            JobType::OrionEeaTransaction,
            &[JobStatus::Started, JobStatus::Pending],
        )
        .await;
        let marking = seed_in_schedule(
            &store,
            Job::new(
                private.schedule_uuid,
                CHAIN_UUID,
                JobType::OrionMarkingTransaction,
                transaction(),
            ),
            &[],
        )
        .await;

        let usecase = usecase(&store, &producer);
        let mut linked = private.clone();
        linked.next_job_uuid = Some(marking.uuid);
        let mut tx = store.begin().await.unwrap();
        tx.update_job(&linked).await.unwrap();
        tx.commit().await.unwrap();

        let update = JobUpdate {
            transaction: Some(EthTransaction {
                hash: Some("0xfeed".into()),
                ..Default::default()
            }),
            ..JobUpdate::status(JobStatus::Stored, "")
        };
        usecase
            .execute(private.uuid, update, &all_tenants())
            .await
            .unwrap();

        let marking = fetch_job(&store, marking.uuid).await;
        assert_eq!(marking.status(), JobStatus::Started);
        assert_eq!(marking.transaction.data.as_deref(), Some("0xfeed"));
        assert_eq!(producer.sent().len(), 1);
    }

    #[tokio::test]
    async fn field_updates_are_allowed_on_final_jobs() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Failed],
        )
        .await;

        let mut internal_data = job.internal_data.clone();
        internal_data.has_been_retried = true;
        let update = JobUpdate {
            internal_data: Some(internal_data),
            ..Default::default()
        };
        let job = usecase(&store, &producer)
            .execute(job.uuid, update, &all_tenants())
            .await
            .unwrap();
        assert!(job.internal_data.has_been_retried);
        assert_eq!(job.status(), JobStatus::Failed);
    }
}
