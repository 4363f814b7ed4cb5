//! Registry of in-memory job sessions

use super::retry::{is_retry_policy, retry_tick, TickOutcome};
use crate::config::ListenerConfig;
use crate::entities::{all_tenants, Job};
use crate::metrics;
use crate::usecases::jobs::JobUpdate;
use crate::usecases::UseCases;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tracks at most one session per job. Each session owns a child of the
/// manager's shutdown token.
pub struct SessionManager {
    usecases: UseCases,
    sessions: DashMap<Uuid, CancellationToken>,
    shutdown: CancellationToken,
    max_retries: u32,
    /// Tick period of sessions without a retry policy
    watch_interval: Duration,
}

impl SessionManager {
    pub fn new(usecases: UseCases, config: &ListenerConfig, shutdown: CancellationToken) -> Self {
        Self::with_watch_interval(
            usecases,
            config.max_retries,
            Duration::from_secs(config.refresh_interval_secs.max(1)),
            shutdown,
        )
    }

    pub fn with_watch_interval(
        usecases: UseCases,
        max_retries: u32,
        watch_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            usecases,
            sessions: DashMap::new(),
            shutdown,
            max_retries,
            watch_interval,
        }
    }

    /// Start tracking `job`. Returns false when a session already exists or
    /// the job already went through its retry session.
    pub fn add_job_session(self: &Arc<Self>, job: &Job) -> bool {
        if job.internal_data.has_been_retried && is_retry_policy(&job.internal_data.retry_policy) {
            debug!(job = %job.uuid, "Job has already been retried, not tracking it");
            return false;
        }
        let token = match self.sessions.entry(job.uuid) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(entry) => {
                let token = self.shutdown.child_token();
                entry.insert(token.clone());
                token
            }
        };
        metrics::record_active_sessions(self.sessions.len());
        debug!(job = %job.uuid, "Session registered");

        let manager = Arc::clone(self);
        let job = job.clone();
        tokio::spawn(async move {
            manager.run_session(job, token).await;
        });
        true
    }

    /// Stop tracking a job; persisted state is left untouched
    pub fn cancel(&self, job_uuid: Uuid) -> bool {
        match self.sessions.get(&job_uuid) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, job_uuid: Uuid) -> bool {
        self.sessions.contains_key(&job_uuid)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stop(&self) {
        info!(sessions = self.count(), "Stopping job sessions");
        self.shutdown.cancel();
    }

    async fn run_session(&self, job: Job, token: CancellationToken) {
        let policy = job.internal_data.retry_policy.clone();
        let retrying = is_retry_policy(&policy);
        let period = if retrying {
            Duration::from_secs(policy.interval_secs)
        } else {
            self.watch_interval
        };
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let outcome = tokio::select! {
                _ = token.cancelled() => None,
                _ = ticker.tick() => Some(retry_tick(&self.usecases, &job, self.max_retries).await),
            };

            match outcome {
                None => {
                    debug!(job = %job.uuid, "Session cancelled");
                    break;
                }
                Some(Ok(TickOutcome::Continue)) => {}
                Some(Ok(outcome)) => {
                    debug!(job = %job.uuid, ?outcome, "Session finished");
                    break;
                }
                Some(Err(e)) if e.is_not_found() => {
                    warn!(job = %job.uuid, "Job disappeared, closing session");
                    break;
                }
                Some(Err(e)) => warn!(job = %job.uuid, "Session tick failed: {}", e),
            }
        }

        if retrying && !self.shutdown.is_cancelled() {
            self.flag_retried(&job).await;
        }
        self.sessions.remove(&job.uuid);
        metrics::record_active_sessions(self.sessions.len());
    }

    async fn flag_retried(&self, job: &Job) {
        let tenants = all_tenants();
        let current = match self.usecases.get_job.execute(job.uuid, &tenants).await {
            Ok(current) => current,
            Err(e) => {
                warn!(job = %job.uuid, "Cannot flag job as retried: {}", e);
                return;
            }
        };

        let mut internal_data = current.internal_data;
        internal_data.has_been_retried = true;
        let update = JobUpdate {
            internal_data: Some(internal_data),
            ..Default::default()
        };
        if let Err(e) = self.usecases.update_job.execute(job.uuid, update, &tenants).await {
            warn!(job = %job.uuid, "Cannot flag job as retried: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Topics;
    use crate::entities::{JobStatus, JobType, RetryPolicy};
    use crate::store::{DataStore, MemoryStore};
    use crate::testutils::{fetch_job, seed_job, validator, RecordingProducer};

    fn manager(store: &Arc<MemoryStore>) -> Arc<SessionManager> {
        let producer = Arc::new(RecordingProducer::default());
        let usecases = UseCases::new(store.clone(), producer, Topics::default(), validator());
        Arc::new(SessionManager::with_watch_interval(
            usecases,
            3,
            Duration::from_millis(20),
            CancellationToken::new(),
        ))
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(&store);
        let job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Pending],
        )
        .await;

        assert!(manager.add_job_session(&job));
        assert!(!manager.add_job_session(&job));
        assert_eq!(manager.count(), 1);

        manager.stop();
        wait_until(|| manager.count() == 0).await;
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn cancelled_session_deregisters() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(&store);
        let job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Pending],
        )
        .await;

        manager.add_job_session(&job);
        assert!(manager.cancel(job.uuid));
        wait_until(|| !manager.contains(job.uuid)).await;
        assert!(!manager.contains(job.uuid));
        assert!(!manager.cancel(job.uuid));
    }

    #[tokio::test]
    async fn session_ends_when_job_leaves_pending() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(&store);
        let job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Pending, JobStatus::Mined],
        )
        .await;

        manager.add_job_session(&job);
        wait_until(|| manager.count() == 0).await;
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn finished_retry_session_flags_the_job() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(&store);
        let mut job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Pending, JobStatus::Failed],
        )
        .await;
        job.internal_data.retry_policy = RetryPolicy {
            interval_secs: 1,
            increment: 0.1,
            limit: 0.5,
        };
        let mut tx = store.begin().await.unwrap();
        tx.update_job(&job).await.unwrap();
        tx.commit().await.unwrap();

        manager.add_job_session(&job);
        for _ in 0..30 {
            if fetch_job(&store, job.uuid).await.internal_data.has_been_retried {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(fetch_job(&store, job.uuid).await.internal_data.has_been_retried);
        wait_until(|| manager.count() == 0).await;
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn retried_jobs_are_not_tracked() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(&store);
        let mut job = seed_job(
            &store,
            JobType::EthereumTransaction,
            &[JobStatus::Started, JobStatus::Pending],
        )
        .await;
        job.internal_data.retry_policy = RetryPolicy {
            interval_secs: 1,
            increment: 0.0,
            limit: 0.0,
        };
        job.internal_data.has_been_retried = true;

        assert!(!manager.add_job_session(&job));
        assert_eq!(manager.count(), 0);

        // watch-only jobs carry no retry budget
        job.internal_data.retry_policy = RetryPolicy::default();
        assert!(manager.add_job_session(&job));
        manager.stop();
    }
}
