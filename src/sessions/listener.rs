//! Periodic discovery of PENDING jobs

use super::manager::SessionManager;
use crate::entities::{all_tenants, JobFilters, JobStatus};
use crate::error::SchedulerResult;
use crate::metrics;
use crate::usecases::jobs::SearchJobsUseCase;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct JobsListener {
    search_jobs: SearchJobsUseCase,
    sessions: Arc<SessionManager>,
    refresh_interval: Duration,
}

impl JobsListener {
    pub fn new(
        search_jobs: SearchJobsUseCase,
        sessions: Arc<SessionManager>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            search_jobs,
            sessions,
            refresh_interval,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> SchedulerResult<()> {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick: Option<DateTime<Utc>> = None;

        info!(interval = ?self.refresh_interval, "Jobs listener started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let started_at = Utc::now();
                    match self.tick(self.window_start(last_tick)).await {
                        Ok(_) => last_tick = Some(started_at),
                        Err(e) => error!("Jobs listener tick failed: {}", e),
                    }
                }
            }
        }

        info!("Jobs listener stopped");
        Ok(())
    }

    /// Lower bound of the next search. Windows overlap by one refresh
    /// interval: a log committed after a tick may carry a timestamp taken
    /// before that tick started.
    fn window_start(&self, last_tick: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        let overlap =
            chrono::Duration::from_std(self.refresh_interval).unwrap_or_else(|_| chrono::Duration::zero());
        last_tick.map(|started_at| started_at - overlap)
    }

    /// Register a session for every PENDING parent job updated since
    /// `since`, or for all of them when `since` is empty. Returns how many
    /// sessions were added.
    pub async fn tick(&self, since: Option<DateTime<Utc>>) -> SchedulerResult<usize> {
        let filters = JobFilters {
            status: Some(JobStatus::Pending),
            updated_after: since,
            only_parents: true,
            ..Default::default()
        };
        let jobs = self.search_jobs.execute(&filters, &all_tenants()).await?;

        let added = jobs
            .iter()
            .filter(|job| self.sessions.add_job_session(job))
            .count();
        metrics::record_listener_tick();
        if added > 0 {
            info!(added, tracked = self.sessions.count(), "Sessions added for pending jobs");
        } else {
            debug!(found = jobs.len(), "No new pending job");
        }
        Ok(added)
    }
}
