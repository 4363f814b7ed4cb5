//! Job lookups scoped to the caller's tenants

use crate::entities::{Job, JobFilters};
use crate::error::SchedulerResult;
use crate::store::{self, DataStore};

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const GET_JOB_COMPONENT: &str = "use-cases.get-job";
const SEARCH_JOBS_COMPONENT: &str = "use-cases.search-jobs";

#[derive(Clone)]
pub struct GetJobUseCase {
    store: Arc<dyn DataStore>,
}

impl GetJobUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, job_uuid: Uuid, tenants: &[String]) -> SchedulerResult<Job> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(GET_JOB_COMPONENT))?;
        let result = tx.find_job(job_uuid, tenants).await;
        let job = store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(GET_JOB_COMPONENT))?;

        debug!(job = %job.uuid, status = %job.status(), "Job found");
        Ok(job)
    }
}

#[derive(Clone)]
pub struct SearchJobsUseCase {
    store: Arc<dyn DataStore>,
}

impl SearchJobsUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        filters: &JobFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Job>> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(SEARCH_JOBS_COMPONENT))?;
        let result = tx.search_jobs(filters, tenants).await;
        let jobs = store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(SEARCH_JOBS_COMPONENT))?;

        debug!(count = jobs.len(), "Jobs found");
        Ok(jobs)
    }
}
