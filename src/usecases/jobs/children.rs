//! UpdateChildren: close the losing attempts of a mined job group

use crate::entities::{JobFilters, JobStatus, Log};
use crate::error::SchedulerResult;
use crate::metrics;
use crate::store::{self, DataStore, StoreTx};

use super::start::seconds_since_last_log;

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const COMPONENT: &str = "use-cases.update-children";

/// Closes every still PENDING sibling of a mined job
#[derive(Clone)]
pub struct UpdateChildrenUseCase {
    store: Arc<dyn DataStore>,
}

impl UpdateChildrenUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        job_uuid: Uuid,
        parent_job_uuid: Option<Uuid>,
        next_status: JobStatus,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;
        let result = self
            .execute_in_tx(tx.as_mut(), job_uuid, parent_job_uuid, next_status, tenants)
            .await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(COMPONENT))
    }

    /// Append `next_status` to every PENDING job of the group other than
    /// `job_uuid`. Jobs outside PENDING are left alone, so calling it twice
    /// is harmless.
    pub async fn execute_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        job_uuid: Uuid,
        parent_job_uuid: Option<Uuid>,
        next_status: JobStatus,
        tenants: &[String],
    ) -> SchedulerResult<()> {
        let parent_uuid = parent_job_uuid.unwrap_or(job_uuid);
        debug!(job = %job_uuid, parent = %parent_uuid, "Updating sibling jobs");

        tx.lock_job(parent_uuid)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        let filters = JobFilters {
            parent_job_uuid: Some(parent_uuid),
            ..Default::default()
        };
        let siblings = tx
            .search_jobs(&filters, tenants)
            .await
            .map_err(|e| e.extend_component(COMPONENT))?;

        for sibling in siblings {
            if sibling.uuid == job_uuid || sibling.status() != JobStatus::Pending {
                continue;
            }

            let message = format!("sibling (or parent) job {} was mined instead", job_uuid);
            tx.insert_log(sibling.uuid, &Log::new(next_status, message))
                .await
                .map_err(|e| e.extend_component(COMPONENT))?;
            metrics::record_transition(
                JobStatus::Pending,
                next_status,
                seconds_since_last_log(&sibling),
            );
            info!(job = %sibling.uuid, status = %next_status, "Sibling job closed");
        }

        Ok(())
    }
}
