//! Schedule use cases

use crate::entities::{Schedule, ScheduleFilters};
use crate::error::SchedulerResult;
use crate::store::{self, DataStore};
use crate::validators::TransactionValidator;

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const CREATE_SCHEDULE_COMPONENT: &str = "use-cases.create-schedule";
const GET_SCHEDULE_COMPONENT: &str = "use-cases.get-schedule";
const SEARCH_SCHEDULES_COMPONENT: &str = "use-cases.search-schedules";

#[derive(Clone)]
pub struct CreateScheduleUseCase {
    store: Arc<dyn DataStore>,
    validator: TransactionValidator,
}

impl CreateScheduleUseCase {
    pub fn new(store: Arc<dyn DataStore>, validator: TransactionValidator) -> Self {
        Self { store, validator }
    }

    /// Persist an empty schedule on a known chain
    pub async fn execute(&self, tenant_id: &str, chain_uuid: Uuid) -> SchedulerResult<Schedule> {
        self.validator
            .validate_chain_uuid(chain_uuid)
            .await
            .map_err(|e| e.extend_component(CREATE_SCHEDULE_COMPONENT))?;

        let schedule = Schedule::new(tenant_id, chain_uuid);
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(CREATE_SCHEDULE_COMPONENT))?;
        let result = tx.insert_schedule(&schedule).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(CREATE_SCHEDULE_COMPONENT))?;

        info!(schedule = %schedule.uuid, tenant = tenant_id, "Schedule created");
        Ok(schedule)
    }
}

#[derive(Clone)]
pub struct GetScheduleUseCase {
    store: Arc<dyn DataStore>,
}

impl GetScheduleUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<Schedule> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(GET_SCHEDULE_COMPONENT))?;
        let result = tx.find_schedule(uuid, tenants).await;
        let schedule = store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(GET_SCHEDULE_COMPONENT))?;

        debug!(schedule = %schedule.uuid, jobs = schedule.jobs.len(), "Schedule found");
        Ok(schedule)
    }
}

#[derive(Clone)]
pub struct SearchSchedulesUseCase {
    store: Arc<dyn DataStore>,
}

impl SearchSchedulesUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        filters: &ScheduleFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<Schedule>> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(SEARCH_SCHEDULES_COMPONENT))?;
        let result = tx.search_schedules(filters, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(SEARCH_SCHEDULES_COMPONENT))
    }
}
