//! Application use cases
//!
//! Every use case tags the errors it surfaces with its component name and
//! exposes an `execute_in_tx` variant when other use cases need to run it
//! inside their own transaction.

pub mod jobs;
pub mod schedules;
pub mod transactions;

use crate::broker::{Producer, Topics};
use crate::store::DataStore;
use crate::validators::TransactionValidator;

use jobs::{
    CreateJobUseCase, GetJobUseCase, ResendJobTxUseCase, SearchJobsUseCase, StartJobUseCase,
    StartNextJobUseCase, UpdateChildrenUseCase, UpdateJobUseCase,
};
use schedules::{CreateScheduleUseCase, GetScheduleUseCase, SearchSchedulesUseCase};
use transactions::{
    GetTxUseCase, SearchTransactionsUseCase, SendContractTxUseCase, SendDeployTxUseCase,
    SendTxUseCase,
};

use std::sync::Arc;

/// All use cases wired on the same store and producer
#[derive(Clone)]
pub struct UseCases {
    pub create_job: CreateJobUseCase,
    pub get_job: GetJobUseCase,
    pub search_jobs: SearchJobsUseCase,
    pub start_job: StartJobUseCase,
    pub resend_job_tx: ResendJobTxUseCase,
    pub update_job: UpdateJobUseCase,
    pub update_children: UpdateChildrenUseCase,
    pub start_next_job: StartNextJobUseCase,
    pub create_schedule: CreateScheduleUseCase,
    pub get_schedule: GetScheduleUseCase,
    pub search_schedules: SearchSchedulesUseCase,
    pub send_tx: SendTxUseCase,
    pub send_contract_tx: SendContractTxUseCase,
    pub send_deploy_tx: SendDeployTxUseCase,
    pub get_tx: GetTxUseCase,
    pub search_transactions: SearchTransactionsUseCase,
}

impl UseCases {
    pub fn new(
        store: Arc<dyn DataStore>,
        producer: Arc<dyn Producer>,
        topics: Topics,
        validator: TransactionValidator,
    ) -> Self {
        let start_job = StartJobUseCase::new(store.clone(), producer.clone(), topics.clone());
        let update_children = UpdateChildrenUseCase::new(store.clone());
        let start_next_job = StartNextJobUseCase::new(store.clone(), start_job.clone());
        let create_job = CreateJobUseCase::new(store.clone(), validator.clone());
        let send_tx = SendTxUseCase::new(
            store.clone(),
            validator.clone(),
            create_job.clone(),
            start_job.clone(),
        );

        Self {
            get_job: GetJobUseCase::new(store.clone()),
            search_jobs: SearchJobsUseCase::new(store.clone()),
            resend_job_tx: ResendJobTxUseCase::new(store.clone(), producer, topics),
            update_job: UpdateJobUseCase::new(
                store.clone(),
                update_children.clone(),
                start_next_job.clone(),
            ),
            create_schedule: CreateScheduleUseCase::new(store.clone(), validator),
            get_schedule: GetScheduleUseCase::new(store.clone()),
            search_schedules: SearchSchedulesUseCase::new(store.clone()),
            send_contract_tx: SendContractTxUseCase::new(send_tx.clone()),
            send_deploy_tx: SendDeployTxUseCase::new(send_tx.clone()),
            get_tx: GetTxUseCase::new(store.clone()),
            search_transactions: SearchTransactionsUseCase::new(store),
            create_job,
            start_job,
            update_children,
            start_next_job,
            send_tx,
        }
    }
}
