//! Fixtures shared by the use case tests

use crate::broker::{Delivery, Producer, TxEnvelope};
use crate::chain::{StaticChainRegistry, StaticContractRegistry};
use crate::entities::{
    all_tenants, Chain, Contract, EthTransaction, Job, JobStatus, JobType, Log, Schedule,
};
use crate::error::SchedulerResult;
use crate::store::{DataStore, MemoryStore};
use crate::validators::TransactionValidator;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const CHAIN_UUID: Uuid = Uuid::from_u128(0x6f1e_54d5_3c3a_4b8e_9c41_2d0e_8a77_b001);
pub const TENANT: &str = "tenant-a";
pub const SENDER: &str = "0x905B88EFf8Bda1543d4d6f4aA05afef143D27E18";
pub const RECIPIENT: &str = "0x6009608A02a7A15fd6689D6DaD560C44E9ab61Ff";

pub fn validator() -> TransactionValidator {
    let chains = StaticChainRegistry::new();
    chains.register(Chain {
        uuid: CHAIN_UUID,
        name: "besu".into(),
        chain_id: "2018".into(),
    });
    let contracts = StaticContractRegistry::default();
    contracts.register(Contract {
        name: "SimpleToken".into(),
        tag: "latest".into(),
        bytecode: "0x6080604052".into(),
        constructor_signature: "()".into(),
    });
    TransactionValidator::new(Arc::new(chains), Arc::new(contracts))
}

pub fn transaction() -> EthTransaction {
    EthTransaction {
        from: Some(SENDER.into()),
        to: Some(RECIPIENT.into()),
        gas: Some("21000".into()),
        gas_price: Some("1000000000".into()),
        value: Some("1".into()),
        ..Default::default()
    }
}

/// Persist a schedule holding one job whose history is CREATED followed by
/// `statuses`, each one second apart and in the past.
pub async fn seed_job(store: &Arc<MemoryStore>, job_type: JobType, statuses: &[JobStatus]) -> Job {
    let schedule = Schedule::new(TENANT, CHAIN_UUID);
    let job = Job::new(schedule.uuid, CHAIN_UUID, job_type, transaction());

    let mut tx = store.begin().await.unwrap();
    tx.insert_schedule(&schedule).await.unwrap();
    let job = insert_with_history(tx.as_mut(), job, statuses).await;
    tx.commit().await.unwrap();
    job
}

/// Persist `job` in its existing schedule with the given history
pub async fn seed_in_schedule(store: &Arc<MemoryStore>, job: Job, statuses: &[JobStatus]) -> Job {
    let mut tx = store.begin().await.unwrap();
    let job = insert_with_history(tx.as_mut(), job, statuses).await;
    tx.commit().await.unwrap();
    job
}

/// Insert `job` with a CREATED log followed by `statuses` inside `tx`
pub async fn insert_with_history(
    tx: &mut dyn crate::store::StoreTx,
    mut job: Job,
    statuses: &[JobStatus],
) -> Job {
    let start = Utc::now() - Duration::seconds(60);
    job.internal_data.chain_id = Some("2018".into());
    job.logs = std::iter::once(JobStatus::Created)
        .chain(statuses.iter().copied())
        .enumerate()
        .map(|(i, status)| {
            let mut log = Log::new(status, "");
            log.created_at = start + Duration::seconds(i as i64);
            log
        })
        .collect();
    tx.insert_job(&job).await.unwrap();
    tx.find_job(job.uuid, &all_tenants()).await.unwrap()
}

pub async fn fetch_job(store: &Arc<MemoryStore>, uuid: Uuid) -> Job {
    let mut tx = store.begin().await.unwrap();
    let job = tx.find_job(uuid, &all_tenants()).await.unwrap();
    tx.rollback().await.unwrap();
    job
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub topic: String,
    pub key: String,
    pub envelope: TxEnvelope,
}

/// Producer keeping every published envelope in memory
#[derive(Debug, Default)]
pub struct RecordingProducer {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingProducer {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Producer for RecordingProducer {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> SchedulerResult<Delivery> {
        let envelope: TxEnvelope = serde_json::from_slice(&payload)?;
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent {
            topic: topic.to_string(),
            key: key.to_string(),
            envelope,
        });
        Ok(Delivery {
            partition: 0,
            offset: sent.len() as i64 - 1,
        })
    }
}
