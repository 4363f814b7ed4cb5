//! Message handed to the execution pipeline

use crate::entities::{EthTransaction, Job, JobType, Priority};
use crate::error::SchedulerResult;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Message consumed by the crafter and sender workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxEnvelope {
    pub job_uuid: Uuid,
    pub schedule_uuid: Uuid,
    pub chain_uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub job_type: JobType,
    pub priority: Priority,
    pub one_time_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_uuid: Option<Uuid>,
    pub transaction: EthTransaction,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl TxEnvelope {
    pub fn from_job(job: &Job) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(TENANT_ID_HEADER.to_string(), job.tenant_id.clone());

        Self {
            job_uuid: job.uuid,
            schedule_uuid: job.schedule_uuid,
            chain_uuid: job.chain_uuid,
            chain_id: job.internal_data.chain_id.clone(),
            job_type: job.job_type,
            priority: job.internal_data.priority,
            one_time_key: job.internal_data.one_time_key,
            parent_job_uuid: job.internal_data.parent_job_uuid,
            transaction: job.transaction.clone(),
            labels: job.labels.clone(),
            headers,
        }
    }

    /// Envelopes for the crafter are partitioned by chain, signed ones by
    /// sender so that nonces stay ordered.
    pub fn partition_key(&self, crafter_bound: bool) -> String {
        if crafter_bound {
            return self.chain_uuid.to_string();
        }
        self.transaction
            .from
            .clone()
            .unwrap_or_else(|| self.chain_uuid.to_string())
    }

    pub fn to_bytes(&self) -> SchedulerResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
