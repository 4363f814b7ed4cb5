//! Schedules group the jobs of one request

use super::job::Job;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group of jobs produced from a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub uuid: Uuid,
    pub tenant_id: String,
    pub chain_uuid: Uuid,
    #[serde(default)]
    pub jobs: Vec<Job>,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(tenant_id: impl Into<String>, chain_uuid: Uuid) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            chain_uuid,
            jobs: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
