//! Search filters and tenant scoping

use super::status::JobStatus;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Tenant that can see every record
pub const WILDCARD_TENANT: &str = "*";

/// Tenant used when a caller does not provide one
pub const DEFAULT_TENANT: &str = "_";

pub fn tenant_allowed(tenants: &[String], tenant_id: &str) -> bool {
    tenants
        .iter()
        .any(|t| t == WILDCARD_TENANT || t == tenant_id)
}

pub fn all_tenants() -> Vec<String> {
    vec![WILDCARD_TENANT.to_string()]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilters {
    pub uuids: Vec<Uuid>,
    pub chain_uuid: Option<Uuid>,
    pub tx_hashes: Vec<String>,
    pub status: Option<JobStatus>,
    pub updated_after: Option<DateTime<Utc>>,
    /// Matches the parent itself and every job pointing to it
    pub parent_job_uuid: Option<Uuid>,
    pub only_parents: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxRequestFilters {
    pub idempotency_keys: Vec<String>,
    pub chain_uuid: Option<Uuid>,
    pub tx_hashes: Vec<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleFilters {
    pub chain_uuid: Option<Uuid>,
}
