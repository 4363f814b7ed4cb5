//! Jobs, their logs and internal bookkeeping

use super::status::JobStatus;
use super::transaction::EthTransaction;
use crate::error::SchedulerError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "eth://ethereum/transaction")]
    EthereumTransaction,
    #[serde(rename = "eth://ethereum/rawTransaction")]
    EthereumRawTransaction,
    #[serde(rename = "eth://orion/eeaTransaction")]
    OrionEeaTransaction,
    #[serde(rename = "eth://orion/markingTransaction")]
    OrionMarkingTransaction,
    #[serde(rename = "eth://tessera/privateTransaction")]
    TesseraPrivateTransaction,
    #[serde(rename = "eth://tessera/markingTransaction")]
    TesseraMarkingTransaction,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::EthereumTransaction => "eth://ethereum/transaction",
            JobType::EthereumRawTransaction => "eth://ethereum/rawTransaction",
            JobType::OrionEeaTransaction => "eth://orion/eeaTransaction",
            JobType::OrionMarkingTransaction => "eth://orion/markingTransaction",
            JobType::TesseraPrivateTransaction => "eth://tessera/privateTransaction",
            JobType::TesseraMarkingTransaction => "eth://tessera/markingTransaction",
        }
    }

    /// Raw transactions are already signed and skip the crafter
    pub fn is_raw(&self) -> bool {
        *self == JobType::EthereumRawTransaction
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth://ethereum/transaction" => Ok(JobType::EthereumTransaction),
            "eth://ethereum/rawTransaction" => Ok(JobType::EthereumRawTransaction),
            "eth://orion/eeaTransaction" => Ok(JobType::OrionEeaTransaction),
            "eth://orion/markingTransaction" => Ok(JobType::OrionMarkingTransaction),
            "eth://tessera/privateTransaction" => Ok(JobType::TesseraPrivateTransaction),
            "eth://tessera/markingTransaction" => Ok(JobType::TesseraMarkingTransaction),
            other => Err(SchedulerError::Data(format!("unknown job type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

/// Gas price escalation used by retry sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Seconds between two retries; zero disables retries
    #[serde(default)]
    pub interval_secs: u64,
    /// Gas price increment per retry, as a fraction (0.1 = +10%)
    #[serde(default)]
    pub increment: f64,
    /// Upper bound of the cumulated increment
    #[serde(default)]
    pub limit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_uuid: Option<Uuid>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub one_time_key: bool,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub has_been_retried: bool,
}

/// Immutable status record attached to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub uuid: Uuid,
    pub status: JobStatus,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Log {
    pub fn new(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            status,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Derived status of a log history: the latest lifecycle log wins, ties on
/// creation time are broken by insertion order.
pub fn derive_status(logs: &[Log]) -> JobStatus {
    logs.iter()
        .enumerate()
        .filter(|(_, log)| log.status.is_lifecycle())
        .max_by_key(|(idx, log)| (log.created_at, *idx))
        .map(|(_, log)| log.status)
        .unwrap_or(JobStatus::Created)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub uuid: Uuid,
    pub schedule_uuid: Uuid,
    pub chain_uuid: Uuid,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_job_uuid: Option<Uuid>,
    #[serde(default)]
    pub internal_data: InternalData,
    #[serde(default)]
    pub transaction: EthTransaction,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub logs: Vec<Log>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        schedule_uuid: Uuid,
        chain_uuid: Uuid,
        job_type: JobType,
        transaction: EthTransaction,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            schedule_uuid,
            chain_uuid,
            tenant_id: String::new(),
            job_type,
            next_job_uuid: None,
            internal_data: InternalData::default(),
            transaction,
            labels: BTreeMap::new(),
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Current status, derived from the log history
    pub fn status(&self) -> JobStatus {
        derive_status(&self.logs)
    }

    /// Root of the sibling group this job belongs to
    pub fn group_root(&self) -> Uuid {
        self.internal_data.parent_job_uuid.unwrap_or(self.uuid)
    }

    pub fn is_child(&self) -> bool {
        matches!(self.internal_data.parent_job_uuid, Some(parent) if parent != self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn log_at(status: JobStatus, at: DateTime<Utc>) -> Log {
        Log {
            uuid: Uuid::new_v4(),
            status,
            message: String::new(),
            created_at: at,
        }
    }

    #[test]
    fn latest_log_wins() {
        let t0 = Utc::now();
        let logs = vec![
            log_at(JobStatus::Created, t0),
            log_at(JobStatus::Pending, t0 + Duration::seconds(2)),
            log_at(JobStatus::Started, t0 + Duration::seconds(1)),
        ];
        assert_eq!(derive_status(&logs), JobStatus::Pending);
    }

    #[test]
    fn ties_are_broken_by_insertion_order() {
        let t0 = Utc::now();
        let logs = vec![
            log_at(JobStatus::Created, t0),
            log_at(JobStatus::Started, t0),
            log_at(JobStatus::Pending, t0),
        ];
        assert_eq!(derive_status(&logs), JobStatus::Pending);
    }

    #[test]
    fn annotations_do_not_move_status() {
        let t0 = Utc::now();
        let logs = vec![
            log_at(JobStatus::Created, t0),
            log_at(JobStatus::Started, t0 + Duration::seconds(1)),
            log_at(JobStatus::Pending, t0 + Duration::seconds(2)),
            log_at(JobStatus::Resending, t0 + Duration::seconds(3)),
            log_at(JobStatus::Warning, t0 + Duration::seconds(4)),
        ];
        assert_eq!(derive_status(&logs), JobStatus::Pending);
    }

    #[test]
    fn empty_history_is_created() {
        assert_eq!(derive_status(&[]), JobStatus::Created);
    }

    #[test]
    fn job_type_wire_names() {
        let json = serde_json::to_string(&JobType::TesseraMarkingTransaction).unwrap();
        assert_eq!(json, "\"eth://tessera/markingTransaction\"");
        assert_eq!(
            "eth://orion/eeaTransaction".parse::<JobType>().unwrap(),
            JobType::OrionEeaTransaction
        );
        assert!("eth://unknown".parse::<JobType>().is_err());
    }

    #[test]
    fn group_root_defaults_to_self() {
        let mut job = Job::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            JobType::EthereumTransaction,
            EthTransaction::default(),
        );
        assert_eq!(job.group_root(), job.uuid);
        assert!(!job.is_child());

        let parent = Uuid::new_v4();
        job.internal_data.parent_job_uuid = Some(parent);
        assert_eq!(job.group_root(), parent);
        assert!(job.is_child());
    }
}
