//! Job status state machine

use crate::error::SchedulerError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Started,
    Pending,
    Resending,
    Recovering,
    Mined,
    Stored,
    Failed,
    NeverMined,
    Warning,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "CREATED",
            JobStatus::Started => "STARTED",
            JobStatus::Pending => "PENDING",
            JobStatus::Resending => "RESENDING",
            JobStatus::Recovering => "RECOVERING",
            JobStatus::Mined => "MINED",
            JobStatus::Stored => "STORED",
            JobStatus::Failed => "FAILED",
            JobStatus::NeverMined => "NEVER_MINED",
            JobStatus::Warning => "WARNING",
        }
    }

    /// Final statuses reject any further status transition
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            JobStatus::Mined | JobStatus::Failed | JobStatus::Stored | JobStatus::NeverMined
        )
    }

    /// Whether a log carrying this status moves the derived job status.
    /// Warnings and resend notices are annotations on the current status.
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, JobStatus::Warning | JobStatus::Resending)
    }

    /// Whether `self` may be appended on top of a job currently in `current`
    pub fn can_transition_from(&self, current: JobStatus) -> bool {
        match self {
            JobStatus::Created => false,
            JobStatus::Started => current == JobStatus::Created,
            JobStatus::Pending => {
                matches!(current, JobStatus::Started | JobStatus::Recovering)
            }
            JobStatus::Resending => current == JobStatus::Pending,
            JobStatus::Recovering
            | JobStatus::Mined
            | JobStatus::Stored
            | JobStatus::NeverMined => current == JobStatus::Pending,
            JobStatus::Failed => matches!(
                current,
                JobStatus::Started | JobStatus::Recovering | JobStatus::Pending
            ),
            JobStatus::Warning => true,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(JobStatus::Created),
            "STARTED" => Ok(JobStatus::Started),
            "PENDING" => Ok(JobStatus::Pending),
            "RESENDING" => Ok(JobStatus::Resending),
            "RECOVERING" => Ok(JobStatus::Recovering),
            "MINED" => Ok(JobStatus::Mined),
            "STORED" => Ok(JobStatus::Stored),
            "FAILED" => Ok(JobStatus::Failed),
            "NEVER_MINED" => Ok(JobStatus::NeverMined),
            "WARNING" => Ok(JobStatus::Warning),
            other => Err(SchedulerError::InvalidParameter(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}
