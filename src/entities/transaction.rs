//! Ethereum transaction fields carried by a job

use crate::error::{SchedulerError, SchedulerResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction attached to a job. Numeric fields are kept as decimal strings
/// the way the execution pipeline exchanges them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EthTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclave_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EthTransaction {
    /// Gas limit as an integer, decimal or `0x` hex. `None` when unset.
    pub fn gas_limit(&self) -> SchedulerResult<Option<u64>> {
        let gas = match self.gas.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(gas) => gas,
            None => return Ok(None),
        };
        let parsed = match gas.strip_prefix("0x").or_else(|| gas.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => gas.parse(),
        };
        parsed
            .map(Some)
            .map_err(|_| SchedulerError::Data(format!("invalid gas limit '{}'", gas)))
    }

    pub fn is_private(&self) -> bool {
        self.private_from.is_some()
    }
}
