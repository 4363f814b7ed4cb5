//! Transaction requests submitted by callers

use super::job::RetryPolicy;
use super::schedule::Schedule;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyProtocol {
    Orion,
    Tessera,
}

/// Gas and value options shared by every crafted transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<PrivacyProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_group_id: Option<String>,
}

impl PrivateParams {
    pub fn is_empty(&self) -> bool {
        self.protocol.is_none()
            && self.private_from.is_none()
            && self.private_for.is_empty()
            && self.privacy_group_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    pub from: Option<String>,
    pub to: String,
    pub method_signature: String,
    #[serde(default)]
    pub args: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub gas: GasParams,
    #[serde(flatten)]
    pub private: PrivateParams,
    #[serde(default)]
    pub one_time_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployParams {
    pub from: Option<String>,
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_tag: Option<String>,
    #[serde(default)]
    pub args: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub gas: GasParams,
    #[serde(flatten)]
    pub private: PrivateParams,
    #[serde(default)]
    pub one_time_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParams {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(flatten)]
    pub gas: GasParams,
}

/// Protocol specific parameters of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxParams {
    Call(CallParams),
    Deploy(DeployParams),
    Raw(RawParams),
    Transfer(TransferParams),
}

impl TxParams {
    pub fn private(&self) -> Option<&PrivateParams> {
        match self {
            TxParams::Call(p) => Some(&p.private),
            TxParams::Deploy(p) => Some(&p.private),
            TxParams::Raw(_) | TxParams::Transfer(_) => None,
        }
    }

    pub fn one_time_key(&self) -> bool {
        match self {
            TxParams::Call(p) => p.one_time_key,
            TxParams::Deploy(p) => p.one_time_key,
            TxParams::Raw(_) | TxParams::Transfer(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TxParams::Call(_) => "call",
            TxParams::Deploy(_) => "deploy",
            TxParams::Raw(_) => "raw",
            TxParams::Transfer(_) => "transfer",
        }
    }
}

/// One logical submission from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRequest {
    pub uuid: Uuid,
    pub idempotency_key: String,
    pub chain_name: String,
    #[serde(default)]
    pub request_hash: String,
    pub params: TxParams,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub created_at: DateTime<Utc>,
}

impl TxRequest {
    pub fn new(idempotency_key: impl Into<String>, chain_name: impl Into<String>, params: TxParams) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            idempotency_key: idempotency_key.into(),
            chain_name: chain_name.into(),
            request_hash: String::new(),
            params,
            labels: BTreeMap::new(),
            retry_policy: RetryPolicy::default(),
            schedule: None,
            created_at: Utc::now(),
        }
    }
}
