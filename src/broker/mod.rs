//! Message dispatch to the execution pipeline

pub mod envelope;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use envelope::TxEnvelope;
#[cfg(feature = "kafka")]
pub use kafka::KafkaProducer;

use crate::config::BrokerConfig;
use crate::entities::JobType;
use crate::error::SchedulerResult;
#[cfg(not(feature = "kafka"))]
use crate::error::SchedulerError;

use async_trait::async_trait;
use std::sync::Arc;

/// Message published when the binary cannot reach any broker
pub const MISSING_KAFKA_FEATURE: &str =
    "no broker producer: tx-scheduler was built without the `kafka` cargo feature, \
     rebuild with `cargo build --release --features kafka`";

/// Position assigned by the broker to a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Producer: Send + Sync {
    /// Publish and wait for the broker acknowledgement
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> SchedulerResult<Delivery>;
}

/// Destination topics of the execution pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Jobs whose transaction still needs to be crafted and signed
    pub crafter: String,
    /// Already signed transactions
    pub sender: String,
}

impl Topics {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            crafter: config.crafter_topic.clone(),
            sender: config.sender_topic.clone(),
        }
    }

    pub fn for_job_type(&self, job_type: JobType) -> &str {
        if job_type.is_raw() {
            &self.sender
        } else {
            &self.crafter
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::from_config(&BrokerConfig::default())
    }
}

/// Producer for the configured broker
#[cfg(feature = "kafka")]
pub fn connect(config: &BrokerConfig) -> SchedulerResult<Arc<dyn Producer>> {
    Ok(Arc::new(KafkaProducer::new(config)?))
}

#[cfg(not(feature = "kafka"))]
pub fn connect(_config: &BrokerConfig) -> SchedulerResult<Arc<dyn Producer>> {
    Err(SchedulerError::Config(MISSING_KAFKA_FEATURE.to_string()))
}
