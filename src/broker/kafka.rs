//! Kafka producer

use super::{Delivery, Producer};
use crate::config::BrokerConfig;
use crate::error::{SchedulerError, SchedulerResult};

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, info};

pub struct KafkaProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaProducer {
    pub fn new(config: &BrokerConfig) -> SchedulerResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", config.send_timeout_ms.to_string())
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| SchedulerError::Connection(format!("failed to build Kafka producer: {}", e)))?;

        info!("Kafka producer connected to {}", config.brokers);
        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        })
    }
}

#[async_trait]
impl Producer for KafkaProducer {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> SchedulerResult<Delivery> {
        let record = FutureRecord::to(topic).key(key).payload(payload.as_slice());
        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(err, _)| SchedulerError::Broker {
                topic: topic.to_string(),
                message: err.to_string(),
            })?;

        debug!(topic, partition, offset, "Envelope delivered");
        Ok(Delivery { partition, offset })
    }
}
