//! Chain directory
//!
//! Chains are resolved by name when a request comes in and checked by UUID
//! when a job is created.

pub mod contracts;

pub use contracts::{ContractRegistry, StaticContractRegistry};

use crate::config::ChainConfig;
use crate::entities::Chain;
use crate::error::{SchedulerError, SchedulerResult};

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRegistry: Send + Sync {
    async fn get_chain_by_name(&self, name: &str) -> SchedulerResult<Chain>;

    async fn get_chain(&self, uuid: Uuid) -> SchedulerResult<Chain>;

    async fn chain_exists(&self, uuid: Uuid) -> SchedulerResult<bool>;
}

/// Chain directory built from configuration
#[derive(Debug, Default)]
pub struct StaticChainRegistry {
    chains: DashMap<Uuid, Chain>,
    names: DashMap<String, Uuid>,
}

impl StaticChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(chains: &HashMap<String, ChainConfig>) -> Self {
        let registry = Self::new();
        for (name, chain) in chains {
            info!("Registering chain {} (ID: {})", name, chain.chain_id);
            registry.register(Chain {
                uuid: chain.uuid,
                name: name.clone(),
                chain_id: chain.chain_id.clone(),
            });
        }
        registry
    }

    pub fn register(&self, chain: Chain) {
        self.names.insert(chain.name.clone(), chain.uuid);
        self.chains.insert(chain.uuid, chain);
    }
}

#[async_trait]
impl ChainRegistry for StaticChainRegistry {
    async fn get_chain_by_name(&self, name: &str) -> SchedulerResult<Chain> {
        let uuid = self
            .names
            .get(name)
            .map(|u| *u)
            .ok_or_else(|| SchedulerError::not_found("chain", name))?;
        self.get_chain(uuid).await
    }

    async fn get_chain(&self, uuid: Uuid) -> SchedulerResult<Chain> {
        self.chains
            .get(&uuid)
            .map(|c| c.clone())
            .ok_or_else(|| SchedulerError::not_found("chain", uuid))
    }

    async fn chain_exists(&self, uuid: Uuid) -> SchedulerResult<bool> {
        Ok(self.chains.contains_key(&uuid))
    }
}
