//! Contract directory used by deployments

use crate::config::{default_contract_tag, ContractConfig};
use crate::entities::Contract;
use crate::error::{SchedulerError, SchedulerResult};

use async_trait::async_trait;
use dashmap::DashMap;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractRegistry: Send + Sync {
    /// Contract by name and tag; an empty tag means `latest`
    async fn get_contract(&self, name: &str, tag: &str) -> SchedulerResult<Contract>;
}

#[derive(Debug, Default)]
pub struct StaticContractRegistry {
    contracts: DashMap<(String, String), Contract>,
}

impl StaticContractRegistry {
    pub fn from_config(contracts: &[ContractConfig]) -> Self {
        let registry = Self::default();
        for c in contracts {
            registry.register(Contract {
                name: c.name.clone(),
                tag: c.tag.clone(),
                bytecode: c.bytecode.clone(),
                constructor_signature: c.constructor_signature.clone(),
            });
        }
        registry
    }

    pub fn register(&self, contract: Contract) {
        self.contracts
            .insert((contract.name.clone(), contract.tag.clone()), contract);
    }
}

#[async_trait]
impl ContractRegistry for StaticContractRegistry {
    async fn get_contract(&self, name: &str, tag: &str) -> SchedulerResult<Contract> {
        let tag = if tag.is_empty() {
            default_contract_tag()
        } else {
            tag.to_string()
        };
        self.contracts
            .get(&(name.to_string(), tag.clone()))
            .map(|c| c.clone())
            .ok_or_else(|| SchedulerError::not_found("contract", format!("{}:{}", name, tag)))
    }
}
