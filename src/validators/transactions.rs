//! Request validation against the chain and contract directories

use super::params::validate_tx_params;
use crate::chain::{ChainRegistry, ContractRegistry};
use crate::entities::{Chain, EthTransaction, PrivateParams, TxParams};
use crate::error::{SchedulerError, SchedulerResult};
use crate::parsers::{decode_raw, encode_deployment, encode_method_call};

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct TransactionValidator {
    chains: Arc<dyn ChainRegistry>,
    contracts: Arc<dyn ContractRegistry>,
}

impl TransactionValidator {
    pub fn new(chains: Arc<dyn ChainRegistry>, contracts: Arc<dyn ContractRegistry>) -> Self {
        Self { chains, contracts }
    }

    /// Resolve the target chain of a request
    pub async fn validate_chain(&self, chain_name: &str) -> SchedulerResult<Chain> {
        self.chains.get_chain_by_name(chain_name).await.map_err(|e| {
            if e.is_not_found() {
                SchedulerError::InvalidParameter(format!("chain '{}' does not exist", chain_name))
            } else {
                e
            }
        })
    }

    /// Referential check used when a job is created directly
    pub async fn validate_chain_uuid(&self, chain_uuid: Uuid) -> SchedulerResult<Chain> {
        if !self.chains.chain_exists(chain_uuid).await? {
            return Err(SchedulerError::InvalidParameter(format!(
                "chain {} does not exist",
                chain_uuid
            )));
        }
        self.chains.get_chain(chain_uuid).await
    }

    /// Validate the parameters and build the transaction of the first job
    pub async fn craft_transaction(&self, params: &TxParams) -> SchedulerResult<EthTransaction> {
        validate_tx_params(params)?;

        let transaction = match params {
            TxParams::Call(p) => {
                let data = encode_method_call(&p.method_signature, &p.args)?;
                with_private(
                    EthTransaction {
                        from: p.from.clone(),
                        to: Some(p.to.clone()),
                        value: p.value.clone(),
                        gas: p.gas.gas.clone(),
                        gas_price: p.gas.gas_price.clone(),
                        nonce: p.gas.nonce.clone(),
                        data: Some(format!("0x{}", hex::encode(data))),
                        ..Default::default()
                    },
                    &p.private,
                )
            }
            TxParams::Deploy(p) => {
                let tag = p.contract_tag.as_deref().unwrap_or_default();
                let contract = self
                    .contracts
                    .get_contract(&p.contract_name, tag)
                    .await
                    .map_err(|e| {
                        if e.is_not_found() {
                            SchedulerError::InvalidParameter(format!(
                                "contract '{}' is not registered",
                                p.contract_name
                            ))
                        } else {
                            e
                        }
                    })?;
                let data =
                    encode_deployment(&contract.bytecode, &contract.constructor_signature, &p.args)?;
                with_private(
                    EthTransaction {
                        from: p.from.clone(),
                        value: p.value.clone(),
                        gas: p.gas.gas.clone(),
                        gas_price: p.gas.gas_price.clone(),
                        nonce: p.gas.nonce.clone(),
                        data: Some(format!("0x{}", hex::encode(data))),
                        ..Default::default()
                    },
                    &p.private,
                )
            }
            TxParams::Raw(p) => decode_raw(&p.raw)?,
            TxParams::Transfer(p) => EthTransaction {
                from: Some(p.from.clone()),
                to: Some(p.to.clone()),
                value: Some(p.value.clone()),
                gas: p.gas.gas.clone(),
                gas_price: p.gas.gas_price.clone(),
                nonce: p.gas.nonce.clone(),
                ..Default::default()
            },
        };

        debug!(kind = params.kind(), "Transaction parameters validated");
        Ok(transaction)
    }
}

fn with_private(mut transaction: EthTransaction, private: &PrivateParams) -> EthTransaction {
    transaction.private_from = private.private_from.clone();
    transaction.private_for = private.private_for.clone();
    transaction.privacy_group_id = private.privacy_group_id.clone();
    transaction
}
