//! Transaction field handling

use super::abi::decode_hex;
use crate::entities::EthTransaction;
use crate::error::{SchedulerError, SchedulerResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::NameOrAddress;
use ethers::utils::rlp::Rlp;
use ethers::utils::{keccak256, to_checksum};

/// Apply a partial update: only non-empty fields of `patch` replace the
/// stored values.
pub fn merge_transaction(stored: &EthTransaction, patch: &EthTransaction) -> EthTransaction {
    fn pick(current: &Option<String>, update: &Option<String>) -> Option<String> {
        match update {
            Some(value) if !value.is_empty() => Some(value.clone()),
            _ => current.clone(),
        }
    }

    EthTransaction {
        hash: pick(&stored.hash, &patch.hash),
        from: pick(&stored.from, &patch.from),
        to: pick(&stored.to, &patch.to),
        nonce: pick(&stored.nonce, &patch.nonce),
        value: pick(&stored.value, &patch.value),
        gas_price: pick(&stored.gas_price, &patch.gas_price),
        gas: pick(&stored.gas, &patch.gas),
        data: pick(&stored.data, &patch.data),
        raw: pick(&stored.raw, &patch.raw),
        private_from: pick(&stored.private_from, &patch.private_from),
        private_for: if patch.private_for.is_empty() {
            stored.private_for.clone()
        } else {
            patch.private_for.clone()
        },
        privacy_group_id: pick(&stored.privacy_group_id, &patch.privacy_group_id),
        enclave_key: pick(&stored.enclave_key, &patch.enclave_key),
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

/// Decode a signed RLP transaction, recovering its sender
pub fn decode_raw(raw: &str) -> SchedulerResult<EthTransaction> {
    let bytes = decode_hex(raw)
        .map_err(|e| SchedulerError::InvalidParameter(format!("raw transaction is not hex: {}", e)))?;
    if bytes.is_empty() {
        return Err(SchedulerError::InvalidParameter("empty raw transaction".into()));
    }

    let (tx, signature) = TypedTransaction::decode_signed(&Rlp::new(&bytes)).map_err(|e| {
        SchedulerError::InvalidParameter(format!("invalid raw transaction: {}", e))
    })?;
    let sender = signature.recover(tx.sighash()).map_err(|e| {
        SchedulerError::InvalidParameter(format!("cannot recover raw transaction sender: {}", e))
    })?;

    let to = tx.to().map(|to| match to {
        NameOrAddress::Address(address) => to_checksum(address, None),
        NameOrAddress::Name(name) => name.clone(),
    });

    Ok(EthTransaction {
        hash: Some(format!("0x{}", hex::encode(keccak256(&bytes)))),
        from: Some(to_checksum(&sender, None)),
        to,
        nonce: tx.nonce().map(|n| n.to_string()),
        value: tx.value().map(|v| v.to_string()),
        gas_price: tx.gas_price().map(|p| p.to_string()),
        gas: tx.gas().map(|g| g.to_string()),
        data: tx
            .data()
            .filter(|d| !d.is_empty())
            .map(|d| format!("0x{}", hex::encode(d))),
        raw: Some(format!("0x{}", hex::encode(&bytes))),
        ..Default::default()
    })
}
