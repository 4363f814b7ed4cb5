//! Structural checks on request parameters

use crate::entities::{GasParams, PrivateParams, TxParams};
use crate::error::{SchedulerError, SchedulerResult};

use ethers::types::{Address, U256};

pub fn validate_tx_params(params: &TxParams) -> SchedulerResult<()> {
    match params {
        TxParams::Call(p) => {
            validate_optional_address("from", p.from.as_deref())?;
            validate_address("to", &p.to)?;
            if p.method_signature.trim().is_empty() {
                return Err(invalid("method_signature is required"));
            }
            validate_optional_amount("value", p.value.as_deref())?;
            validate_gas(&p.gas)?;
            validate_private_params(&p.private)
        }
        TxParams::Deploy(p) => {
            validate_optional_address("from", p.from.as_deref())?;
            if p.contract_name.trim().is_empty() {
                return Err(invalid("contract_name is required"));
            }
            validate_optional_amount("value", p.value.as_deref())?;
            validate_gas(&p.gas)?;
            validate_private_params(&p.private)
        }
        TxParams::Raw(p) => {
            if p.raw.trim().is_empty() {
                return Err(invalid("raw is required"));
            }
            Ok(())
        }
        TxParams::Transfer(p) => {
            validate_address("from", &p.from)?;
            validate_address("to", &p.to)?;
            validate_amount("value", &p.value)?;
            validate_gas(&p.gas)
        }
    }
}

/// `private_from` needs exactly one of `private_for` and `privacy_group_id`,
/// and a protocol.
pub fn validate_private_params(private: &PrivateParams) -> SchedulerResult<()> {
    if private.is_empty() {
        return Ok(());
    }

    if private.private_from.as_deref().map_or(true, str::is_empty) {
        return Err(invalid("private_from is required for private transactions"));
    }
    let has_private_for = !private.private_for.is_empty();
    let has_group = private
        .privacy_group_id
        .as_deref()
        .map_or(false, |g| !g.is_empty());
    match (has_private_for, has_group) {
        (true, true) => {
            return Err(invalid(
                "private_for and privacy_group_id are mutually exclusive",
            ))
        }
        (false, false) => {
            return Err(invalid(
                "one of private_for or privacy_group_id is required with private_from",
            ))
        }
        _ => {}
    }
    if private.protocol.is_none() {
        return Err(invalid("protocol is required for private transactions"));
    }
    Ok(())
}

fn validate_gas(gas: &GasParams) -> SchedulerResult<()> {
    validate_optional_amount("gas", gas.gas.as_deref())?;
    validate_optional_amount("gas_price", gas.gas_price.as_deref())?;
    validate_optional_amount("nonce", gas.nonce.as_deref())
}

fn validate_address(field: &str, value: &str) -> SchedulerResult<()> {
    value
        .parse::<Address>()
        .map(|_| ())
        .map_err(|_| invalid(&format!("{} is not a valid address: '{}'", field, value)))
}

fn validate_optional_address(field: &str, value: Option<&str>) -> SchedulerResult<()> {
    value.map_or(Ok(()), |v| validate_address(field, v))
}

fn validate_amount(field: &str, value: &str) -> SchedulerResult<()> {
    U256::from_dec_str(value)
        .map(|_| ())
        .map_err(|_| invalid(&format!("{} is not a decimal amount: '{}'", field, value)))
}

fn validate_optional_amount(field: &str, value: Option<&str>) -> SchedulerResult<()> {
    value.map_or(Ok(()), |v| validate_amount(field, v))
}

fn invalid(message: &str) -> SchedulerError {
    SchedulerError::InvalidParameter(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PrivacyProtocol, TransferParams};

    fn private(for_: bool, group: bool, protocol: bool) -> PrivateParams {
        PrivateParams {
            protocol: protocol.then_some(PrivacyProtocol::Tessera),
            private_from: Some("A1aVtMxLCUHmBVHXoZzzBgPbW/wj5axDpW9X8l91SGo=".into()),
            private_for: if for_ {
                vec!["Ko2bVqD+nNlNYL5EE7y3IdOnviftjiizpjRt+HTuFBs=".into()]
            } else {
                vec![]
            },
            privacy_group_id: group.then(|| "kAbelwaVW7okoEn1+okO+AbA4Hhz/7DaCOWVQz9nx5M=".into()),
        }
    }

    #[test]
    fn private_fields_are_mutually_exclusive() {
        assert!(validate_private_params(&PrivateParams::default()).is_ok());
        assert!(validate_private_params(&private(true, false, true)).is_ok());
        assert!(validate_private_params(&private(false, true, true)).is_ok());
        assert!(validate_private_params(&private(true, true, true)).is_err());
        assert!(validate_private_params(&private(false, false, true)).is_err());
        assert!(validate_private_params(&private(true, false, false)).is_err());

        let mut missing_from = private(true, false, true);
        missing_from.private_from = None;
        assert!(validate_private_params(&missing_from).is_err());
    }

    #[test]
    fn transfer_needs_addresses_and_amount() {
        let mut transfer = TransferParams {
            from: "0x905B88EFf8Bda1543d4d6f4aA05afef143D27E18".into(),
            to: "0x6009608A02a7A15fd6689D6DaD560C44E9ab61Ff".into(),
            value: "1000000000000000000".into(),
            gas: GasParams::default(),
        };
        assert!(validate_tx_params(&TxParams::Transfer(transfer.clone())).is_ok());

        transfer.value = "ten".into();
        let err = validate_tx_params(&TxParams::Transfer(transfer.clone())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidParameter);

        transfer.value = "10".into();
        transfer.to = "not-an-address".into();
        assert!(validate_tx_params(&TxParams::Transfer(transfer)).is_err());
    }
}
