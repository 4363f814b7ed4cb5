//! ABI encoding of method calls and deployments

use crate::error::{SchedulerError, SchedulerResult};

use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{HumanReadableParser, Param, ParamType, Token};
use serde_json::Value as JsonValue;

/// Encode a call to `signature` (e.g. `transfer(address,uint256)`)
pub fn encode_method_call(signature: &str, args: &[JsonValue]) -> SchedulerResult<Vec<u8>> {
    let signature = signature.trim();
    let declaration = if signature.starts_with("function ") {
        signature.to_string()
    } else {
        format!("function {}", signature)
    };

    let function = HumanReadableParser::parse_function(&declaration).map_err(|e| {
        SchedulerError::InvalidParameter(format!("invalid method signature '{}': {}", signature, e))
    })?;
    let tokens = tokenize(&function.inputs, args)?;

    function
        .encode_input(&tokens)
        .map_err(|e| SchedulerError::InvalidParameter(format!("cannot encode call arguments: {}", e)))
}

/// Bytecode followed by the encoded constructor arguments
pub fn encode_deployment(
    bytecode: &str,
    constructor_signature: &str,
    args: &[JsonValue],
) -> SchedulerResult<Vec<u8>> {
    let code = decode_hex(bytecode)
        .map_err(|e| SchedulerError::Data(format!("invalid contract bytecode: {}", e)))?;

    let signature = constructor_signature.trim();
    if (signature.is_empty() || signature == "()") && args.is_empty() {
        return Ok(code);
    }

    let constructor = HumanReadableParser::parse_constructor(&format!("constructor{}", signature))
        .map_err(|e| {
            SchedulerError::Data(format!("invalid constructor signature '{}': {}", signature, e))
        })?;
    let tokens = tokenize(&constructor.inputs, args)?;

    constructor.encode_input(code, &tokens).map_err(|e| {
        SchedulerError::InvalidParameter(format!("cannot encode constructor arguments: {}", e))
    })
}

pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(input.trim().trim_start_matches("0x"))
}

fn tokenize(inputs: &[Param], args: &[JsonValue]) -> SchedulerResult<Vec<Token>> {
    if inputs.len() != args.len() {
        return Err(SchedulerError::InvalidParameter(format!(
            "expected {} arguments, got {}",
            inputs.len(),
            args.len()
        )));
    }

    inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let value = arg_to_string(arg);
            let value = match param.kind {
                ParamType::Address | ParamType::Bytes | ParamType::FixedBytes(_) => {
                    value.trim_start_matches("0x").to_string()
                }
                _ => value,
            };
            LenientTokenizer::tokenize(&param.kind, &value).map_err(|e| {
                SchedulerError::InvalidParameter(format!(
                    "invalid argument {} for type {}: {}",
                    arg, param.kind, e
                ))
            })
        })
        .collect()
}

fn arg_to_string(arg: &JsonValue) -> String {
    match arg {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => format!(
            "[{}]",
            items.iter().map(arg_to_string).collect::<Vec<_>>().join(",")
        ),
        other => other.to_string(),
    }
}
