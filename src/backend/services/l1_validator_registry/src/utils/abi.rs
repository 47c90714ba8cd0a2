//! Call data and return-value encoding for the validator manager contract, and log-data decoding
//! for the warp precompile.
//!
//! Function selectors and event topics are hard-coded; `ethabi` only does the argument encoding.

use ethabi::{ParamType, Token, Uint};

use crate::models::chain::{EvmAddress, TxHash, ValidatorRecord};
use crate::models::ids::ValidationId;
use crate::models::warp::PChainOwner;
use crate::utils::errors::ParseError;

/// `keccak("SendWarpMessage(address,bytes32,bytes)")`
pub const SEND_WARP_MESSAGE_TOPIC: [u8; 32] = [
    0x56, 0x60, 0x0c, 0x56, 0x77, 0x28, 0xa8, 0x00, 0xc0, 0xaa, 0x92, 0x75, 0x00, 0xf8, 0x31, 0xcb,
    0x45, 0x1d, 0xf6, 0x6a, 0x7a, 0xf5, 0x70, 0xeb, 0x4d, 0xf4, 0xdf, 0xbf, 0x46, 0x74, 0x88, 0x7d,
];

/// `keccak("initiateValidatorRegistration(bytes,bytes,(uint32,address[]),(uint32,address[]),uint64)")[0..4]`
pub const INITIATE_VALIDATOR_REGISTRATION_SELECTOR: [u8; 4] = [0x9c, 0xb7, 0x62, 0x4e];
/// `keccak("completeValidatorRegistration(uint32)")[0..4]`
pub const COMPLETE_VALIDATOR_REGISTRATION_SELECTOR: [u8; 4] = [0xa3, 0xa6, 0x5e, 0x48];
/// `keccak("getNodeValidationID(bytes)")[0..4]`
pub const GET_NODE_VALIDATION_ID_SELECTOR: [u8; 4] = [0xd4, 0x7a, 0x94, 0x8b];
/// `keccak("getValidator(bytes32)")[0..4]`
pub const GET_VALIDATOR_SELECTOR: [u8; 4] = [0xd5, 0xf2, 0x0f, 0xf6];
/// `keccak("l1TotalWeight()")[0..4]`
pub const L1_TOTAL_WEIGHT_SELECTOR: [u8; 4] = [0xbb, 0x0b, 0x19, 0x38];

pub fn send_warp_message_topic() -> TxHash {
    TxHash::from(SEND_WARP_MESSAGE_TOPIC)
}

fn call_data(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&ethabi::encode(tokens));
    data
}

fn owner_token(owner: &PChainOwner) -> Token {
    Token::Tuple(vec![
        Token::Uint(Uint::from(owner.threshold)),
        Token::Array(
            owner
                .addresses
                .iter()
                .map(|address| Token::Address(EvmAddress::from(*address)))
                .collect(),
        ),
    ])
}

fn into_u64(token: Token, field: &'static str) -> Result<u64, ParseError> {
    let value = token
        .into_uint()
        .ok_or_else(|| ParseError::Abi(format!("{} was not a uint", field)))?;
    if value > Uint::from(u64::MAX) {
        return Err(ParseError::Abi(format!("{} overflows u64", field)));
    }
    Ok(value.low_u64())
}

fn single(mut tokens: Vec<Token>) -> Result<Token, ParseError> {
    match tokens.len() {
        1 => Ok(tokens.remove(0)),
        n => Err(ParseError::Abi(format!("expected one return value, got {}", n))),
    }
}

/// Unwraps the ABI-encoded `bytes` argument of a `SendWarpMessage` log: the raw unsigned warp
/// message.
pub fn decode_log_bytes(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    single(ethabi::decode(&[ParamType::Bytes], data)?)?
        .into_bytes()
        .ok_or_else(|| ParseError::Abi("log data was not bytes".to_string()))
}

pub fn encode_log_bytes(message: &[u8]) -> Vec<u8> {
    ethabi::encode(&[Token::Bytes(message.to_vec())])
}

pub fn encode_initiate_validator_registration(
    node_id: &[u8],
    bls_public_key: &[u8],
    remaining_balance_owner: &PChainOwner,
    disable_owner: &PChainOwner,
    weight: u64,
) -> Vec<u8> {
    call_data(
        INITIATE_VALIDATOR_REGISTRATION_SELECTOR,
        &[
            Token::Bytes(node_id.to_vec()),
            Token::Bytes(bls_public_key.to_vec()),
            owner_token(remaining_balance_owner),
            owner_token(disable_owner),
            Token::Uint(Uint::from(weight)),
        ],
    )
}

pub fn encode_complete_validator_registration(message_index: u32) -> Vec<u8> {
    call_data(
        COMPLETE_VALIDATOR_REGISTRATION_SELECTOR,
        &[Token::Uint(Uint::from(message_index))],
    )
}

pub fn encode_get_node_validation_id(node_id: &[u8]) -> Vec<u8> {
    call_data(GET_NODE_VALIDATION_ID_SELECTOR, &[Token::Bytes(node_id.to_vec())])
}

pub fn decode_validation_id(data: &[u8]) -> Result<ValidationId, ParseError> {
    let bytes = single(ethabi::decode(&[ParamType::FixedBytes(32)], data)?)?
        .into_fixed_bytes()
        .ok_or_else(|| ParseError::Abi("validation id was not bytes32".to_string()))?;
    ValidationId::from_slice(&bytes)
}

pub fn encode_get_validator(validation_id: &ValidationId) -> Vec<u8> {
    call_data(
        GET_VALIDATOR_SELECTOR,
        &[Token::FixedBytes(validation_id.as_bytes().to_vec())],
    )
}

fn validator_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Bytes,
        ParamType::Uint(64),
        ParamType::Uint(64),
        ParamType::Uint(64),
        ParamType::Uint(64),
        ParamType::Uint(64),
        ParamType::Uint(64),
    ])
}

pub fn decode_validator(data: &[u8]) -> Result<ValidatorRecord, ParseError> {
    let fields = match single(ethabi::decode(&[validator_param()], data)?)? {
        Token::Tuple(fields) => fields,
        other => {
            return Err(ParseError::Abi(format!(
                "validator was not a tuple: {:?}",
                other
            )))
        }
    };
    let mut fields = fields.into_iter();
    let mut next = |field: &'static str| {
        fields
            .next()
            .ok_or_else(|| ParseError::Abi(format!("validator tuple missing {}", field)))
    };

    let status = into_u64(next("status")?, "status")?;
    let status = u8::try_from(status)
        .map_err(|_| ParseError::Abi(format!("status {} overflows uint8", status)))?;
    let node_id = next("node id")?
        .into_bytes()
        .ok_or_else(|| ParseError::Abi("node id was not bytes".to_string()))?;

    Ok(ValidatorRecord {
        status: status.into(),
        node_id,
        starting_weight: into_u64(next("starting weight")?, "starting weight")?,
        sent_nonce: into_u64(next("sent nonce")?, "sent nonce")?,
        received_nonce: into_u64(next("received nonce")?, "received nonce")?,
        weight: into_u64(next("weight")?, "weight")?,
        start_time: into_u64(next("start time")?, "start time")?,
        end_time: into_u64(next("end time")?, "end time")?,
    })
}

pub fn encode_validator(record: &ValidatorRecord) -> Vec<u8> {
    ethabi::encode(&[Token::Tuple(vec![
        Token::Uint(Uint::from(record.status as u8)),
        Token::Bytes(record.node_id.clone()),
        Token::Uint(Uint::from(record.starting_weight)),
        Token::Uint(Uint::from(record.sent_nonce)),
        Token::Uint(Uint::from(record.received_nonce)),
        Token::Uint(Uint::from(record.weight)),
        Token::Uint(Uint::from(record.start_time)),
        Token::Uint(Uint::from(record.end_time)),
    ])])
}

pub fn encode_l1_total_weight() -> Vec<u8> {
    L1_TOTAL_WEIGHT_SELECTOR.to_vec()
}

pub fn decode_u64(data: &[u8]) -> Result<u64, ParseError> {
    into_u64(single(ethabi::decode(&[ParamType::Uint(64)], data)?)?, "return value")
}
