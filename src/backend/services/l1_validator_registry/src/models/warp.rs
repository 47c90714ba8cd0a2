//! Value types exchanged between the L1 and the P-Chain as warp messages.
//!
//! Encoding and decoding lives in [`crate::utils::warp_codec`]; these types only carry data.

use crate::models::ids::{Id, ValidationId};
use crate::utils::crypto::CryptoUtils;
use crate::utils::warp_codec;

/// Codec version shared by every structure in this module.
pub const CODEC_VERSION: u16 = 0;
/// Type ID of the `AddressedCall` warp payload (`0` is the hash payload).
pub const ADDRESSED_CALL_TYPE_ID: u32 = 1;
pub const REGISTER_L1_VALIDATOR_TYPE_ID: u32 = 1;
pub const L1_VALIDATOR_REGISTRATION_TYPE_ID: u32 = 2;
pub const BIT_SET_SIGNATURE_TYPE_ID: u32 = 0;

pub const BLS_PUBLIC_KEY_LEN: usize = 48;
pub const BLS_SIGNATURE_LEN: usize = 96;
pub const SHORT_ID_LEN: usize = 20;

/// Address of the warp messenger precompile on subnet-EVM chains.
pub const WARP_PRECOMPILE_ADDRESS: [u8; 20] = [
    0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x05,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedCall {
    pub codec_id: u16,
    pub type_id: u32,
    pub source_address: Vec<u8>,
    pub payload: Vec<u8>,
}

impl AddressedCall {
    pub fn new(source_address: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            codec_id: CODEC_VERSION,
            type_id: ADDRESSED_CALL_TYPE_ID,
            source_address,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedWarpMessage {
    pub codec_id: u16,
    pub network_id: u32,
    pub source_chain_id: Id,
    pub addressed_call: AddressedCall,
}

impl UnsignedWarpMessage {
    pub fn new(network_id: u32, source_chain_id: Id, addressed_call: AddressedCall) -> Self {
        Self {
            codec_id: CODEC_VERSION,
            network_id,
            source_chain_id,
            addressed_call,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        warp_codec::pack_warp_message(self)
    }

    /// The warp message ID: SHA-256 of the encoded message.
    pub fn id(&self) -> Id {
        Id(CryptoUtils::content_hash(&self.to_bytes()))
    }
}

/// Aggregate BLS signature with the bit set of validators (by canonical index) that signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSetSignature {
    pub signers: Vec<u8>,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

impl BitSetSignature {
    pub fn signer_count(&self) -> u32 {
        self.signers.iter().map(|b| b.count_ones()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedWarpMessage {
    pub unsigned: UnsignedWarpMessage,
    pub signature: BitSetSignature,
}

/// A single-threshold set of P-Chain addresses that may spend or disable a validator's balance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PChainOwner {
    pub threshold: u32,
    pub addresses: Vec<[u8; SHORT_ID_LEN]>,
}

impl PChainOwner {
    pub fn single(address: [u8; SHORT_ID_LEN]) -> Self {
        Self {
            threshold: 1,
            addresses: vec![address],
        }
    }
}

/// Emitted by the validator manager when registration is initiated. Its hash is the
/// validation ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterL1ValidatorMessage {
    pub subnet_id: Id,
    pub node_id: Vec<u8>,
    pub bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub registration_expiry: u64,
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
    pub weight: u64,
}

impl RegisterL1ValidatorMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        warp_codec::pack_register_l1_validator_payload(self)
    }

    pub fn validation_id(&self) -> ValidationId {
        ValidationId::of_payload(&self.to_bytes())
    }
}

/// The P-Chain's acknowledgment that a validation ID is (or is not) registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1ValidatorRegistrationMessage {
    pub validation_id: ValidationId,
    pub registered: bool,
}

impl L1ValidatorRegistrationMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        warp_codec::pack_l1_validator_registration_payload(self)
    }
}

/// One entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListItem {
    pub address: [u8; 20],
    pub storage_keys: Vec<[u8; 32]>,
}

pub type AccessList = Vec<AccessListItem>;
