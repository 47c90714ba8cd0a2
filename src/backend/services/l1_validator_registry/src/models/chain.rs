use serde::Deserialize;

use crate::models::ids::{Id, NodeId};
use crate::models::warp::{PChainOwner, BLS_PUBLIC_KEY_LEN};

pub type EvmAddress = ethabi::Address;
pub type TxHash = ethabi::Hash;

/// Full `0x`-prefixed hex of a transaction hash (the `Display` impl abbreviates).
pub fn tx_hash_hex(hash: &TxHash) -> String {
    format!("{:#x}", hash)
}

/// A reduced set of fields from an L1 contract log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: EvmAddress,
    pub topics: Vec<TxHash>,
    pub data: Vec<u8>,
    pub block_number: u64,
}

/// Logs emitted by `address` with first topic `topic`, in the inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: EvmAddress,
    pub topic: TxHash,
    pub from_block: u64,
    pub to_block: u64,
}

/// Used to identify a block when querying the L1 node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockQuery {
    Number(u64),
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub status: TxStatus,
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Arguments of `initiateValidatorRegistration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateRegistration {
    pub node_id: NodeId,
    pub bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
    pub weight: u64,
}

/// Status codes of the validator manager's `ValidatorStatus` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValidatorStatus {
    Unknown = 0,
    PendingAdded = 1,
    Active = 2,
    PendingRemoved = 3,
    Completed = 4,
    Invalidated = 5,
}

impl From<u8> for ValidatorStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => ValidatorStatus::PendingAdded,
            2 => ValidatorStatus::Active,
            3 => ValidatorStatus::PendingRemoved,
            4 => ValidatorStatus::Completed,
            5 => ValidatorStatus::Invalidated,
            _ => ValidatorStatus::Unknown,
        }
    }
}

/// The validator manager's record for one validation ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRecord {
    pub status: ValidatorStatus,
    pub node_id: Vec<u8>,
    pub starting_weight: u64,
    pub sent_nonce: u64,
    pub received_nonce: u64,
    pub weight: u64,
    pub start_time: u64,
    pub end_time: u64,
}

/// One entry of `platform.getCurrentValidators`. Weights arrive as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PChainValidator {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    #[serde(deserialize_with = "de_u64_string")]
    pub weight: u64,
    #[serde(rename = "validationID", default)]
    pub validation_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64_string")]
    pub balance: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PChainTxStatus {
    Committed,
    Processing,
    Dropped,
    Unknown,
}

/// A P-Chain transaction as returned by `platform.getTx`, reduced to what registration needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PChainTx {
    pub tx_id: Id,
    /// The warp message of a `RegisterL1ValidatorTx`, if the transaction carries one.
    pub warp_message: Option<Vec<u8>>,
}

/// What the P-Chain wallet needs to issue a `RegisterL1ValidatorTx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterL1ValidatorTx {
    /// Initial balance, in nAVAX, paying the validator's continuous fee.
    pub balance: u64,
    pub bls_proof_of_possession: Vec<u8>,
    pub signed_warp_message: Vec<u8>,
}

fn de_u64_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn de_opt_u64_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}
