use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chain::{tx_hash_hex, TransactionReceipt, TxHash};
use crate::models::ids::{Id, NodeId, ValidationId};
use crate::models::warp::BLS_PUBLIC_KEY_LEN;

/// Where a registration attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationPhase {
    Unregistered,
    Initiated,
    PChainConfirmed,
    Registered,
    Failed,
}

/// The three chain-facing steps of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStep {
    Initiate,
    Submit,
    Complete,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStep::Initiate => write!(f, "initiate"),
            RegistrationStep::Submit => write!(f, "submit"),
            RegistrationStep::Complete => write!(f, "complete"),
        }
    }
}

/// Everything needed to register one validator end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRegistrationRequest {
    pub node_id: NodeId,
    pub bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub bls_proof_of_possession: Vec<u8>,
    pub weight: u64,
    /// P-Chain balance, in nAVAX, funding the validator's continuous fee.
    pub balance: u64,
    pub remaining_balance_owner: [u8; 20],
    pub deactivation_owner: [u8; 20],
}

/// State of one registration attempt. Owned by the task driving it and never persisted; a
/// restarted process resumes from whichever hash the caller kept.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    pub id: Uuid,
    pub node_id: NodeId,
    pub weight: u64,
    pub phase: RegistrationPhase,
    pub initiate_tx_hash: Option<TxHash>,
    pub p_chain_tx_id: Option<Id>,
    pub validation_id: Option<ValidationId>,
    pub complete_tx_hash: Option<TxHash>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationSession {
    pub fn new(node_id: NodeId, weight: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            node_id,
            weight,
            phase: RegistrationPhase::Unregistered,
            initiate_tx_hash: None,
            p_chain_tx_id: None,
            validation_id: None,
            complete_tx_hash: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn advance(&mut self, phase: RegistrationPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for RegistrationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} for {} ({:?})", self.id, self.node_id, self.phase)?;
        if let Some(hash) = &self.initiate_tx_hash {
            write!(f, " initiate={}", tx_hash_hex(hash))?;
        }
        if let Some(tx_id) = &self.p_chain_tx_id {
            write!(f, " p-chain={}", tx_id)?;
        }
        if let Some(hash) = &self.complete_tx_hash {
            write!(f, " complete={}", tx_hash_hex(hash))?;
        }
        Ok(())
    }
}

/// A finished registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub session: RegistrationSession,
    pub receipt: TransactionReceipt,
}

/// Registration parameters recovered from a `RegisterL1ValidatorTx` on the P-Chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMessageData {
    /// The raw `RegisterL1ValidatorMessage` payload.
    pub message: Vec<u8>,
    pub subnet_id: Id,
    pub node_id: Vec<u8>,
    pub bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub registration_expiry: u64,
    pub weight: u64,
    pub network_id: u32,
}

impl RegistrationMessageData {
    /// The validation ID this payload creates.
    pub fn validation_id(&self) -> ValidationId {
        ValidationId::of_payload(&self.message)
    }
}

/// Combined view of a validator's contract record and the P-Chain's view of the subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorStatusReport {
    pub validation_id: ValidationId,
    pub record: crate::models::chain::ValidatorRecord,
    pub l1_total_weight: u64,
}

/// P-Chain state relevant before submitting a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PChainReadiness {
    pub height: u64,
    pub validator_count: usize,
}

impl PChainReadiness {
    /// `RegisterL1ValidatorTx` fails on a subnet the P-Chain sees no validators for.
    pub fn is_ready(&self) -> bool {
        self.validator_count > 0
    }
}
