use async_trait::async_trait;

use crate::models::chain::{
    InitiateRegistration, Log, LogFilter, PChainTx, PChainTxStatus, PChainValidator,
    RegisterL1ValidatorTx, TransactionReceipt, TxHash, ValidatorRecord,
};
use crate::models::ids::{Id, ValidationId};
use crate::models::warp::AccessList;
use crate::utils::errors::ChainError;

/// Read access to L1 contract logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ChainError>;
    async fn block_number(&self) -> Result<u64, ChainError>;
}

/// The validator manager contract deployed on the L1, plus the receipt lookups needed to follow
/// its transactions.
#[async_trait]
pub trait ValidatorManager: Send + Sync {
    async fn initiate_validator_registration(
        &self,
        registration: &InitiateRegistration,
    ) -> Result<TxHash, ChainError>;

    async fn complete_validator_registration(
        &self,
        message_index: u32,
        access_list: &AccessList,
    ) -> Result<TxHash, ChainError>;

    /// Returns [`ValidationId::ZERO`] for nodes the contract has no record of.
    async fn get_node_validation_id(&self, node_id: &[u8]) -> Result<ValidationId, ChainError>;

    async fn get_validator(&self, validation_id: ValidationId)
        -> Result<ValidatorRecord, ChainError>;

    async fn l1_total_weight(&self) -> Result<u64, ChainError>;

    /// `None` until the transaction is mined.
    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError>;
}

/// P-Chain platform API.
#[async_trait]
pub trait PChain: Send + Sync {
    async fn get_height(&self) -> Result<u64, ChainError>;
    async fn get_current_validators(
        &self,
        subnet_id: Id,
    ) -> Result<Vec<PChainValidator>, ChainError>;
    async fn get_tx(&self, tx_id: Id) -> Result<PChainTx, ChainError>;
    async fn get_tx_status(&self, tx_id: Id) -> Result<PChainTxStatus, ChainError>;
    async fn issue_tx(&self, signed_tx: &[u8]) -> Result<Id, ChainError>;
}

/// Builds, signs and issues P-Chain transactions. UTXO selection and key custody live behind
/// this trait.
#[async_trait]
pub trait PChainWallet: Send + Sync {
    async fn register_l1_validator(&self, tx: &RegisterL1ValidatorTx) -> Result<Id, ChainError>;
}
